pub mod log;
pub mod metrics;

pub use self::log::EventLog;
pub use metrics::{MetricsSnapshot, ReviewMetrics};
