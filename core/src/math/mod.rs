pub mod stats;
pub mod stereonet;

pub use stats::StatsHelper;
pub use stereonet::StereoPoint;
