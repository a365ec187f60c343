//! Review core for first-motion focal-mechanism picks.
//!
//! Picks are projected onto an equal-area stereonet, partitioned by polarity,
//! and reviewed one at a time against their waveform. The interaction
//! controller owns all view state; mechanisms are read-only inputs.

pub mod interaction;
pub mod math;
pub mod mechanism;
pub mod prelude;
pub mod projection;
pub mod telemetry;
pub mod waveform;

pub use interaction::{InteractionController, Outcome, PlotEvent};
pub use prelude::{ReviewConfig, ReviewError, ReviewResult};
