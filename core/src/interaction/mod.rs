pub mod controller;
pub mod session;

pub use controller::{
    Axes, FetchRequest, InteractionController, Outcome, PlotEvent, PolarityCorrection,
    ReviewSummary, Transition,
};
pub use session::{PlotSession, ReviewState, Selection, TraceView, WaveformPanel};
