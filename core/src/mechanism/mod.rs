pub mod focal;
pub mod pick;

pub use focal::{FocalMechanism, NodalPlane, SourceLocator};
pub use pick::{ArrivalId, Pick, Polarity};
