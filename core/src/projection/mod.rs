pub mod mapper;
pub mod pick_index;
pub mod surface;

pub use mapper::{
    plunge_from_takeoff, takeoff_from_plunge, MarkerGroup, ProjectedPick, ProjectionLayout,
    ProjectionMapper, StationLabel,
};
pub use pick_index::{MarkerTag, PickIndex, PickRef};
pub use surface::{DrawCall, ProjectionSurface, RecordingSurface};
