use crate::math::StereoPoint;
use crate::mechanism::NodalPlane;
use crate::projection::mapper::MarkerGroup;

/// Rendering collaborator for the stereonet panel.
pub trait ProjectionSurface {
    fn set_title(&mut self, title: &str);
    fn set_azimuth_ticklabels(&mut self, labels: &[String]);
    fn draw_plane(&mut self, plane: &NodalPlane, path: &[StereoPoint]);
    fn draw_slip(&mut self, point: StereoPoint);
    /// Markers drawn here must report hits back as marker-local indices.
    fn draw_markers(&mut self, group: &MarkerGroup);
    fn draw_label(&mut self, point: StereoPoint, text: &str);
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCall {
    Title(String),
    AzimuthTicks(Vec<String>),
    Plane {
        plane: NodalPlane,
        path: Vec<StereoPoint>,
    },
    Slip(StereoPoint),
    Markers(MarkerGroup),
    Label {
        point: StereoPoint,
        text: String,
    },
}

/// Surface that keeps every draw call; canvases replay it.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    pub calls: Vec<DrawCall>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn planes(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, DrawCall::Plane { .. }))
            .count()
    }

    pub fn labels(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, DrawCall::Label { .. }))
            .count()
    }
}

impl ProjectionSurface for RecordingSurface {
    fn set_title(&mut self, title: &str) {
        self.calls.push(DrawCall::Title(title.to_string()));
    }

    fn set_azimuth_ticklabels(&mut self, labels: &[String]) {
        self.calls.push(DrawCall::AzimuthTicks(labels.to_vec()));
    }

    fn draw_plane(&mut self, plane: &NodalPlane, path: &[StereoPoint]) {
        self.calls.push(DrawCall::Plane {
            plane: *plane,
            path: path.to_vec(),
        });
    }

    fn draw_slip(&mut self, point: StereoPoint) {
        self.calls.push(DrawCall::Slip(point));
    }

    fn draw_markers(&mut self, group: &MarkerGroup) {
        self.calls.push(DrawCall::Markers(group.clone()));
    }

    fn draw_label(&mut self, point: StereoPoint, text: &str) {
        self.calls.push(DrawCall::Label {
            point,
            text: text.to_string(),
        });
    }
}
