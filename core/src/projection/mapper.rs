use log::debug;

use crate::math::stereonet::{self, StereoPoint};
use crate::mechanism::FocalMechanism;
use crate::prelude::{ReviewConfig, ReviewError, ReviewResult};
use crate::projection::pick_index::{MarkerTag, PickIndex, PickRef};
use crate::projection::surface::ProjectionSurface;

const CIRCLE_SEGMENTS: usize = 90;
const LABEL_OFFSET_DEG: f64 = 5.0;

/// Takeoffs are measured from vertical-up; the stereonet wants dip from horizontal.
pub fn plunge_from_takeoff(takeoff: f64) -> f64 {
    90.0 - takeoff
}

pub fn takeoff_from_plunge(plunge: f64) -> f64 {
    90.0 - plunge
}

/// One rendered marker and the pick it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedPick {
    pub pick: PickRef,
    pub trend: f64,
    pub plunge: f64,
    pub point: StereoPoint,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkerGroup {
    pub tag: MarkerTag,
    pub markers: Vec<ProjectedPick>,
}

impl MarkerGroup {
    fn new(tag: MarkerTag) -> Self {
        Self {
            tag,
            markers: Vec::new(),
        }
    }

    /// Marker-local indices within `radius` of `at`, nearest first.
    pub fn hits_within(&self, at: StereoPoint, radius: f64) -> Vec<usize> {
        let mut hits: Vec<(usize, f64)> = self
            .markers
            .iter()
            .enumerate()
            .map(|(local, marker)| (local, marker.point.distance(&at)))
            .filter(|&(_, distance)| distance <= radius)
            .collect();
        hits.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        hits.into_iter().map(|(local, _)| local).collect()
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StationLabel {
    pub pick: PickRef,
    pub point: StereoPoint,
    pub text: String,
}

/// Everything the stereonet panel shows for one mechanism.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionLayout {
    pub up: MarkerGroup,
    pub down: MarkerGroup,
    pub index: PickIndex,
    pub planes: [Vec<StereoPoint>; 2],
    pub slip: StereoPoint,
    pub labels: Vec<StationLabel>,
}

impl ProjectionLayout {
    pub fn group(&self, tag: MarkerTag) -> &MarkerGroup {
        match tag {
            MarkerTag::Up => &self.up,
            MarkerTag::Down => &self.down,
        }
    }
}

/// Projects picks onto the stereonet and partitions them by polarity.
#[derive(Debug, Clone)]
pub struct ProjectionMapper {
    station_labels: bool,
}

impl ProjectionMapper {
    pub fn new(config: &ReviewConfig) -> Self {
        Self {
            station_labels: config.station_labels,
        }
    }

    pub fn map(&self, mechanism: &FocalMechanism) -> ReviewResult<ProjectionLayout> {
        let mut up = MarkerGroup::new(MarkerTag::Up);
        let mut down = MarkerGroup::new(MarkerTag::Down);
        let mut labels = Vec::new();

        for (index, pick) in mechanism.picks.iter().enumerate() {
            if !(0.0..=180.0).contains(&pick.takeoff) {
                return Err(ReviewError::InvalidGeometry(format!(
                    "pick {} ({}) takeoff {} outside 0..=180",
                    index, pick.station, pick.takeoff
                )));
            }
            if !pick.azimuth.is_finite() {
                return Err(ReviewError::InvalidGeometry(format!(
                    "pick {} ({}) azimuth is not finite",
                    index, pick.station
                )));
            }

            let polarity = pick.source_polarity(index)?;
            let trend = stereonet::wrap_degrees(pick.azimuth);
            let plunge = plunge_from_takeoff(pick.takeoff);
            let marker = ProjectedPick {
                pick: PickRef(index),
                trend,
                plunge,
                point: stereonet::project_line(trend, plunge),
            };
            match MarkerTag::for_polarity(polarity) {
                MarkerTag::Up => up.markers.push(marker),
                MarkerTag::Down => down.markers.push(marker),
            }

            if self.station_labels {
                let (label_trend, label_plunge) = stereonet::lower_hemisphere(trend, plunge);
                labels.push(StationLabel {
                    pick: PickRef(index),
                    point: stereonet::project_line(
                        label_trend,
                        (label_plunge + LABEL_OFFSET_DEG).min(90.0),
                    ),
                    text: pick.station.clone(),
                });
            }
        }

        let index = PickIndex::from_partition(
            mechanism.picks.len(),
            up.markers.iter().map(|m| m.pick.0).collect(),
            down.markers.iter().map(|m| m.pick.0).collect(),
        );
        debug!(
            "mapped {}: {} up / {} down",
            mechanism.origin_id,
            up.len(),
            down.len()
        );

        let plane1 = &mechanism.plane1;
        let (slip_trend, slip_plunge) =
            stereonet::rake_line(plane1.strike, plane1.dip, -plane1.rake);

        Ok(ProjectionLayout {
            up,
            down,
            index,
            planes: [
                stereonet::great_circle(&mechanism.plane1, CIRCLE_SEGMENTS),
                stereonet::great_circle(&mechanism.plane2, CIRCLE_SEGMENTS),
            ],
            slip: stereonet::project_line(slip_trend, slip_plunge),
            labels,
        })
    }

    /// Issues the stateless draw calls for a mapped layout.
    pub fn render(
        &self,
        mechanism: &FocalMechanism,
        layout: &ProjectionLayout,
        surface: &mut dyn ProjectionSurface,
    ) {
        surface.set_title(&format!(
            "{} - click to plot station time series",
            mechanism.origin_id
        ));
        surface.set_azimuth_ticklabels(&[]);
        surface.draw_plane(&mechanism.plane1, &layout.planes[0]);
        surface.draw_slip(layout.slip);
        surface.draw_plane(&mechanism.plane2, &layout.planes[1]);
        surface.draw_markers(&layout.up);
        surface.draw_markers(&layout.down);
        for label in &layout.labels {
            surface.draw_label(label.point, &label.text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mechanism::{NodalPlane, Pick, SourceLocator};
    use crate::projection::surface::{DrawCall, RecordingSurface};

    fn three_pick_mechanism() -> FocalMechanism {
        FocalMechanism {
            origin_id: "orid-1".into(),
            picks: vec![
                Pick::new("P1", 11, 30.0, 100.0, 1),
                Pick::new("P2", 12, 200.0, 60.0, -1),
                Pick::new("P3", 13, 90.0, 90.0, 1),
            ],
            plane1: NodalPlane::new(10.0, 60.0, 90.0),
            plane2: NodalPlane::new(190.0, 30.0, 90.0),
            source: SourceLocator("memory://test".into()),
        }
    }

    #[test]
    fn three_pick_scenario_partitions_and_plunges() {
        let mapper = ProjectionMapper::new(&ReviewConfig::default());
        let layout = mapper.map(&three_pick_mechanism()).unwrap();

        assert_eq!(layout.index.indices(MarkerTag::Up), &[0, 2]);
        assert_eq!(layout.index.indices(MarkerTag::Down), &[1]);

        let plunges: Vec<f64> = layout
            .up
            .markers
            .iter()
            .chain(layout.down.markers.iter())
            .map(|m| (m.pick.0, m.plunge))
            .collect::<std::collections::BTreeMap<_, _>>()
            .into_values()
            .collect();
        assert_eq!(plunges, vec![-10.0, 30.0, 0.0]);
    }

    #[test]
    fn resolved_picks_match_group_polarity() {
        let mechanism = three_pick_mechanism();
        let layout = ProjectionMapper::new(&ReviewConfig::default())
            .map(&mechanism)
            .unwrap();
        for tag in MarkerTag::ALL {
            for local in 0..layout.group(tag).len() {
                let pick = layout.index.resolve(tag, local).unwrap();
                let source = mechanism.picks[pick.0].polarity;
                assert_eq!(source.signum(), tag.polarity().sign());
            }
        }
    }

    #[test]
    fn zero_polarity_is_rejected() {
        let mut mechanism = three_pick_mechanism();
        mechanism.picks[2].polarity = 0;
        let err = ProjectionMapper::new(&ReviewConfig::default())
            .map(&mechanism)
            .unwrap_err();
        assert_eq!(
            err,
            ReviewError::ZeroPolarity {
                index: 2,
                station: "P3".into()
            }
        );
    }

    #[test]
    fn takeoff_out_of_range_is_rejected() {
        let mut mechanism = three_pick_mechanism();
        mechanism.picks[0].takeoff = 181.0;
        assert!(matches!(
            ProjectionMapper::new(&ReviewConfig::default()).map(&mechanism),
            Err(ReviewError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn plunge_round_trip_is_exact_on_half_degree_grid() {
        for step in 0..=360 {
            let takeoff = step as f64 * 0.5;
            let plunge = plunge_from_takeoff(takeoff);
            assert!((-90.0..=90.0).contains(&plunge));
            assert_eq!(takeoff_from_plunge(plunge), takeoff);
        }
    }

    #[test]
    fn hits_are_ordered_nearest_first() {
        let layout = ProjectionMapper::new(&ReviewConfig::default())
            .map(&three_pick_mechanism())
            .unwrap();
        let target = layout.up.markers[1].point;
        let hits = layout.up.hits_within(target, 2.0);
        assert_eq!(hits[0], 1);
        assert_eq!(hits.len(), 2);
        assert!(layout.down.hits_within(target, 0.01).is_empty());
    }

    #[test]
    fn render_issues_plane_and_label_calls() {
        let mechanism = three_pick_mechanism();
        let mapper = ProjectionMapper::new(&ReviewConfig::default());
        let layout = mapper.map(&mechanism).unwrap();
        let mut surface = RecordingSurface::new();
        mapper.render(&mechanism, &layout, &mut surface);

        assert_eq!(surface.planes(), 2);
        assert_eq!(surface.labels(), 3);
        assert_eq!(
            surface.calls[0],
            DrawCall::Title("orid-1 - click to plot station time series".into())
        );
    }

    #[test]
    fn labels_can_be_disabled() {
        let config = ReviewConfig {
            station_labels: false,
            ..Default::default()
        };
        let layout = ProjectionMapper::new(&config)
            .map(&three_pick_mechanism())
            .unwrap();
        assert!(layout.labels.is_empty());
    }
}
