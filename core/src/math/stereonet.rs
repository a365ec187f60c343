//! Equal-area (Schmidt) lower-hemisphere projection.
//!
//! Coordinates are unit-radius with north up and east to the right. Lines are
//! given as (trend, plunge) in degrees; a negative plunge points into the upper
//! hemisphere and is projected through its antipode.

use serde::{Deserialize, Serialize};
use std::f64::consts::SQRT_2;

use crate::mechanism::NodalPlane;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StereoPoint {
    pub x: f64,
    pub y: f64,
}

impl StereoPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &StereoPoint) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

pub fn wrap_degrees(angle: f64) -> f64 {
    angle.rem_euclid(360.0)
}

/// Folds an upper-hemisphere line onto the lower hemisphere.
pub fn lower_hemisphere(trend: f64, plunge: f64) -> (f64, f64) {
    if plunge < 0.0 {
        (wrap_degrees(trend + 180.0), -plunge)
    } else {
        (wrap_degrees(trend), plunge)
    }
}

pub fn project_line(trend: f64, plunge: f64) -> StereoPoint {
    let (trend, plunge) = lower_hemisphere(trend, plunge);
    let radius = SQRT_2 * ((90.0 - plunge) / 2.0).to_radians().sin();
    let trend = trend.to_radians();
    StereoPoint::new(radius * trend.sin(), radius * trend.cos())
}

/// Line lying in a plane at `rake` degrees from strike, positive down-dip.
pub fn rake_line(strike: f64, dip: f64, rake: f64) -> (f64, f64) {
    let (st, dp, rk) = (strike.to_radians(), dip.to_radians(), rake.to_radians());
    let dip_dir = st + std::f64::consts::FRAC_PI_2;
    let north = rk.cos() * st.cos() + rk.sin() * dp.cos() * dip_dir.cos();
    let east = rk.cos() * st.sin() + rk.sin() * dp.cos() * dip_dir.sin();
    let down = rk.sin() * dp.sin();
    let plunge = down.clamp(-1.0, 1.0).asin().to_degrees();
    let trend = wrap_degrees(east.atan2(north).to_degrees());
    (trend, plunge)
}

/// Great circle of a plane sampled from strike to strike + 180.
pub fn great_circle(plane: &NodalPlane, segments: usize) -> Vec<StereoPoint> {
    let segments = segments.max(2);
    (0..=segments)
        .map(|step| {
            let rake = 180.0 * step as f64 / segments as f64;
            let (trend, plunge) = rake_line(plane.strike, plane.dip, rake);
            project_line(trend, plunge)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn vertical_line_projects_to_center() {
        let point = project_line(123.0, 90.0);
        assert!(point.x.abs() < EPS && point.y.abs() < EPS);
    }

    #[test]
    fn horizontal_line_reaches_primitive_circle() {
        let north = project_line(0.0, 0.0);
        assert!((north.y - 1.0).abs() < EPS && north.x.abs() < EPS);
        let east = project_line(90.0, 0.0);
        assert!((east.x - 1.0).abs() < EPS && east.y.abs() < EPS);
    }

    #[test]
    fn upgoing_line_uses_antipode() {
        let up = project_line(30.0, -40.0);
        let down = project_line(210.0, 40.0);
        assert!(up.distance(&down) < EPS);
    }

    #[test]
    fn down_dip_rake_matches_dip_direction() {
        let (trend, plunge) = rake_line(350.0, 35.0, 90.0);
        assert!((trend - 80.0).abs() < 1e-6);
        assert!((plunge - 35.0).abs() < 1e-6);
    }

    #[test]
    fn great_circle_endpoints_lie_on_strike() {
        let plane = NodalPlane::new(0.0, 60.0, 90.0);
        let points = great_circle(&plane, 36);
        assert_eq!(points.len(), 37);
        assert!((points[0].y - 1.0).abs() < 1e-9);
        assert!((points[36].y + 1.0).abs() < 1e-9);
        assert!(points.iter().all(|p| p.x >= -1e-9));
    }
}
