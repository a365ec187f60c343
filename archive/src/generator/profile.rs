use anyhow::{ensure, Context};
use focalcore::mechanism::{ArrivalId, FocalMechanism, NodalPlane, Pick, SourceLocator};
use focalcore::projection::plunge_from_takeoff;
use focalcore::waveform::{ArrivalRecord, MemoryStore, StoredTrace};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::generator::template::onset_pulse;

const CHANNEL: &str = "HHZ";
const ORIGIN_TIME: f64 = 1_700_000_000.0;
/// Rays closer than this to a nodal plane are redrawn; their sign is ambiguous.
const MIN_RADIATION: f64 = 0.05;

/// Configuration for generating a synthetic mechanism and its waveforms.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub origin_id: String,
    pub locator: String,
    pub stations: usize,
    pub plane: NodalPlane,
    pub sample_rate: f32,
    pub trace_seconds: f32,
    pub pulse_frequency: f32,
    pub noise: f32,
    pub seed: u64,
    /// Pick indices whose label is deliberately wrong, for review practice.
    pub mislabelled: Vec<usize>,
    /// Pick indices stored without waveform data.
    pub gaps: Vec<usize>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            origin_id: "orid-synthetic".into(),
            locator: "memory://synthetic".into(),
            stations: 16,
            plane: NodalPlane::new(30.0, 60.0, 90.0),
            sample_rate: 100.0,
            trace_seconds: 20.0,
            pulse_frequency: 4.0,
            noise: 0.03,
            seed: 0,
            mislabelled: Vec::new(),
            gaps: Vec::new(),
        }
    }
}

/// Mechanism plus the store holding its arrivals and traces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticArchive {
    pub mechanism: FocalMechanism,
    pub store: MemoryStore,
}

type Vec3 = [f64; 3];

fn dot(a: Vec3, b: Vec3) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// Fault normal and slip vector (north, east, down), Aki & Richards.
fn fault_vectors(plane: &NodalPlane) -> (Vec3, Vec3) {
    let (phi, delta, lambda) = (
        plane.strike.to_radians(),
        plane.dip.to_radians(),
        plane.rake.to_radians(),
    );
    let normal = [
        -delta.sin() * phi.sin(),
        delta.sin() * phi.cos(),
        -delta.cos(),
    ];
    let slip = [
        lambda.cos() * phi.cos() + delta.cos() * lambda.sin() * phi.sin(),
        lambda.cos() * phi.sin() - delta.cos() * lambda.sin() * phi.cos(),
        -lambda.sin() * delta.sin(),
    ];
    (normal, slip)
}

fn plane_from_vectors(normal: Vec3, slip: Vec3) -> NodalPlane {
    let (normal, slip) = if normal[2] > 0.0 {
        (normal.map(|v| -v), slip.map(|v| -v))
    } else {
        (normal, slip)
    };
    let dip = (-normal[2]).clamp(-1.0, 1.0).acos();
    let strike = (-normal[0]).atan2(normal[1]);
    let sin_rake = if dip.sin().abs() > 1e-12 {
        -slip[2] / dip.sin()
    } else {
        0.0
    };
    let cos_rake = slip[0] * strike.cos() + slip[1] * strike.sin();
    NodalPlane::new(
        strike.to_degrees().rem_euclid(360.0),
        dip.to_degrees(),
        sin_rake.atan2(cos_rake).to_degrees(),
    )
}

/// The second nodal plane: normal and slip swap roles.
pub fn auxiliary_plane(plane: &NodalPlane) -> NodalPlane {
    let (normal, slip) = fault_vectors(plane);
    plane_from_vectors(slip, normal)
}

/// Signed P radiation for a ray leaving at `azimuth`/`takeoff`.
pub fn p_radiation(plane: &NodalPlane, azimuth: f64, takeoff: f64) -> f64 {
    let (normal, slip) = fault_vectors(plane);
    let plunge = plunge_from_takeoff(takeoff).to_radians();
    let trend = azimuth.to_radians();
    let ray = [
        plunge.cos() * trend.cos(),
        plunge.cos() * trend.sin(),
        plunge.sin(),
    ];
    2.0 * dot(normal, ray) * dot(slip, ray)
}

pub fn build_archive(config: &GeneratorConfig) -> anyhow::Result<SyntheticArchive> {
    ensure!(config.stations > 0, "generator needs at least one station");
    ensure!(
        config.sample_rate > 0.0 && config.trace_seconds > 0.0,
        "sample rate and trace length must be positive"
    );
    ensure!(config.noise >= 0.0, "noise amplitude must not be negative");
    let sample_count = (config.sample_rate * config.trace_seconds).round() as usize + 1;
    let onset_offset = sample_count / 2;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let locator = SourceLocator(config.locator.clone());
    let mut store = MemoryStore::new(locator.clone());
    let mut picks = Vec::with_capacity(config.stations);

    for index in 0..config.stations {
        let (azimuth, takeoff, radiation) = loop {
            let azimuth: f64 = rng.gen_range(0.0..360.0);
            let takeoff: f64 = rng.gen_range(10.0..170.0);
            let radiation = p_radiation(&config.plane, azimuth, takeoff);
            if radiation.abs() >= MIN_RADIATION {
                break (azimuth, takeoff, radiation);
            }
        };
        let station = format!("S{:02}", index + 1);
        let arrival_id = ArrivalId(1_000 + index as u64);
        let onset = ORIGIN_TIME + rng.gen_range(2.0..20.0);
        let true_sign: i8 = if radiation > 0.0 { 1 } else { -1 };
        let label = if config.mislabelled.contains(&index) {
            -true_sign
        } else {
            true_sign
        };

        picks.push(Pick {
            station: station.clone(),
            arrival_id,
            azimuth: (azimuth * 10.0).round() / 10.0,
            takeoff: (takeoff * 10.0).round() / 10.0,
            polarity: label,
        });
        store.insert_arrival(ArrivalRecord {
            arrival_id,
            station: station.clone(),
            channel: CHANNEL.into(),
            onset,
        });

        if config.gaps.contains(&index) {
            continue;
        }
        let mut samples: Vec<f32> = (0..sample_count)
            .map(|_| rng.gen_range(-config.noise..=config.noise))
            .collect();
        let pulse = onset_pulse(
            config.sample_rate,
            sample_count - onset_offset,
            config.pulse_frequency,
            f32::from(true_sign) * (radiation.abs() as f32).max(0.2),
        );
        for (sample, value) in samples[onset_offset..].iter_mut().zip(pulse) {
            *sample += value;
        }
        store.insert_trace(StoredTrace {
            station,
            channel: CHANNEL.into(),
            start: onset - onset_offset as f64 / config.sample_rate as f64,
            sample_rate: config.sample_rate as f64,
            samples,
        });
    }

    let mechanism = FocalMechanism {
        origin_id: config.origin_id.clone(),
        picks,
        plane1: config.plane,
        plane2: auxiliary_plane(&config.plane),
        source: locator,
    };
    mechanism
        .check_unique_arrivals()
        .context("generated mechanism has duplicate arrivals")?;

    Ok(SyntheticArchive { mechanism, store })
}
