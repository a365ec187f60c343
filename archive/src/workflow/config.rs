use anyhow::Context;
use focalcore::interaction::PlotEvent;
use focalcore::prelude::ReviewConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;

use crate::generator::profile::GeneratorConfig;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub generator: GeneratorConfig,
    pub review: ReviewConfig,
    /// Events replayed by the offline review.
    pub script: Vec<PlotEvent>,
    pub bind: SocketAddr,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            generator: GeneratorConfig::default(),
            review: ReviewConfig::default(),
            script: Vec::new(),
            bind: SocketAddr::from(([127, 0, 0, 1], 9000)),
        }
    }
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn from_args(stations: usize, seed: u64) -> Self {
        Self {
            generator: GeneratorConfig {
                stations,
                seed,
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use focalcore::interaction::Axes;
    use focalcore::projection::MarkerTag;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn config_from_args_sets_generator() {
        let cfg = WorkflowConfig::from_args(8, 42);
        assert_eq!(cfg.generator.stations, 8);
        assert_eq!(cfg.generator.seed, 42);
        assert_eq!(cfg.review.onset_window, 0.5);
    }

    #[test]
    fn config_load_reads_yaml() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(
            b"generator:\n  stations: 5\n  gaps: [2]\nreview:\n  onset_window: 1.0\nscript:\n  - kind: marker_pick\n    tag: Up\n    hits: [0]\n  - kind: button_press\n    axes: waveform\n",
        )
        .unwrap();
        let path = temp.into_temp_path();
        let cfg = WorkflowConfig::load(&path).unwrap();
        assert_eq!(cfg.generator.stations, 5);
        assert_eq!(cfg.generator.gaps, vec![2]);
        assert_eq!(cfg.review.onset_window, 1.0);
        assert_eq!(cfg.review.context_window, 4.0);
        assert_eq!(
            cfg.script,
            vec![
                PlotEvent::MarkerPick {
                    tag: MarkerTag::Up,
                    hits: vec![0]
                },
                PlotEvent::ButtonPress {
                    axes: Some(Axes::Waveform)
                },
            ]
        );
    }
}
