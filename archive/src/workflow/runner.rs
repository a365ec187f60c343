use anyhow::Context;
use focalcore::interaction::{
    Axes, InteractionController, Outcome, PlotEvent, ReviewSummary, Transition,
};
use focalcore::projection::{MarkerTag, RecordingSurface};
use focalcore::waveform::{MemoryStore, WaveformFetcher};
use std::sync::Arc;

use crate::generator::profile::SyntheticArchive;
use crate::workflow::config::WorkflowConfig;

pub struct WorkflowResult {
    pub draw_calls: usize,
    pub outcomes: Vec<String>,
    pub summary: ReviewSummary,
}

/// Replays a scripted review against an archive, without a window.
#[derive(Clone)]
pub struct Runner {
    config: WorkflowConfig,
}

impl Runner {
    pub fn new(config: WorkflowConfig) -> Self {
        Self { config }
    }

    /// Review the first down pick and flip it when no script is configured.
    fn default_script() -> Vec<PlotEvent> {
        vec![
            PlotEvent::MarkerPick {
                tag: MarkerTag::Down,
                hits: vec![0],
            },
            PlotEvent::PointerEnter {
                axes: Axes::Waveform,
            },
            PlotEvent::ButtonPress {
                axes: Some(Axes::Waveform),
            },
            PlotEvent::PointerLeave {
                axes: Axes::Waveform,
            },
        ]
    }

    pub fn execute(&self, archive: &SyntheticArchive) -> anyhow::Result<WorkflowResult> {
        let store = Arc::new(archive.store.clone());
        let fetcher: WaveformFetcher<MemoryStore> =
            WaveformFetcher::new(store, &self.config.review);
        let mut controller = InteractionController::open(
            archive.mechanism.clone(),
            fetcher,
            self.config.review.clone(),
        )
        .context("opening review session")?;

        let mut surface = RecordingSurface::new();
        controller.render(&mut surface);

        let script = if self.config.script.is_empty() {
            Self::default_script()
        } else {
            self.config.script.clone()
        };

        let outcomes = script
            .into_iter()
            .map(|event| {
                let described = format!("{:?}", event);
                let outcome = controller.handle(event);
                format!("{} -> {}", described, describe(&outcome))
            })
            .collect();

        Ok(WorkflowResult {
            draw_calls: surface.calls.len(),
            outcomes,
            summary: controller.close(),
        })
    }
}

fn describe(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Updated(Transition::Selected { pick, label }) => {
            format!("selected pick {} as {}", pick.0, label)
        }
        Outcome::Updated(Transition::Toggled { pick, label }) => {
            format!("relabelled pick {} as {}", pick.0, label)
        }
        Outcome::Updated(Transition::ContextShown { pick }) => {
            format!("context for pick {}", pick.0)
        }
        Outcome::Updated(Transition::Highlighted(on)) => format!("highlight {}", on),
        Outcome::Updated(Transition::Superseded { generation }) => {
            format!("superseded fetch {}", generation)
        }
        Outcome::Ignored => "ignored".into(),
        Outcome::Failed(err) => format!("failed: {}", err),
    }
}
