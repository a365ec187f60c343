use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::interaction::session::{
    PlotSession, ReviewState, Selection, TraceView, WaveformPanel,
};
use crate::mechanism::{ArrivalId, FocalMechanism, Polarity, SourceLocator};
use crate::prelude::{ReviewConfig, ReviewError, ReviewResult};
use crate::projection::{MarkerTag, PickRef, ProjectionMapper, ProjectionSurface};
use crate::telemetry::{EventLog, MetricsSnapshot, ReviewMetrics};
use crate::waveform::{FetchWindow, FetchedWaveform, WaveformFetcher, WaveformStore};

/// Panels of the review figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axes {
    Projection,
    Waveform,
}

/// Events delivered by the GUI collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlotEvent {
    /// Markers of one group under the pointer, in the order the surface reports them.
    MarkerPick { tag: MarkerTag, hits: Vec<usize> },
    PointerEnter { axes: Axes },
    PointerLeave { axes: Axes },
    ButtonPress { axes: Option<Axes> },
}

/// A waveform fetch issued by the controller; only the newest one may land.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub generation: u64,
    pub pick: PickRef,
    pub arrival_id: ArrivalId,
    pub station: String,
    pub locator: SourceLocator,
    pub window: FetchWindow,
    pub seconds: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Selected { pick: PickRef, label: Polarity },
    ContextShown { pick: PickRef },
    Toggled { pick: PickRef, label: Polarity },
    Highlighted(bool),
    Superseded { generation: u64 },
}

/// Result of dispatching one event at the interaction boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Updated(Transition),
    Ignored,
    Failed(ReviewError),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolarityCorrection {
    pub arrival_id: ArrivalId,
    pub station: String,
    pub source: Polarity,
    pub reviewed: Polarity,
}

/// What a closed session leaves behind.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewSummary {
    pub origin_id: String,
    pub reviewed: Vec<ArrivalId>,
    pub corrections: Vec<PolarityCorrection>,
    pub metrics: MetricsSnapshot,
}

/// Event state machine for one plotted mechanism.
pub struct InteractionController<S> {
    session: PlotSession,
    fetcher: WaveformFetcher<S>,
    mapper: ProjectionMapper,
    config: ReviewConfig,
    log: EventLog,
    metrics: Arc<ReviewMetrics>,
}

impl<S: WaveformStore> InteractionController<S> {
    pub fn open(
        mechanism: FocalMechanism,
        fetcher: WaveformFetcher<S>,
        config: ReviewConfig,
    ) -> ReviewResult<Self> {
        mechanism.check_unique_arrivals()?;
        let mapper = ProjectionMapper::new(&config);
        let layout = mapper.map(&mechanism)?;
        let mut log = EventLog::with_capacity(config.history_len);
        log.record(format!(
            "opened {}: {} up / {} down picks",
            mechanism.origin_id,
            layout.up.len(),
            layout.down.len()
        ));
        Ok(Self {
            session: PlotSession::new(mechanism, layout),
            fetcher,
            mapper,
            config,
            log,
            metrics: Arc::new(ReviewMetrics::new()),
        })
    }

    pub fn session(&self) -> &PlotSession {
        &self.session
    }

    pub fn state(&self) -> ReviewState {
        self.session.state()
    }

    pub fn config(&self) -> &ReviewConfig {
        &self.config
    }

    pub fn fetcher(&self) -> &WaveformFetcher<S> {
        &self.fetcher
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn metrics(&self) -> Arc<ReviewMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn render(&self, surface: &mut dyn ProjectionSurface) {
        self.mapper
            .render(self.session.mechanism(), self.session.layout(), surface);
    }

    /// Synchronous dispatch: marker picks fetch on the calling thread.
    pub fn handle(&mut self, event: PlotEvent) -> Outcome {
        let result = match event {
            PlotEvent::MarkerPick { tag, hits } => match self.begin_pick(tag, &hits) {
                Some(request) => self.run_fetch(request),
                None => return Outcome::Ignored,
            },
            PlotEvent::PointerEnter {
                axes: Axes::Waveform,
            } => self.set_highlight(true),
            PlotEvent::PointerLeave {
                axes: Axes::Waveform,
            } => self.set_highlight(false),
            PlotEvent::ButtonPress {
                axes: Some(Axes::Waveform),
            } => self.toggle_polarity(),
            PlotEvent::PointerEnter { .. }
            | PlotEvent::PointerLeave { .. }
            | PlotEvent::ButtonPress { .. } => return Outcome::Ignored,
        };
        self.boundary(result)
    }

    /// Synchronously refetches the selected pick with the context window.
    pub fn expand_context(&mut self) -> Outcome {
        let result = self
            .begin_context()
            .and_then(|request| self.run_fetch(request));
        self.boundary(result)
    }

    /// Resolves a marker pick into a fetch request. Zero hits or an index the
    /// mapper never emitted leave the session untouched.
    pub fn begin_pick(&mut self, tag: MarkerTag, hits: &[usize]) -> Option<FetchRequest> {
        let Some(&local) = hits.first() else {
            debug!("marker pick on {:?} with no hits", tag);
            return None;
        };
        let Some(pick) = self.session.layout().index.resolve(tag, local) else {
            debug!("marker {:?}[{}] does not resolve to a pick", tag, local);
            return None;
        };
        Some(self.issue(pick, FetchWindow::Onset))
    }

    pub fn begin_context(&mut self) -> ReviewResult<FetchRequest> {
        let pick = self
            .session
            .selection()
            .ok_or(ReviewError::NoSelection)?
            .pick;
        Ok(self.issue(pick, FetchWindow::Context))
    }

    fn issue(&mut self, pick: PickRef, window: FetchWindow) -> FetchRequest {
        let generation = self.session.next_generation();
        self.fetcher.gate().advance_to(generation);
        let mechanism = self.session.mechanism();
        let source = &mechanism.picks[pick.0];
        self.metrics.record_fetch();
        FetchRequest {
            generation,
            pick,
            arrival_id: source.arrival_id,
            station: source.station.clone(),
            locator: mechanism.source.clone(),
            window,
            seconds: window.seconds(&self.config),
        }
    }

    fn run_fetch(&mut self, request: FetchRequest) -> ReviewResult<Transition> {
        let result = self
            .fetcher
            .fetch(&request.locator, request.arrival_id, request.seconds);
        self.complete_fetch(&request, result)
    }

    /// Applies a fetch result. Results from superseded requests are dropped;
    /// failures leave the panel exactly as it was. The label is read when the
    /// result lands, so toggles made while the fetch was pending survive.
    pub fn complete_fetch(
        &mut self,
        request: &FetchRequest,
        result: ReviewResult<FetchedWaveform>,
    ) -> ReviewResult<Transition> {
        if request.generation != self.session.generation() {
            self.metrics.record_superseded();
            debug!(
                "dropping fetch {} for arrival {}; latest is {}",
                request.generation,
                request.arrival_id,
                self.session.generation()
            );
            return Ok(Transition::Superseded {
                generation: request.generation,
            });
        }

        let fetched = match result {
            Ok(fetched) => fetched,
            Err(err) => {
                self.metrics.record_failure();
                warn!("fetch for arrival {} failed: {}", request.arrival_id, err);
                self.log.record(format!(
                    "{} -- {}: {}",
                    request.station, request.arrival_id, err
                ));
                return Err(err);
            }
        };

        let label = match request.window {
            FetchWindow::Onset => self.session.effective_polarity(request.pick),
            FetchWindow::Context => self.session.selection().map(|selection| selection.label),
        }
        .ok_or(ReviewError::NoSelection)?;
        let color = self.config.palette.color(label);
        let trace = TraceView {
            fetched,
            window: request.window,
            color,
        };

        if request.window == FetchWindow::Context {
            self.session.panel.trace = Some(trace);
            self.log.record(format!(
                "{} -- {}: context {:.1}s",
                request.station, request.arrival_id, request.seconds
            ));
            return Ok(Transition::ContextShown { pick: request.pick });
        }

        let highlighted = self.session.panel.highlighted;
        self.session.panel = WaveformPanel {
            title: format!("{} -- {}", request.station, request.arrival_id),
            axis_label: label.label().to_string(),
            trace: Some(trace),
            highlighted,
        };
        self.session.selection = Some(Selection {
            pick: request.pick,
            arrival_id: request.arrival_id,
            station: request.station.clone(),
            label,
        });
        if !self.session.reviewed.contains(&request.pick) {
            self.session.reviewed.push(request.pick);
        }
        self.metrics.record_review();
        self.log.record(format!(
            "{} -- {}: reviewing as {}",
            request.station, request.arrival_id, label
        ));
        Ok(Transition::Selected {
            pick: request.pick,
            label,
        })
    }

    /// Waveform panel hover; only meaningful while a pick is under review.
    pub fn set_highlight(&mut self, highlighted: bool) -> ReviewResult<Transition> {
        if self.session.selection.is_none() {
            return Err(ReviewError::NoSelection);
        }
        self.session.panel.highlighted = highlighted;
        Ok(Transition::Highlighted(highlighted))
    }

    /// Flips the displayed label of the selected pick. The source pick and the
    /// marker groups are left alone.
    pub fn toggle_polarity(&mut self) -> ReviewResult<Transition> {
        let selection = self
            .session
            .selection
            .as_mut()
            .ok_or(ReviewError::NoSelection)?;
        let label = selection.label.toggled();
        selection.label = label;
        let pick = selection.pick;
        let summary = format!(
            "{} -- {}: relabelled {}",
            selection.station, selection.arrival_id, label
        );

        self.session.set_override(pick, label);
        let color = self.config.palette.color(label);
        if let Some(trace) = self.session.panel.trace.as_mut() {
            trace.color = color;
        }
        self.session.panel.axis_label = label.label().to_string();
        self.metrics.record_toggle();
        self.log.record(summary);
        Ok(Transition::Toggled { pick, label })
    }

    fn boundary(&mut self, result: ReviewResult<Transition>) -> Outcome {
        match result {
            Ok(transition) => Outcome::Updated(transition),
            Err(err) if err.is_user_visible() => Outcome::Failed(err),
            Err(err) => {
                debug!("ignored event: {}", err);
                Outcome::Ignored
            }
        }
    }

    /// Ends the session.
    pub fn close(self) -> ReviewSummary {
        let mechanism = self.session.mechanism();
        let reviewed = self
            .session
            .reviewed()
            .iter()
            .filter_map(|pick| mechanism.pick(pick.0))
            .map(|pick| pick.arrival_id)
            .collect();
        let corrections = self
            .session
            .overrides()
            .iter()
            .filter_map(|(arrival_id, &label)| {
                let pick = mechanism.pick(mechanism.position_of(*arrival_id)?)?;
                Some(PolarityCorrection {
                    arrival_id: *arrival_id,
                    station: pick.station.clone(),
                    source: Polarity::from_sign(pick.polarity)?,
                    reviewed: label,
                })
            })
            .collect();
        ReviewSummary {
            origin_id: mechanism.origin_id.clone(),
            reviewed,
            corrections,
            metrics: self.metrics.snapshot(),
        }
    }
}
