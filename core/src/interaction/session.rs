use std::collections::BTreeMap;

use crate::mechanism::{ArrivalId, FocalMechanism, Pick, Polarity};
use crate::prelude::Rgb;
use crate::projection::{PickRef, ProjectionLayout};
use crate::waveform::{FetchWindow, FetchedWaveform};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewState {
    Idle,
    Reviewing,
}

/// The pick currently under review and the label shown for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub pick: PickRef,
    pub arrival_id: ArrivalId,
    pub station: String,
    pub label: Polarity,
}

/// Trace drawn in the waveform panel.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceView {
    pub fetched: FetchedWaveform,
    pub window: FetchWindow,
    pub color: Rgb,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WaveformPanel {
    pub title: String,
    pub axis_label: String,
    pub trace: Option<TraceView>,
    pub highlighted: bool,
}

/// View state for one plotted mechanism. Only the interaction controller
/// mutates it; the mechanism itself is never written.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotSession {
    mechanism: FocalMechanism,
    layout: ProjectionLayout,
    pub(crate) selection: Option<Selection>,
    pub(crate) overrides: BTreeMap<ArrivalId, Polarity>,
    pub(crate) panel: WaveformPanel,
    pub(crate) reviewed: Vec<PickRef>,
    pub(crate) generation: u64,
}

impl PlotSession {
    pub fn new(mechanism: FocalMechanism, layout: ProjectionLayout) -> Self {
        Self {
            mechanism,
            layout,
            selection: None,
            overrides: BTreeMap::new(),
            panel: WaveformPanel::default(),
            reviewed: Vec::new(),
            generation: 0,
        }
    }

    pub fn state(&self) -> ReviewState {
        if self.selection.is_some() {
            ReviewState::Reviewing
        } else {
            ReviewState::Idle
        }
    }

    pub fn mechanism(&self) -> &FocalMechanism {
        &self.mechanism
    }

    pub fn layout(&self) -> &ProjectionLayout {
        &self.layout
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn panel(&self) -> &WaveformPanel {
        &self.panel
    }

    pub fn overrides(&self) -> &BTreeMap<ArrivalId, Polarity> {
        &self.overrides
    }

    pub fn reviewed(&self) -> &[PickRef] {
        &self.reviewed
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn pick(&self, pick: PickRef) -> Option<&Pick> {
        self.mechanism.pick(pick.0)
    }

    /// Override if the reviewer flipped this pick, otherwise the source sign.
    pub fn effective_polarity(&self, pick: PickRef) -> Option<Polarity> {
        let source = self.pick(pick)?;
        self.overrides
            .get(&source.arrival_id)
            .copied()
            .or_else(|| Polarity::from_sign(source.polarity))
    }

    /// Records a label for a pick; matching the source sign clears the override.
    pub(crate) fn set_override(&mut self, pick: PickRef, label: Polarity) {
        let Some(source) = self.mechanism.pick(pick.0) else {
            return;
        };
        if Polarity::from_sign(source.polarity) == Some(label) {
            self.overrides.remove(&source.arrival_id);
        } else {
            self.overrides.insert(source.arrival_id, label);
        }
    }

    pub(crate) fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }
}
