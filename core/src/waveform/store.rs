use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::mechanism::{ArrivalId, SourceLocator};
use crate::prelude::{ReviewError, ReviewResult};
use crate::waveform::record::{ArrivalRecord, ChannelWindow, WaveformSegment};

/// Time-series store collaborator.
pub trait WaveformStore {
    fn arrival(&self, locator: &SourceLocator, arrival_id: ArrivalId)
        -> ReviewResult<ArrivalRecord>;

    fn samples(
        &self,
        locator: &SourceLocator,
        window: &ChannelWindow,
    ) -> ReviewResult<WaveformSegment>;
}

/// Continuous samples for one station/channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredTrace {
    pub station: String,
    pub channel: String,
    pub start: f64,
    pub sample_rate: f64,
    pub samples: Vec<f32>,
}

impl StoredTrace {
    /// Samples whose timestamps fall inside `[start, end]`.
    pub fn slice(&self, start: f64, end: f64) -> Option<WaveformSegment> {
        if self.samples.is_empty() || self.sample_rate <= 0.0 || end < start {
            return None;
        }
        let last = (self.samples.len() - 1) as f64;
        let first_idx = ((start - self.start) * self.sample_rate).ceil().max(0.0);
        let last_idx = ((end - self.start) * self.sample_rate).floor().min(last);
        if first_idx > last_idx {
            return None;
        }
        let (first_idx, last_idx) = (first_idx as usize, last_idx as usize);
        Some(WaveformSegment {
            station: self.station.clone(),
            channel: self.channel.clone(),
            start: self.start + first_idx as f64 / self.sample_rate,
            sample_rate: self.sample_rate,
            samples: self.samples[first_idx..=last_idx].to_vec(),
        })
    }
}

/// In-process store serving one locator; also the archive's on-disk format.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "StoreContents", into = "StoreContents")]
pub struct MemoryStore {
    pub locator: SourceLocator,
    arrivals: Vec<ArrivalRecord>,
    traces: Vec<StoredTrace>,
    by_arrival: HashMap<ArrivalId, usize>,
}

#[derive(Serialize, Deserialize)]
struct StoreContents {
    locator: SourceLocator,
    arrivals: Vec<ArrivalRecord>,
    traces: Vec<StoredTrace>,
}

impl From<StoreContents> for MemoryStore {
    fn from(contents: StoreContents) -> Self {
        let mut store = MemoryStore {
            locator: contents.locator,
            arrivals: contents.arrivals,
            traces: contents.traces,
            by_arrival: HashMap::new(),
        };
        store.reindex();
        store
    }
}

impl From<MemoryStore> for StoreContents {
    fn from(store: MemoryStore) -> Self {
        StoreContents {
            locator: store.locator,
            arrivals: store.arrivals,
            traces: store.traces,
        }
    }
}

impl MemoryStore {
    pub fn new(locator: SourceLocator) -> Self {
        Self {
            locator,
            ..Default::default()
        }
    }

    pub fn insert_arrival(&mut self, record: ArrivalRecord) {
        match self.by_arrival.get(&record.arrival_id) {
            Some(&slot) => self.arrivals[slot] = record,
            None => {
                self.by_arrival
                    .insert(record.arrival_id, self.arrivals.len());
                self.arrivals.push(record);
            }
        }
    }

    pub fn insert_trace(&mut self, trace: StoredTrace) {
        self.traces.push(trace);
    }

    pub fn arrivals(&self) -> &[ArrivalRecord] {
        &self.arrivals
    }

    pub fn traces(&self) -> &[StoredTrace] {
        &self.traces
    }

    fn reindex(&mut self) {
        self.by_arrival = self
            .arrivals
            .iter()
            .enumerate()
            .map(|(slot, record)| (record.arrival_id, slot))
            .collect();
    }
}

impl WaveformStore for MemoryStore {
    fn arrival(
        &self,
        locator: &SourceLocator,
        arrival_id: ArrivalId,
    ) -> ReviewResult<ArrivalRecord> {
        if *locator != self.locator {
            return Err(ReviewError::Lookup(arrival_id));
        }
        self.by_arrival
            .get(&arrival_id)
            .map(|&slot| self.arrivals[slot].clone())
            .ok_or(ReviewError::Lookup(arrival_id))
    }

    fn samples(
        &self,
        locator: &SourceLocator,
        window: &ChannelWindow,
    ) -> ReviewResult<WaveformSegment> {
        let unavailable = || {
            ReviewError::DataUnavailable(format!(
                "{}.{} {:.3}..{:.3}",
                window.station, window.channel, window.start, window.end
            ))
        };
        if *locator != self.locator {
            return Err(unavailable());
        }
        self.traces
            .iter()
            .filter(|trace| trace.station == window.station && trace.channel == window.channel)
            .find_map(|trace| trace.slice(window.start, window.end))
            .ok_or_else(unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MemoryStore {
        let mut store = MemoryStore::new(SourceLocator("memory://unit".into()));
        store.insert_arrival(ArrivalRecord {
            arrival_id: ArrivalId(7),
            station: "AAA".into(),
            channel: "HHZ".into(),
            onset: 10.0,
        });
        store.insert_trace(StoredTrace {
            station: "AAA".into(),
            channel: "HHZ".into(),
            start: 8.0,
            sample_rate: 10.0,
            samples: (0..41).map(|i| i as f32).collect(),
        });
        store
    }

    #[test]
    fn slice_keeps_samples_inside_window() {
        let store = store();
        let window = ChannelWindow {
            station: "AAA".into(),
            channel: "HHZ".into(),
            start: 9.5,
            end: 10.5,
        };
        let segment = store.samples(&store.locator, &window).unwrap();
        assert_eq!(segment.samples.len(), 11);
        assert_eq!(segment.samples[0], 15.0);
        assert_eq!(segment.start, 9.5);
    }

    #[test]
    fn window_outside_trace_is_unavailable() {
        let store = store();
        let window = ChannelWindow {
            station: "AAA".into(),
            channel: "HHZ".into(),
            start: 20.0,
            end: 21.0,
        };
        assert!(matches!(
            store.samples(&store.locator, &window),
            Err(ReviewError::DataUnavailable(_))
        ));
    }

    #[test]
    fn unknown_arrival_is_lookup_error() {
        let store = store();
        assert_eq!(
            store.arrival(&store.locator, ArrivalId(8)),
            Err(ReviewError::Lookup(ArrivalId(8)))
        );
        let other = SourceLocator("memory://other".into());
        assert!(store.arrival(&other, ArrivalId(7)).is_err());
    }

    #[test]
    fn json_round_trip_rebuilds_index() {
        let store = store();
        let json = serde_json::to_string(&store).unwrap();
        let restored: MemoryStore = serde_json::from_str(&json).unwrap();
        assert_eq!(
            restored.arrival(&restored.locator, ArrivalId(7)).unwrap().onset,
            10.0
        );
    }
}
