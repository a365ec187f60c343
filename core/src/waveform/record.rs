use serde::{Deserialize, Serialize};

use crate::mechanism::ArrivalId;

/// Onset metadata for one arrival, as kept by the waveform store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrivalRecord {
    pub arrival_id: ArrivalId,
    pub station: String,
    pub channel: String,
    /// Epoch seconds.
    pub onset: f64,
}

/// Station/channel/time request sent to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelWindow {
    pub station: String,
    pub channel: String,
    pub start: f64,
    pub end: f64,
}

impl ChannelWindow {
    /// Window of `length` seconds centred on the arrival's onset.
    pub fn around(arrival: &ArrivalRecord, length: f64) -> Self {
        let half = length / 2.0;
        Self {
            station: arrival.station.clone(),
            channel: arrival.channel.clone(),
            start: arrival.onset - half,
            end: arrival.onset + half,
        }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Single-channel samples returned for a window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveformSegment {
    pub station: String,
    pub channel: String,
    pub start: f64,
    pub sample_rate: f64,
    pub samples: Vec<f32>,
}

impl WaveformSegment {
    pub fn end(&self) -> f64 {
        if self.samples.is_empty() || self.sample_rate <= 0.0 {
            return self.start;
        }
        self.start + (self.samples.len() - 1) as f64 / self.sample_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_is_symmetric_about_onset() {
        let arrival = ArrivalRecord {
            arrival_id: ArrivalId(2),
            station: "BBB".into(),
            channel: "HHZ".into(),
            onset: 100.0,
        };
        let window = ChannelWindow::around(&arrival, 0.5);
        assert_eq!(window.start, 99.75);
        assert_eq!(window.end, 100.25);
        assert_eq!(window.duration(), 0.5);
    }
}
