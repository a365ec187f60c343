use focalcore::mechanism::SourceLocator;
use focalcore::prelude::ReviewError;
use focalcore::waveform::ChannelWindow;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocatorQuery {
    pub locator: SourceLocator,
}

/// `/waveform` query string; kept flat for urlencoded decoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaveformQuery {
    pub locator: SourceLocator,
    pub station: String,
    pub channel: String,
    pub start: f64,
    pub end: f64,
}

impl WaveformQuery {
    pub fn window(&self) -> ChannelWindow {
        ChannelWindow {
            station: self.station.clone(),
            channel: self.channel.clone(),
            start: self.start,
            end: self.end,
        }
    }
}

/// Error payload; `kind` lets clients rebuild the review error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: String,
    pub message: String,
}

impl From<&ReviewError> for ErrorBody {
    fn from(err: &ReviewError) -> Self {
        let kind = match err {
            ReviewError::Lookup(_) => "lookup",
            ReviewError::DataUnavailable(_) => "data_unavailable",
            _ => "internal",
        };
        Self {
            kind: kind.into(),
            message: err.to_string(),
        }
    }
}
