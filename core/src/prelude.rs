use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::mechanism::{ArrivalId, Polarity};

/// Shared configuration for a review session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    /// Window (seconds) used when a marker click opens a pick for onset inspection.
    pub onset_window: f64,
    /// Wider window (seconds) used when the reviewer asks for more context.
    pub context_window: f64,
    pub fetch_timeout_ms: u64,
    pub station_labels: bool,
    pub palette: TracePalette,
    pub history_len: usize,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            onset_window: 0.5,
            context_window: 4.0,
            fetch_timeout_ms: 2_000,
            station_labels: true,
            palette: TracePalette::default(),
            history_len: 20,
        }
    }
}

impl ReviewConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms.max(1))
    }
}

/// RGB colour triple in the 0..=1 range.
pub type Rgb = [f32; 3];

/// Trace colours keyed by polarity label.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TracePalette {
    pub up: Rgb,
    pub down: Rgb,
}

impl Default for TracePalette {
    fn default() -> Self {
        Self {
            up: [1.0, 0.0, 0.0],
            down: [0.0, 0.0, 1.0],
        }
    }
}

impl TracePalette {
    pub fn color(&self, polarity: Polarity) -> Rgb {
        match polarity {
            Polarity::Up => self.up,
            Polarity::Down => self.down,
        }
    }
}

/// Common error type for the review loop.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ReviewError {
    #[error("arrival {0} not found in waveform store")]
    Lookup(ArrivalId),
    #[error("no waveform data available: {0}")]
    DataUnavailable(String),
    #[error("no pick selected")]
    NoSelection,
    #[error("pick {index} ({station}) has zero polarity")]
    ZeroPolarity { index: usize, station: String },
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),
    #[error("fetch for arrival {0} cancelled")]
    Cancelled(ArrivalId),
    #[error("internal failure: {0}")]
    Internal(String),
}

impl ReviewError {
    /// Errors the reviewer should see; guards are swallowed at the boundary.
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, ReviewError::NoSelection | ReviewError::Cancelled(_))
    }
}

pub type ReviewResult<T> = Result<T, ReviewError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_windows_match_review_modes() {
        let config = ReviewConfig::default();
        assert_eq!(config.onset_window, 0.5);
        assert_eq!(config.context_window, 4.0);
        assert_eq!(config.fetch_timeout(), Duration::from_secs(2));
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config: ReviewConfig = serde_json::from_str(r#"{"onset_window": 1.0}"#).unwrap();
        assert_eq!(config.onset_window, 1.0);
        assert_eq!(config.history_len, 20);
        assert_eq!(config.palette, TracePalette::default());
    }

    #[test]
    fn guards_are_not_user_visible() {
        assert!(!ReviewError::NoSelection.is_user_visible());
        assert!(!ReviewError::Cancelled(ArrivalId(4)).is_user_visible());
        assert!(ReviewError::Lookup(ArrivalId(4)).is_user_visible());
        assert!(ReviewError::DataUnavailable("gap".into()).is_user_visible());
    }
}
