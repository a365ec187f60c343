use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Per-route request counters served on `/metrics`.
pub struct BridgeMetrics {
    inner: Mutex<BridgeCounters>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeCounters {
    pub mechanism_requests: usize,
    pub arrival_requests: usize,
    pub waveform_requests: usize,
    pub failures: usize,
}

impl BridgeMetrics {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(BridgeCounters::default()),
        }
    }

    pub fn record_mechanism(&self) {
        if let Ok(mut counters) = self.inner.lock() {
            counters.mechanism_requests += 1;
        }
    }

    pub fn record_arrival(&self) {
        if let Ok(mut counters) = self.inner.lock() {
            counters.arrival_requests += 1;
        }
    }

    pub fn record_waveform(&self) {
        if let Ok(mut counters) = self.inner.lock() {
            counters.waveform_requests += 1;
        }
    }

    pub fn record_failure(&self) {
        if let Ok(mut counters) = self.inner.lock() {
            counters.failures += 1;
        }
    }

    pub fn snapshot(&self) -> BridgeCounters {
        if let Ok(counters) = self.inner.lock() {
            *counters
        } else {
            BridgeCounters::default()
        }
    }
}

impl Default for BridgeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_are_counted_separately() {
        let metrics = BridgeMetrics::new();
        metrics.record_arrival();
        metrics.record_waveform();
        metrics.record_waveform();
        metrics.record_failure();
        assert_eq!(
            metrics.snapshot(),
            BridgeCounters {
                mechanism_requests: 0,
                arrival_requests: 1,
                waveform_requests: 2,
                failures: 1,
            }
        );
    }
}
