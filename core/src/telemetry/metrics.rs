use serde::Serialize;
use std::sync::Mutex;

pub struct ReviewMetrics {
    inner: Mutex<MetricsSnapshot>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub fetches: usize,
    pub reviews: usize,
    pub toggles: usize,
    pub failures: usize,
    pub superseded: usize,
}

impl ReviewMetrics {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsSnapshot::default()),
        }
    }

    fn bump(&self, field: impl FnOnce(&mut MetricsSnapshot) -> &mut usize) {
        if let Ok(mut metrics) = self.inner.lock() {
            *field(&mut *metrics) += 1;
        }
    }

    pub fn record_fetch(&self) {
        self.bump(|m| &mut m.fetches);
    }

    pub fn record_review(&self) {
        self.bump(|m| &mut m.reviews);
    }

    pub fn record_toggle(&self) {
        self.bump(|m| &mut m.toggles);
    }

    pub fn record_failure(&self) {
        self.bump(|m| &mut m.failures);
    }

    pub fn record_superseded(&self) {
        self.bump(|m| &mut m.superseded);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        if let Ok(metrics) = self.inner.lock() {
            *metrics
        } else {
            MetricsSnapshot::default()
        }
    }
}

impl Default for ReviewMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_independently() {
        let metrics = ReviewMetrics::new();
        metrics.record_fetch();
        metrics.record_fetch();
        metrics.record_toggle();
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.fetches, 2);
        assert_eq!(snapshot.toggles, 1);
        assert_eq!(snapshot.failures, 0);
    }
}
