use log::{debug, warn};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::mechanism::{ArrivalId, SourceLocator};
use crate::prelude::{ReviewConfig, ReviewError, ReviewResult};
use crate::waveform::record::{ArrivalRecord, ChannelWindow, WaveformSegment};
use crate::waveform::store::WaveformStore;

/// Which review mode a fetch serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchWindow {
    /// Narrow window for judging the first motion.
    Onset,
    /// Wider window showing the surrounding signal.
    Context,
}

impl FetchWindow {
    pub fn seconds(self, config: &ReviewConfig) -> f64 {
        match self {
            FetchWindow::Onset => config.onset_window,
            FetchWindow::Context => config.context_window,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchedWaveform {
    pub arrival: ArrivalRecord,
    pub window: ChannelWindow,
    pub segment: WaveformSegment,
}

/// Generation of the newest issued fetch, shared with running fetch tasks.
#[derive(Debug, Clone, Default)]
pub struct FetchGate(Arc<AtomicU64>);

impl FetchGate {
    pub fn advance_to(&self, generation: u64) {
        self.0.fetch_max(generation, Ordering::SeqCst);
    }

    pub fn latest(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    pub fn is_current(&self, generation: u64) -> bool {
        generation >= self.latest()
    }
}

/// Resolves an arrival and pulls the samples around its onset.
pub struct WaveformFetcher<S> {
    store: Arc<S>,
    timeout: Duration,
    gate: FetchGate,
}

impl<S> Clone for WaveformFetcher<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            timeout: self.timeout,
            gate: self.gate.clone(),
        }
    }
}

impl<S: WaveformStore> WaveformFetcher<S> {
    pub fn new(store: Arc<S>, config: &ReviewConfig) -> Self {
        Self {
            store,
            timeout: config.fetch_timeout(),
            gate: FetchGate::default(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Shared by every clone; advancing it cancels older async fetches.
    pub fn gate(&self) -> &FetchGate {
        &self.gate
    }

    pub fn fetch(
        &self,
        locator: &SourceLocator,
        arrival_id: ArrivalId,
        seconds: f64,
    ) -> ReviewResult<FetchedWaveform> {
        fetch_from(self.store.as_ref(), locator, arrival_id, seconds, || true)
    }
}

impl<S: WaveformStore + Send + Sync + 'static> WaveformFetcher<S> {
    /// Runs the blocking store access off the dispatch thread, bounded by the
    /// configured timeout. The task stops before its next store call once a
    /// newer generation is issued or the timeout fires.
    pub async fn fetch_async(
        &self,
        locator: SourceLocator,
        arrival_id: ArrivalId,
        seconds: f64,
        generation: u64,
    ) -> ReviewResult<FetchedWaveform> {
        let store = Arc::clone(&self.store);
        let gate = self.gate.clone();
        let abandoned = Arc::new(AtomicBool::new(false));
        let task_abandoned = Arc::clone(&abandoned);
        let task = tokio::task::spawn_blocking(move || {
            fetch_from(store.as_ref(), &locator, arrival_id, seconds, || {
                !task_abandoned.load(Ordering::SeqCst) && gate.is_current(generation)
            })
        });
        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) => Err(ReviewError::Internal(format!("fetch task failed: {join}"))),
            Err(_) => {
                abandoned.store(true, Ordering::SeqCst);
                warn!("fetch for arrival {} timed out", arrival_id);
                Err(ReviewError::DataUnavailable(format!(
                    "arrival {} fetch timed out after {} ms",
                    arrival_id,
                    self.timeout.as_millis()
                )))
            }
        }
    }
}

fn fetch_from<S: WaveformStore + ?Sized>(
    store: &S,
    locator: &SourceLocator,
    arrival_id: ArrivalId,
    seconds: f64,
    proceed: impl Fn() -> bool,
) -> ReviewResult<FetchedWaveform> {
    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(ReviewError::InvalidGeometry(format!(
            "fetch window must be positive, got {seconds}"
        )));
    }
    let checkpoint = || {
        if proceed() {
            Ok(())
        } else {
            debug!("fetch for arrival {} cancelled", arrival_id);
            Err(ReviewError::Cancelled(arrival_id))
        }
    };
    checkpoint()?;
    let arrival = store.arrival(locator, arrival_id)?;
    let window = ChannelWindow::around(&arrival, seconds);
    checkpoint()?;
    let segment = store.samples(locator, &window)?;
    if segment.samples.is_empty() {
        return Err(ReviewError::DataUnavailable(format!(
            "{}.{} returned no samples",
            window.station, window.channel
        )));
    }
    debug!(
        "fetched {} samples for arrival {} ({}.{})",
        segment.samples.len(),
        arrival_id,
        window.station,
        window.channel
    );
    Ok(FetchedWaveform {
        arrival,
        window,
        segment,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::waveform::store::{MemoryStore, StoredTrace};
    use std::sync::atomic::AtomicUsize;

    fn locator() -> SourceLocator {
        SourceLocator("memory://fetch".into())
    }

    fn store() -> MemoryStore {
        let mut store = MemoryStore::new(locator());
        store.insert_arrival(ArrivalRecord {
            arrival_id: ArrivalId(1),
            station: "AAA".into(),
            channel: "HHZ".into(),
            onset: 100.0,
        });
        store.insert_arrival(ArrivalRecord {
            arrival_id: ArrivalId(2),
            station: "GAP".into(),
            channel: "HHZ".into(),
            onset: 100.0,
        });
        store.insert_trace(StoredTrace {
            station: "AAA".into(),
            channel: "HHZ".into(),
            start: 95.0,
            sample_rate: 100.0,
            samples: vec![0.5; 1001],
        });
        store
    }

    /// Answers the arrival lookup slowly and counts sample requests.
    #[derive(Default)]
    struct SlowStore {
        sample_calls: AtomicUsize,
    }

    impl WaveformStore for SlowStore {
        fn arrival(
            &self,
            _locator: &SourceLocator,
            arrival_id: ArrivalId,
        ) -> ReviewResult<ArrivalRecord> {
            std::thread::sleep(Duration::from_millis(200));
            Ok(ArrivalRecord {
                arrival_id,
                station: "SLW".into(),
                channel: "HHZ".into(),
                onset: 100.0,
            })
        }

        fn samples(
            &self,
            _locator: &SourceLocator,
            window: &ChannelWindow,
        ) -> ReviewResult<WaveformSegment> {
            self.sample_calls.fetch_add(1, Ordering::SeqCst);
            Err(ReviewError::DataUnavailable(window.station.clone()))
        }
    }

    #[test]
    fn onset_window_is_half_second() {
        let config = ReviewConfig::default();
        let fetcher = WaveformFetcher::new(Arc::new(store()), &config);
        let fetched = fetcher
            .fetch(&locator(), ArrivalId(1), FetchWindow::Onset.seconds(&config))
            .unwrap();
        assert_eq!(fetched.window.start, 99.75);
        assert_eq!(fetched.window.end, 100.25);
        assert!(!fetched.segment.samples.is_empty());
        assert!(fetched.segment.start >= 99.75 && fetched.segment.end() <= 100.25);
    }

    #[test]
    fn fetch_reports_lookup_and_gap_errors() {
        let config = ReviewConfig::default();
        let fetcher = WaveformFetcher::new(Arc::new(store()), &config);
        assert_eq!(
            fetcher.fetch(&locator(), ArrivalId(9), 0.5),
            Err(ReviewError::Lookup(ArrivalId(9)))
        );
        assert!(matches!(
            fetcher.fetch(&locator(), ArrivalId(2), 0.5),
            Err(ReviewError::DataUnavailable(_))
        ));
        assert!(matches!(
            fetcher.fetch(&locator(), ArrivalId(1), 0.0),
            Err(ReviewError::InvalidGeometry(_))
        ));
    }

    #[tokio::test]
    async fn async_fetch_matches_blocking_fetch() {
        let config = ReviewConfig::default();
        let fetcher = WaveformFetcher::new(Arc::new(store()), &config);
        let fetched = fetcher
            .fetch_async(locator(), ArrivalId(1), 4.0, 0)
            .await
            .unwrap();
        assert_eq!(fetched, fetcher.fetch(&locator(), ArrivalId(1), 4.0).unwrap());
    }

    #[tokio::test]
    async fn async_fetch_timeout_is_data_unavailable() {
        let config = ReviewConfig {
            fetch_timeout_ms: 20,
            ..Default::default()
        };
        let fetcher = WaveformFetcher::new(Arc::new(SlowStore::default()), &config);
        let result = fetcher.fetch_async(locator(), ArrivalId(3), 0.5, 0).await;
        assert!(matches!(result, Err(ReviewError::DataUnavailable(_))));

        // the abandoned task wakes from the lookup and stops there
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(fetcher.store().sample_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn superseded_async_fetch_never_reaches_store() {
        let config = ReviewConfig::default();
        let fetcher = WaveformFetcher::new(Arc::new(store()), &config);
        fetcher.gate().advance_to(2);
        assert!(!fetcher.gate().is_current(1));
        assert_eq!(
            fetcher.fetch_async(locator(), ArrivalId(1), 0.5, 1).await,
            Err(ReviewError::Cancelled(ArrivalId(1)))
        );
        assert!(fetcher
            .fetch_async(locator(), ArrivalId(1), 0.5, 2)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn newer_generation_cancels_running_fetch() {
        let config = ReviewConfig::default();
        let fetcher = WaveformFetcher::new(Arc::new(SlowStore::default()), &config);
        fetcher.gate().advance_to(1);
        let running = fetcher.clone();
        let task = tokio::spawn(async move {
            running.fetch_async(locator(), ArrivalId(5), 0.5, 1).await
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        fetcher.gate().advance_to(2);

        assert_eq!(task.await.unwrap(), Err(ReviewError::Cancelled(ArrivalId(5))));
        assert_eq!(fetcher.store().sample_calls.load(Ordering::SeqCst), 0);
    }
}
