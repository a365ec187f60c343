use focalcore::mechanism::ArrivalId;
use focalcore::prelude::ReviewError;
use focalcore::waveform::WaveformStore;
use log::{error, info, warn};
use std::{net::SocketAddr, sync::Arc, thread};
use tokio::runtime::Builder;
use warp::{http::StatusCode, reply::Json, reply::WithStatus, Filter};

use crate::bridge::metrics::BridgeMetrics;
use crate::bridge::model::{ErrorBody, LocatorQuery, WaveformQuery};
use crate::generator::profile::SyntheticArchive;

/// Archive plus request counters shared by every route.
pub struct BridgeState {
    archive: SyntheticArchive,
    metrics: BridgeMetrics,
}

impl BridgeState {
    pub fn new(archive: SyntheticArchive) -> Arc<Self> {
        Arc::new(Self {
            archive,
            metrics: BridgeMetrics::new(),
        })
    }

    pub fn metrics(&self) -> &BridgeMetrics {
        &self.metrics
    }
}

fn error_reply(state: &BridgeState, err: &ReviewError) -> WithStatus<Json> {
    state.metrics.record_failure();
    warn!("bridge request failed: {}", err);
    let status = match err {
        ReviewError::Lookup(_) | ReviewError::DataUnavailable(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    warp::reply::with_status(warp::reply::json(&ErrorBody::from(err)), status)
}

pub fn routes(
    state: Arc<BridgeState>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let state_filter = warp::any().map(move || state.clone());

    let mechanism_route = warp::path("mechanism")
        .and(warp::path::end())
        .and(warp::get())
        .and(state_filter.clone())
        .map(|state: Arc<BridgeState>| {
            state.metrics.record_mechanism();
            warp::reply::with_status(
                warp::reply::json(&state.archive.mechanism),
                StatusCode::OK,
            )
        });

    let arrival_route = warp::path!("arrival" / u64)
        .and(warp::get())
        .and(warp::query::<LocatorQuery>())
        .and(state_filter.clone())
        .map(|id: u64, query: LocatorQuery, state: Arc<BridgeState>| {
            state.metrics.record_arrival();
            match state.archive.store.arrival(&query.locator, ArrivalId(id)) {
                Ok(record) => {
                    warp::reply::with_status(warp::reply::json(&record), StatusCode::OK)
                }
                Err(err) => error_reply(&state, &err),
            }
        });

    let waveform_route = warp::path("waveform")
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<WaveformQuery>())
        .and(state_filter.clone())
        .map(|query: WaveformQuery, state: Arc<BridgeState>| {
            state.metrics.record_waveform();
            match state.archive.store.samples(&query.locator, &query.window()) {
                Ok(segment) => {
                    warp::reply::with_status(warp::reply::json(&segment), StatusCode::OK)
                }
                Err(err) => error_reply(&state, &err),
            }
        });

    let metrics_route = warp::path("metrics")
        .and(warp::path::end())
        .and(warp::get())
        .and(state_filter)
        .map(|state: Arc<BridgeState>| {
            warp::reply::with_status(
                warp::reply::json(&state.metrics.snapshot()),
                StatusCode::OK,
            )
        });

    mechanism_route
        .or(arrival_route)
        .unify()
        .or(waveform_route)
        .unify()
        .or(metrics_route)
        .unify()
}

/// Serves the archive on a background thread with its own runtime.
pub struct ArchiveBridge {
    state: Arc<BridgeState>,
    addr: SocketAddr,
}

impl ArchiveBridge {
    pub fn spawn(state: Arc<BridgeState>, addr: SocketAddr) -> Self {
        let routes = routes(state.clone());
        thread::spawn(move || {
            let runtime = match Builder::new_current_thread().enable_all().build() {
                Ok(runtime) => runtime,
                Err(err) => {
                    error!("failed to build bridge runtime: {}", err);
                    return;
                }
            };
            runtime.block_on(async move {
                warp::serve(routes).run(addr).await;
            });
        });
        info!("archive bridge listening on http://{}", addr);
        Self { state, addr }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn state(&self) -> &BridgeState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::metrics::BridgeCounters;
    use crate::generator::profile::{build_archive, GeneratorConfig};
    use focalcore::mechanism::FocalMechanism;
    use focalcore::waveform::{ArrivalRecord, WaveformSegment};

    fn state(gaps: Vec<usize>) -> Arc<BridgeState> {
        let config = GeneratorConfig {
            stations: 3,
            seed: 5,
            gaps,
            ..Default::default()
        };
        BridgeState::new(build_archive(&config).unwrap())
    }

    #[tokio::test]
    async fn mechanism_route_serves_picks() {
        let response = warp::test::request()
            .method("GET")
            .path("/mechanism")
            .reply(&routes(state(vec![])))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let mechanism: FocalMechanism = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(mechanism.picks.len(), 3);
    }

    #[tokio::test]
    async fn arrival_and_waveform_round_trip() {
        let routes = routes(state(vec![]));
        let response = warp::test::request()
            .path("/arrival/1000?locator=memory%3A%2F%2Fsynthetic")
            .reply(&routes)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let arrival: ArrivalRecord = serde_json::from_slice(response.body()).unwrap();

        let path = format!(
            "/waveform?locator=memory%3A%2F%2Fsynthetic&station={}&channel={}&start={}&end={}",
            arrival.station,
            arrival.channel,
            arrival.onset - 0.25,
            arrival.onset + 0.25
        );
        let response = warp::test::request().path(&path).reply(&routes).await;
        assert_eq!(response.status(), StatusCode::OK);
        let segment: WaveformSegment = serde_json::from_slice(response.body()).unwrap();
        assert!(!segment.samples.is_empty());
    }

    #[tokio::test]
    async fn missing_data_maps_to_not_found() {
        let state = state(vec![0]);
        let routes = routes(state.clone());
        let response = warp::test::request()
            .path("/arrival/77?locator=memory%3A%2F%2Fsynthetic")
            .reply(&routes)
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body: ErrorBody = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body.kind, "lookup");

        let response = warp::test::request()
            .path("/waveform?locator=memory%3A%2F%2Fsynthetic&station=S01&channel=HHZ&start=0&end=1")
            .reply(&routes)
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body: ErrorBody = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body.kind, "data_unavailable");
        assert_eq!(state.metrics().snapshot().failures, 2);
    }

    #[tokio::test]
    async fn metrics_route_reports_bridge_counters() {
        let state = state(vec![]);
        let routes = routes(state.clone());
        warp::test::request().path("/mechanism").reply(&routes).await;
        warp::test::request()
            .path("/arrival/1001?locator=memory%3A%2F%2Fsynthetic")
            .reply(&routes)
            .await;
        let response = warp::test::request().path("/metrics").reply(&routes).await;
        assert_eq!(response.status(), StatusCode::OK);
        let counters: BridgeCounters = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(counters.mechanism_requests, 1);
        assert_eq!(counters.arrival_requests, 1);
        assert_eq!(counters.waveform_requests, 0);
        assert_eq!(counters.failures, 0);
    }
}
