use focalcore::mechanism::{ArrivalId, FocalMechanism, SourceLocator};
use focalcore::prelude::{ReviewError, ReviewResult};
use focalcore::waveform::{ArrivalRecord, ChannelWindow, WaveformSegment, WaveformStore};
use log::debug;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::OnceLock;
use std::time::Duration;

/// Error payload returned by the archive bridge.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    kind: String,
    message: String,
}

fn review_error(arrival_id: Option<ArrivalId>, body: ErrorBody) -> ReviewError {
    match (body.kind.as_str(), arrival_id) {
        ("lookup", Some(id)) => ReviewError::Lookup(id),
        ("lookup", None) | ("data_unavailable", _) => ReviewError::DataUnavailable(body.message),
        _ => ReviewError::Internal(body.message),
    }
}

/// Waveform store backed by the archive bridge. Calls block, so they must run
/// on a blocking thread; the client is built there on first use and reused.
pub struct HttpStore {
    base: String,
    timeout: Duration,
    client: OnceLock<reqwest::blocking::Client>,
}

impl HttpStore {
    pub fn new(base: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
            timeout,
            client: OnceLock::new(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn client(&self) -> ReviewResult<&reqwest::blocking::Client> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|err| ReviewError::Internal(format!("http client: {err}")))?;
        Ok(self.client.get_or_init(|| client))
    }

    fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        arrival_id: Option<ArrivalId>,
    ) -> ReviewResult<T> {
        let url = format!("{}{}", self.base, path);
        debug!("GET {} {:?}", url, query);
        let unavailable = |err: reqwest::Error| ReviewError::DataUnavailable(err.to_string());
        let response = self
            .client()?
            .get(&url)
            .query(query)
            .send()
            .map_err(unavailable)?;
        if response.status().is_success() {
            return response.json::<T>().map_err(unavailable);
        }
        let status = response.status();
        match response.json::<ErrorBody>() {
            Ok(body) => Err(review_error(arrival_id, body)),
            Err(_) => Err(ReviewError::DataUnavailable(format!("{url}: {status}"))),
        }
    }
}

impl WaveformStore for HttpStore {
    fn arrival(
        &self,
        locator: &SourceLocator,
        arrival_id: ArrivalId,
    ) -> ReviewResult<ArrivalRecord> {
        self.get(
            &format!("/arrival/{}", arrival_id.0),
            &[("locator", locator.0.clone())],
            Some(arrival_id),
        )
    }

    fn samples(
        &self,
        locator: &SourceLocator,
        window: &ChannelWindow,
    ) -> ReviewResult<WaveformSegment> {
        self.get(
            "/waveform",
            &[
                ("locator", locator.0.clone()),
                ("station", window.station.clone()),
                ("channel", window.channel.clone()),
                ("start", window.start.to_string()),
                ("end", window.end.to_string()),
            ],
            None,
        )
    }
}

pub async fn fetch_mechanism(base: String) -> Result<FocalMechanism, String> {
    let response = reqwest::get(format!("{base}/mechanism"))
        .await
        .map_err(|e| e.to_string())?;
    response
        .json::<FocalMechanism>()
        .await
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(kind: &str) -> ErrorBody {
        ErrorBody {
            kind: kind.into(),
            message: "missing".into(),
        }
    }

    #[test]
    fn bridge_errors_map_to_review_errors() {
        assert_eq!(
            review_error(Some(ArrivalId(4)), body("lookup")),
            ReviewError::Lookup(ArrivalId(4))
        );
        assert_eq!(
            review_error(None, body("data_unavailable")),
            ReviewError::DataUnavailable("missing".into())
        );
        assert_eq!(
            review_error(None, body("internal")),
            ReviewError::Internal("missing".into())
        );
    }

    #[test]
    fn base_url_drops_trailing_slash() {
        let store = HttpStore::new("http://host:9000/", Duration::from_millis(250));
        assert_eq!(store.base(), "http://host:9000");
        assert_eq!(store.timeout(), Duration::from_millis(250));
    }

    #[test]
    fn unreachable_bridge_is_data_unavailable() {
        let store = HttpStore::new("http://127.0.0.1:1", Duration::from_millis(500));
        let result = store.arrival(&SourceLocator("memory://x".into()), ArrivalId(1));
        assert!(matches!(result, Err(ReviewError::DataUnavailable(_))));
        assert!(std::ptr::eq(store.client().unwrap(), store.client().unwrap()));
    }
}
