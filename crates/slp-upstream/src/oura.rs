//! Oura v2 HTTP client.
//!
//! One GET per call with a fixed timeout. No retries, no pagination.

use std::fmt;
use std::time::Duration;

use reqwest::header::CACHE_CONTROL;
use serde_json::Value;
use slp_reconcile::score::SCORE_CANDIDATES;
use slp_schemas::DateRange;

use crate::{SleepEndpoint, SleepSource, UpstreamError};

pub const DEFAULT_BASE_URL: &str = "https://api.ouraring.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Bearer-token client for the sleep collections.
///
/// The token is read by the caller (config/env) and passed in. It is never
/// logged; `Debug` redacts it.
#[derive(Clone)]
pub struct OuraClient {
    token: String,
    base_url: String,
    timeout: Duration,
    http: reqwest::Client,
    trace_payloads: bool,
}

impl fmt::Debug for OuraClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OuraClient")
            .field("token", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("trace_payloads", &self.trace_payloads)
            .finish()
    }
}

impl OuraClient {
    pub fn new(token: String) -> Result<Self, UpstreamError> {
        Self::new_with_base_url(token, DEFAULT_BASE_URL.to_string(), DEFAULT_TIMEOUT)
    }

    pub fn new_with_base_url(
        token: String,
        base_url: String,
        timeout: Duration,
    ) -> Result<Self, UpstreamError> {
        if token.trim().is_empty() {
            return Err(UpstreamError::Config("access token is empty".to_string()));
        }
        if base_url.trim().is_empty() {
            return Err(UpstreamError::Config("base url is empty".to_string()));
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| UpstreamError::Config(format!("http client build failed: {e}")))?;

        Ok(Self {
            token: token.trim().to_string(),
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            timeout,
            http,
            trace_payloads: false,
        })
    }

    /// Emit `debug!` shape diagnostics for every response body.
    pub fn with_payload_tracing(mut self, enabled: bool) -> Self {
        self.trace_payloads = enabled;
        self
    }

    fn url(&self, endpoint: SleepEndpoint) -> String {
        format!("{}{}", self.base_url, endpoint.path())
    }

    fn map_send_error(&self, e: reqwest::Error) -> UpstreamError {
        if e.is_timeout() {
            UpstreamError::Timeout(self.timeout)
        } else {
            UpstreamError::Transport(e.to_string())
        }
    }
}

#[async_trait::async_trait]
impl SleepSource for OuraClient {
    fn source_name(&self) -> &'static str {
        "oura"
    }

    async fn fetch_raw(
        &self,
        endpoint: SleepEndpoint,
        range: &DateRange,
    ) -> Result<Value, UpstreamError> {
        let start = range.start_str();
        let end = range.end_str();
        tracing::info!(
            endpoint = endpoint.as_str(),
            start_date = %start,
            end_date = %end,
            "upstream fetch"
        );

        let resp = self
            .http
            .get(self.url(endpoint))
            .bearer_auth(&self.token)
            .header(CACHE_CONTROL, "no-cache, no-store, must-revalidate")
            .query(&[("start_date", start.as_str()), ("end_date", end.as_str())])
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| self.map_send_error(e))?;

        if !status.is_success() {
            tracing::warn!(
                endpoint = endpoint.as_str(),
                status = status.as_u16(),
                "upstream returned non-success status"
            );
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let body: Value = serde_json::from_str(&text)
            .map_err(|e| UpstreamError::Decode(format!("{} body: {e}", endpoint.as_str())))?;

        if self.trace_payloads {
            trace_payload_shape(endpoint, &body);
        }
        Ok(body)
    }
}

/// Which keys the first record carries and where a score could be found.
fn trace_payload_shape(endpoint: SleepEndpoint, body: &Value) {
    let Some(first) = body.get("data").and_then(Value::as_array).and_then(|d| d.first()) else {
        tracing::debug!(endpoint = endpoint.as_str(), "payload shape: no records");
        return;
    };

    let keys: Vec<&str> = first
        .as_object()
        .map(|m| m.keys().map(String::as_str).collect())
        .unwrap_or_default();
    let score_locations: Vec<&str> = SCORE_CANDIDATES
        .iter()
        .copied()
        .filter(|ptr| first.pointer(ptr).is_some_and(|v| !v.is_null()))
        .collect();

    tracing::debug!(
        endpoint = endpoint.as_str(),
        keys = ?keys,
        score_locations = ?score_locations,
        "payload shape"
    );
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn range() -> DateRange {
        DateRange::parse("2024-01-01", "2024-01-07").unwrap()
    }

    fn client(server: &MockServer) -> OuraClient {
        OuraClient::new_with_base_url("tok-123".to_string(), server.base_url(), DEFAULT_TIMEOUT)
            .unwrap()
    }

    #[tokio::test]
    async fn detailed_fetch_sends_auth_and_dates() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/v2/usercollection/sleep")
                    .query_param("start_date", "2024-01-01")
                    .query_param("end_date", "2024-01-07")
                    .header("authorization", "Bearer tok-123")
                    .header_exists("cache-control");
                then.status(200).json_body(json!({
                    "data": [{ "id": "a", "day": "2024-01-05", "score": 40 }],
                    "next_token": null
                }));
            })
            .await;

        let recs = client(&server).fetch_detailed(&range()).await.unwrap();
        mock.assert_async().await;
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0]["id"], "a");
    }

    #[tokio::test]
    async fn summary_fetch_hits_daily_collection() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/v2/usercollection/daily_sleep");
                then.status(200)
                    .json_body(json!({ "data": [{ "day": "2024-01-05", "score": 72 }] }));
            })
            .await;

        let recs = client(&server)
            .with_payload_tracing(true)
            .fetch_summary(&range())
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(recs[0]["score"], 72);
    }

    #[tokio::test]
    async fn non_success_status_carries_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v2/usercollection/sleep");
                then.status(401).body("{\"detail\":\"invalid token\"}");
            })
            .await;

        let err = client(&server).fetch_detailed(&range()).await.unwrap_err();
        match err {
            UpstreamError::Status { status, body } => {
                assert_eq!(status, 401);
                assert!(body.contains("invalid token"));
            }
            other => panic!("expected Status, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn body_without_data_is_empty_not_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v2/usercollection/sleep");
                then.status(200).json_body(json!({ "unexpected": true }));
            })
            .await;

        let recs = client(&server).fetch_detailed(&range()).await.unwrap();
        assert!(recs.is_empty());
    }

    #[tokio::test]
    async fn malformed_json_is_decode_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v2/usercollection/daily_sleep");
                then.status(200).body("<html>gateway</html>");
            })
            .await;

        let err = client(&server).fetch_summary(&range()).await.unwrap_err();
        assert!(matches!(err, UpstreamError::Decode(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn slow_upstream_times_out() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v2/usercollection/sleep");
                then.status(200)
                    .delay(Duration::from_secs(3))
                    .json_body(json!({ "data": [] }));
            })
            .await;

        let c = OuraClient::new_with_base_url(
            "tok".to_string(),
            server.base_url(),
            Duration::from_millis(200),
        )
        .unwrap();
        let err = c.fetch_detailed(&range()).await.unwrap_err();
        assert!(matches!(err, UpstreamError::Timeout(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn single_request_per_call() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/v2/usercollection/sleep");
                then.status(200).json_body(json!({
                    "data": [{ "day": "2024-01-05" }],
                    "next_token": "page-2"
                }));
            })
            .await;

        let recs = client(&server).fetch_detailed(&range()).await.unwrap();
        assert_eq!(recs.len(), 1);
        mock.assert_hits_async(1).await;
    }

    #[test]
    fn empty_token_is_config_error() {
        let err = OuraClient::new("  ".to_string()).unwrap_err();
        assert!(matches!(err, UpstreamError::Config(_)));
    }

    #[test]
    fn debug_redacts_token() {
        let c = OuraClient::new("super-secret".to_string()).unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("super-secret"));
        assert!(dbg.contains("<redacted>"));
    }
}
