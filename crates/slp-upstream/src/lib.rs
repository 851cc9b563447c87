//! slp-upstream
//!
//! Provider boundary for the wearable's sleep API.
//!
//! This crate owns the [`SleepSource`] trait and the concrete [`OuraClient`].
//! It returns raw records exactly as decoded; it does **not** normalize,
//! merge, or decide on fallbacks (see `slp-reconcile` and `slp-runtime`).

mod oura;

pub use oura::{OuraClient, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};

use std::time::Duration;

use serde_json::Value;
use slp_schemas::{DateRange, RawRecord};

// ---------------------------------------------------------------------------
// Endpoints
// ---------------------------------------------------------------------------

/// The two upstream collections a dashboard needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SleepEndpoint {
    /// Per-session records: durations, bedtimes, hypnogram.
    Detailed,
    /// Per-day summaries: the authoritative quality score.
    Daily,
}

impl SleepEndpoint {
    pub fn path(&self) -> &'static str {
        match self {
            SleepEndpoint::Detailed => "/v2/usercollection/sleep",
            SleepEndpoint::Daily => "/v2/usercollection/daily_sleep",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SleepEndpoint::Detailed => "detailed",
            SleepEndpoint::Daily => "daily",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "detailed" | "sleep" => Some(SleepEndpoint::Detailed),
            "daily" | "daily_sleep" | "summary" => Some(SleepEndpoint::Daily),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// Missing token, bad base URL, or an HTTP client that could not be built.
    #[error("upstream config error: {0}")]
    Config(String),
    #[error("upstream transport error: {0}")]
    Transport(String),
    #[error("upstream request timed out after {0:?}")]
    Timeout(Duration),
    /// Non-2xx response. `body` is the response text, verbatim.
    #[error("upstream returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("upstream response decode failed: {0}")]
    Decode(String),
}

// ---------------------------------------------------------------------------
// Source trait
// ---------------------------------------------------------------------------

/// Where raw sleep records come from.
///
/// Object-safe so callers can hold an `Arc<dyn SleepSource>`; tests swap in
/// in-memory fakes.
#[async_trait::async_trait]
pub trait SleepSource: Send + Sync {
    fn source_name(&self) -> &'static str;

    /// The decoded response body for one endpoint, untouched.
    async fn fetch_raw(
        &self,
        endpoint: SleepEndpoint,
        range: &DateRange,
    ) -> Result<Value, UpstreamError>;

    async fn fetch_detailed(&self, range: &DateRange) -> Result<Vec<RawRecord>, UpstreamError> {
        let body = self.fetch_raw(SleepEndpoint::Detailed, range).await?;
        Ok(records_from_body(SleepEndpoint::Detailed, body))
    }

    async fn fetch_summary(&self, range: &DateRange) -> Result<Vec<RawRecord>, UpstreamError> {
        let body = self.fetch_raw(SleepEndpoint::Daily, range).await?;
        Ok(records_from_body(SleepEndpoint::Daily, body))
    }
}

/// Stand-in when no access token is available. Every fetch fails with
/// [`UpstreamError::Config`], so callers' failure fallbacks still apply.
#[derive(Debug, Clone)]
pub struct UnconfiguredSource {
    reason: String,
}

impl UnconfiguredSource {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait::async_trait]
impl SleepSource for UnconfiguredSource {
    fn source_name(&self) -> &'static str {
        "unconfigured"
    }

    async fn fetch_raw(
        &self,
        _endpoint: SleepEndpoint,
        _range: &DateRange,
    ) -> Result<Value, UpstreamError> {
        Err(UpstreamError::Config(self.reason.clone()))
    }
}

/// Pull the `data` array out of a response body.
///
/// A body without one yields no records. Pagination is not followed; a
/// `next_token` is only reported.
pub fn records_from_body(endpoint: SleepEndpoint, body: Value) -> Vec<RawRecord> {
    if let Some(token) = body.get("next_token").and_then(Value::as_str) {
        tracing::info!(
            endpoint = endpoint.as_str(),
            next_token = token,
            "upstream reported more pages; only the first page is used"
        );
    }

    match body {
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(records)) => records,
            _ => {
                tracing::warn!(
                    endpoint = endpoint.as_str(),
                    "upstream body has no data array; treating as empty"
                );
                Vec::new()
            }
        },
        _ => {
            tracing::warn!(
                endpoint = endpoint.as_str(),
                "upstream body is not an object; treating as empty"
            );
            Vec::new()
        }
    }
}
