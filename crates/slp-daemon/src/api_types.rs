//! Request and response types for all slp-daemon HTTP endpoints.
//!
//! No business logic lives here.

use serde::{Deserialize, Serialize};
use slp_reconcile::TrendPoint;
use slp_runtime::DashboardView;

// ---------------------------------------------------------------------------
// /v1/health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
    /// `"oura"`, or `"unconfigured"` when no token was found at boot.
    pub upstream: &'static str,
    pub notes_configured: bool,
    pub config_hash: String,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Body of every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    /// "bad_request" | "upstream_failed" | "notes_unavailable" | "not_found" | "internal"
    pub kind: String,
}

// ---------------------------------------------------------------------------
// /v1/sleep
// ---------------------------------------------------------------------------

/// Dates are `YYYY-MM-DD`; give both or neither.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SleepQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub fallback: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardResponse {
    #[serde(flatten)]
    pub view: DashboardView,
    /// Oldest first, downsampled for a chart.
    pub trend: Vec<TrendPoint>,
}

// ---------------------------------------------------------------------------
// /v1/upstream/sleep
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpstreamQuery {
    /// "detailed" | "daily"
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

// ---------------------------------------------------------------------------
// /v1/notes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotesQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PutNoteRequest {
    pub notes: String,
}

// ---------------------------------------------------------------------------
// /v1/hypnogram/decode
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HypnogramDecodeRequest {
    pub trace: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HypnogramDecodeResponse {
    pub stages: Vec<u8>,
    /// `true` when the trace was unusable and the placeholder pattern was returned.
    pub sentinel: bool,
}
