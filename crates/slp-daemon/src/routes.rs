//! Axum router and all HTTP handlers for slp-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers (CORS, tracing) so tests can use the bare router.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use slp_db::NotesError;
use slp_reconcile::{trend_series, try_decode_hypnogram, SENTINEL_STAGES, TREND_MAX_POINTS};
use slp_runtime::RuntimeError;
use slp_schemas::{DateRange, FallbackPolicy, DAY_FORMAT};
use slp_upstream::SleepEndpoint;

use crate::{
    api_types::{
        DashboardResponse, ErrorResponse, HealthResponse, HypnogramDecodeRequest,
        HypnogramDecodeResponse, NotesQuery, PutNoteRequest, SleepQuery, UpstreamQuery,
    },
    state::{uptime_secs, AppState},
};

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/sleep", get(sleep_dashboard))
        .route("/v1/upstream/sleep", get(upstream_passthrough))
        .route("/v1/notes", get(notes_list))
        .route("/v1/notes/:day", put(notes_put))
        .route("/v1/hypnogram/decode", post(hypnogram_decode))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

pub(crate) fn error_response(status: StatusCode, kind: &str, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            kind: kind.to_string(),
        }),
    )
        .into_response()
}

fn bad_request(error: impl Into<String>) -> Response {
    error_response(StatusCode::BAD_REQUEST, "bad_request", error)
}

fn runtime_error_response(err: RuntimeError) -> Response {
    match err {
        RuntimeError::Upstream(e) => {
            tracing::warn!(error = %e, "request failed upstream");
            error_response(StatusCode::BAD_GATEWAY, "upstream_failed", e.to_string())
        }
        RuntimeError::NoData { .. } => {
            error_response(StatusCode::NOT_FOUND, "not_found", err.to_string())
        }
        RuntimeError::Notes(e) => notes_error_response(e),
    }
}

fn notes_error_response(err: NotesError) -> Response {
    match err {
        NotesError::Config(msg) => {
            error_response(StatusCode::SERVICE_UNAVAILABLE, "notes_unavailable", msg)
        }
        NotesError::NotFound(_) => {
            error_response(StatusCode::NOT_FOUND, "not_found", err.to_string())
        }
        NotesError::Database(_) => {
            tracing::error!(error = %err, "notes store failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal", err.to_string())
        }
    }
}

/// Both dates, or neither (the last `default_days` ending today).
fn range_from_query(
    start: Option<&str>,
    end: Option<&str>,
    default_days: u32,
) -> Result<DateRange, Response> {
    match (start, end) {
        (Some(s), Some(e)) => DateRange::parse(s, e).map_err(|e| bad_request(e.to_string())),
        (None, None) => Ok(DateRange::last_days(Utc::now().date_naive(), default_days)),
        _ => Err(bad_request("start_date and end_date must be given together")),
    }
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service,
            version: st.build.version,
            uptime_secs: uptime_secs(),
            upstream: st.service.source_name(),
            notes_configured: st.service.notes_store().is_some(),
            config_hash: st.config_hash.clone(),
        }),
    )
}

// ---------------------------------------------------------------------------
// GET /v1/sleep
// ---------------------------------------------------------------------------

/// The dashboard view.
///
/// `400` on bad dates or an unknown `fallback`; `502` when upstream fails and
/// the policy does not fall back.
pub(crate) async fn sleep_dashboard(
    State(st): State<Arc<AppState>>,
    Query(q): Query<SleepQuery>,
) -> Response {
    let range = match range_from_query(
        q.start_date.as_deref(),
        q.end_date.as_deref(),
        st.default_range_days,
    ) {
        Ok(r) => r,
        Err(resp) => return resp,
    };

    let policy = match q.fallback.as_deref() {
        None => st.default_fallback,
        Some(raw) => match FallbackPolicy::parse(raw) {
            Some(p) => p,
            None => return bad_request(format!("invalid fallback '{raw}'")),
        },
    };

    match st.service.load_dashboard(&range, policy).await {
        Ok(view) => {
            let trend = trend_series(&view.canonical_records(), TREND_MAX_POINTS);
            (StatusCode::OK, Json(DashboardResponse { view, trend })).into_response()
        }
        Err(e) => runtime_error_response(e),
    }
}

// ---------------------------------------------------------------------------
// GET /v1/upstream/sleep
// ---------------------------------------------------------------------------

/// Raw upstream body for one endpoint, unreconciled and unpadded.
pub(crate) async fn upstream_passthrough(
    State(st): State<Arc<AppState>>,
    Query(q): Query<UpstreamQuery>,
) -> Response {
    let Some(kind) = q.kind.as_deref() else {
        return bad_request("missing query parameter 'type' (detailed|daily)");
    };
    let Some(endpoint) = SleepEndpoint::parse(kind) else {
        return bad_request(format!("invalid type '{kind}' (expected detailed|daily)"));
    };
    let (Some(start), Some(end)) = (q.start_date.as_deref(), q.end_date.as_deref()) else {
        return bad_request("start_date and end_date are required");
    };
    let range = match DateRange::parse(start, end) {
        Ok(r) => r,
        Err(e) => return bad_request(e.to_string()),
    };

    match st.service.fetch_raw(endpoint, &range).await {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(e) => runtime_error_response(e),
    }
}

// ---------------------------------------------------------------------------
// GET /v1/notes   PUT /v1/notes/:day
// ---------------------------------------------------------------------------

pub(crate) async fn notes_list(
    State(st): State<Arc<AppState>>,
    Query(q): Query<NotesQuery>,
) -> Response {
    let range = match range_from_query(
        q.start_date.as_deref(),
        q.end_date.as_deref(),
        st.default_range_days,
    ) {
        Ok(r) => r,
        Err(resp) => return resp,
    };

    match st.service.notes_in_range(&range).await {
        Ok(notes) => (StatusCode::OK, Json(notes)).into_response(),
        Err(e) => runtime_error_response(e),
    }
}

/// Upsert the note for `day`; the last write wins.
pub(crate) async fn notes_put(
    State(st): State<Arc<AppState>>,
    Path(day): Path<String>,
    Json(body): Json<PutNoteRequest>,
) -> Response {
    let day = match chrono::NaiveDate::parse_from_str(day.trim(), DAY_FORMAT) {
        Ok(d) => d,
        Err(_) => return bad_request(format!("invalid day '{day}': expected YYYY-MM-DD")),
    };

    match st.service.save_note(day, &body.notes).await {
        Ok(note) => {
            tracing::info!(day = %note.day, id = %note.id, "note saved");
            (StatusCode::OK, Json(note)).into_response()
        }
        Err(e) => runtime_error_response(e),
    }
}

// ---------------------------------------------------------------------------
// POST /v1/hypnogram/decode
// ---------------------------------------------------------------------------

pub(crate) async fn hypnogram_decode(Json(req): Json<HypnogramDecodeRequest>) -> impl IntoResponse {
    let (stages, sentinel) = match try_decode_hypnogram(&req.trace) {
        Some(stages) => (stages, false),
        None => (SENTINEL_STAGES.to_vec(), true),
    };
    (StatusCode::OK, Json(HypnogramDecodeResponse { stages, sentinel }))
}
