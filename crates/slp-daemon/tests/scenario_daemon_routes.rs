//! In-process scenario tests for slp-daemon HTTP endpoints.
//!
//! Each test builds the router over in-memory fakes and drives it via
//! `tower::ServiceExt::oneshot`; no sockets, no network.

use std::sync::Arc;

use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use slp_config::AppConfig;
use slp_daemon::{routes, state};
use slp_db::NotesStore;
use slp_runtime::{ServiceOptions, SleepService};
use slp_testkit::{day, detailed_record, summary_record, FixtureSource, InMemoryNotesStore};
use slp_upstream::SleepSource;
use tower::ServiceExt; // oneshot

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn fixture() -> Arc<dyn SleepSource> {
    Arc::new(FixtureSource::new(
        vec![
            detailed_record("2024-01-04", 25_200, 40),
            detailed_record("2024-01-05", 27_000, 40),
        ],
        vec![summary_record("2024-01-04", 81), summary_record("2024-01-05", 72)],
    ))
}

fn make_router(source: Arc<dyn SleepSource>, notes: Option<Arc<dyn NotesStore>>) -> axum::Router {
    let service = SleepService::new(source, notes, ServiceOptions::default());
    let st = Arc::new(state::AppState::new(service, &AppConfig::default(), "test-hash"));
    routes::build_router(st)
}

async fn call(router: axum::Router, req: Request<axum::body::Body>) -> (StatusCode, bytes::Bytes) {
    let resp = router.oneshot(req).await.expect("oneshot failed");
    let status = resp.status();
    let body = resp
        .into_body()
        .collect()
        .await
        .expect("body collect failed")
        .to_bytes();
    (status, body)
}

fn get(uri: &str) -> Request<axum::body::Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<axum::body::Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(axum::body::Body::from(body.to_string()))
        .unwrap()
}

fn parse_json(b: bytes::Bytes) -> serde_json::Value {
    serde_json::from_slice(&b).expect("body is not valid JSON")
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_reports_wiring() {
    let (status, body) = call(make_router(fixture(), None), get("/v1/health")).await;
    assert_eq!(status, StatusCode::OK);

    let json = parse_json(body);
    assert_eq!(json["ok"], true);
    assert_eq!(json["service"], "slp-daemon");
    assert_eq!(json["upstream"], "fixture");
    assert_eq!(json["notes_configured"], false);
    assert_eq!(json["config_hash"], "test-hash");
}

// ---------------------------------------------------------------------------
// GET /v1/sleep
// ---------------------------------------------------------------------------

#[tokio::test]
async fn sleep_returns_reconciled_view_newest_first() {
    let notes: Arc<dyn NotesStore> = Arc::new(InMemoryNotesStore::new());
    notes.upsert_note(day("2024-01-04"), "coffee at 4pm").await.unwrap();

    let router = make_router(fixture(), Some(notes));
    let (status, body) = call(
        router,
        get("/v1/sleep?start_date=2024-01-01&end_date=2024-01-07"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let json = parse_json(body);
    assert_eq!(json["provenance"], "upstream");
    assert_eq!(json["notes_available"], true);

    let records = json["records"].as_array().expect("records array");
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["day"], "2024-01-05");
    assert_eq!(records[0]["quality_score"], 72);
    assert_eq!(records[1]["quality_score"], 81);
    assert_eq!(records[1]["note"]["notes"], "coffee at 4pm");
    assert!(records[0]["note"].is_null());

    let trend = json["trend"].as_array().expect("trend array");
    assert_eq!(trend.len(), 2);
    assert_eq!(trend[0]["day"], "2024-01-04");
}

#[tokio::test]
async fn sleep_rejects_bad_dates() {
    for uri in [
        "/v1/sleep?start_date=2024-13-01&end_date=2024-01-07",
        "/v1/sleep?start_date=2024-01-07&end_date=2024-01-01",
        "/v1/sleep?start_date=2024-01-01",
        "/v1/sleep?start_date=2024-01-01&end_date=2024-01-07&fallback=sometimes",
        "/v1/sleep?start_date=0001-01-01&end_date=9999-12-31&fallback=always",
    ] {
        let (status, body) = call(make_router(fixture(), None), get(uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "uri {uri}");
        assert_eq!(parse_json(body)["kind"], "bad_request");
    }
}

#[tokio::test]
async fn sleep_upstream_failure_is_502_unless_policy_falls_back() {
    let failing: Arc<dyn SleepSource> =
        Arc::new(FixtureSource::failing(401, "{\"detail\":\"bad token\"}"));

    let (status, body) = call(
        make_router(Arc::clone(&failing), None),
        get("/v1/sleep?start_date=2024-01-01&end_date=2024-01-03"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let json = parse_json(body);
    assert_eq!(json["kind"], "upstream_failed");
    assert!(json["error"].as_str().unwrap().contains("401"));

    let (status, body) = call(
        make_router(failing, None),
        get("/v1/sleep?start_date=2024-01-01&end_date=2024-01-03&fallback=on_failure"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let json = parse_json(body);
    assert_eq!(json["provenance"], "synthetic");
    assert_eq!(json["records"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn sleep_empty_upstream_is_flagged_not_mocked() {
    let (status, body) = call(
        make_router(Arc::new(FixtureSource::empty()), None),
        get("/v1/sleep?start_date=2024-01-01&end_date=2024-01-03"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let json = parse_json(body);
    assert_eq!(json["provenance"], "no_data");
    assert!(json["records"].as_array().unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// GET /v1/upstream/sleep
// ---------------------------------------------------------------------------

#[tokio::test]
async fn upstream_passthrough_returns_raw_body() {
    let (status, body) = call(
        make_router(fixture(), None),
        get("/v1/upstream/sleep?type=daily&start_date=2024-01-01&end_date=2024-01-07"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let json = parse_json(body);
    let data = json["data"].as_array().expect("data array");
    assert_eq!(data.len(), 2);
    assert_eq!(data[0]["score"], 81);
}

#[tokio::test]
async fn upstream_passthrough_validates_params() {
    for uri in [
        "/v1/upstream/sleep?start_date=2024-01-01&end_date=2024-01-07",
        "/v1/upstream/sleep?type=weekly&start_date=2024-01-01&end_date=2024-01-07",
        "/v1/upstream/sleep?type=detailed&start_date=2024-01-01",
        "/v1/upstream/sleep?type=daily&start_date=2024-01-01&end_date=2025-06-01",
    ] {
        let (status, _) = call(make_router(fixture(), None), get(uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "uri {uri}");
    }
}

#[tokio::test]
async fn upstream_passthrough_failure_is_502() {
    let (status, body) = call(
        make_router(Arc::new(FixtureSource::failing(500, "boom")), None),
        get("/v1/upstream/sleep?type=detailed&start_date=2024-01-01&end_date=2024-01-02"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(parse_json(body)["error"].as_str().unwrap().contains("boom"));
}

// ---------------------------------------------------------------------------
// /v1/notes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn notes_without_store_are_503() {
    let (status, body) = call(
        make_router(fixture(), None),
        get("/v1/notes?start_date=2024-01-01&end_date=2024-01-07"),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(parse_json(body)["kind"], "notes_unavailable");

    let (status, _) = call(
        make_router(fixture(), None),
        json_request("PUT", "/v1/notes/2024-01-05", serde_json::json!({ "notes": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn notes_put_is_last_writer_wins() {
    let store: Arc<dyn NotesStore> = Arc::new(InMemoryNotesStore::new());

    for text in ["first", "second"] {
        let (status, body) = call(
            make_router(fixture(), Some(Arc::clone(&store))),
            json_request(
                "PUT",
                "/v1/notes/2024-01-05",
                serde_json::json!({ "notes": text }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(parse_json(body)["notes"], text);
    }

    let (status, body) = call(
        make_router(fixture(), Some(store)),
        get("/v1/notes?start_date=2024-01-01&end_date=2024-01-07"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let notes = parse_json(body);
    let notes = notes.as_array().expect("notes array");
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0]["notes"], "second");
    assert_eq!(notes[0]["day"], "2024-01-05");
}

#[tokio::test]
async fn notes_put_rejects_bad_day() {
    let store: Arc<dyn NotesStore> = Arc::new(InMemoryNotesStore::new());
    let (status, _) = call(
        make_router(fixture(), Some(store)),
        json_request("PUT", "/v1/notes/yesterday", serde_json::json!({ "notes": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// POST /v1/hypnogram/decode
// ---------------------------------------------------------------------------

#[tokio::test]
async fn hypnogram_decode_handles_all_encodings() {
    for (trace, expected) in [("4432", vec![4, 4, 3, 2]), ("[1,2]", vec![1, 2]), ("3, 1", vec![3, 1])] {
        let (status, body) = call(
            make_router(fixture(), None),
            json_request("POST", "/v1/hypnogram/decode", serde_json::json!({ "trace": trace })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let json = parse_json(body);
        assert_eq!(json["stages"], serde_json::json!(expected));
        assert_eq!(json["sentinel"], false);
    }

    let (_, body) = call(
        make_router(fixture(), None),
        json_request("POST", "/v1/hypnogram/decode", serde_json::json!({ "trace": "" })),
    )
    .await;
    let json = parse_json(body);
    assert_eq!(json["sentinel"], true);
    assert_eq!(json["stages"].as_array().unwrap().len(), 40);
}
