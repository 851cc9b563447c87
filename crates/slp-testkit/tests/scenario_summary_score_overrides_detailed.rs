//! The daily summary is authoritative for the quality score; the detailed
//! session is authoritative for everything else.

use std::sync::Arc;

use slp_runtime::{Provenance, ServiceOptions, SleepService};
use slp_schemas::FallbackPolicy;
use slp_testkit::{
    detailed_record, nested_summary_record, range, summary_record, FixtureSource,
};

fn service(src: FixtureSource) -> SleepService {
    SleepService::new(Arc::new(src), None, ServiceOptions::default())
}

#[tokio::test]
async fn summary_score_replaces_detailed_score() {
    let src = FixtureSource::new(
        vec![detailed_record("2024-01-05", 25_200, 40)],
        vec![summary_record("2024-01-05", 72)],
    );
    let view = service(src)
        .load_dashboard(&range("2024-01-01", "2024-01-07"), FallbackPolicy::Never)
        .await
        .unwrap();

    assert_eq!(view.provenance, Provenance::Upstream);
    assert_eq!(view.records.len(), 1);
    let r = &view.records[0].record;
    assert_eq!(r.quality_score, 72);
    assert_eq!(r.total_sleep_seconds, 25_200);
    assert_eq!(view.report.as_ref().map(|r| r.scores_overlaid), Some(1));
}

#[tokio::test]
async fn scores_join_by_day_not_position() {
    let src = FixtureSource::new(
        vec![
            detailed_record("2024-01-04", 25_000, 10),
            detailed_record("2024-01-05", 26_000, 20),
        ],
        vec![summary_record("2024-01-05", 80), summary_record("2024-01-03", 99)],
    );
    let view = service(src)
        .load_dashboard(&range("2024-01-01", "2024-01-07"), FallbackPolicy::Never)
        .await
        .unwrap();

    let scores: Vec<(&str, i64)> = view
        .records
        .iter()
        .map(|r| (r.record.day.as_str(), r.record.quality_score))
        .collect();
    assert_eq!(scores, vec![("2024-01-05", 80), ("2024-01-04", 10)]);
}

#[tokio::test]
async fn nested_payload_scores_are_found() {
    let src = FixtureSource::new(
        vec![detailed_record("2024-01-05", 25_200, 0)],
        vec![nested_summary_record("2024-01-05", "_rawData", 77)],
    );
    let view = service(src)
        .load_dashboard(&range("2024-01-01", "2024-01-07"), FallbackPolicy::Never)
        .await
        .unwrap();

    assert_eq!(view.records[0].record.quality_score, 77);
    assert_eq!(view.report.as_ref().map(|r| r.nested_score_pass), Some(true));
}

#[tokio::test]
async fn summary_only_upstream_still_produces_records() {
    let src = FixtureSource::new(Vec::new(), vec![summary_record("2024-01-05", 66)]);
    let opts = ServiceOptions {
        min_sleep_seconds: 0,
        ..ServiceOptions::default()
    };
    let view = SleepService::new(Arc::new(src), None, opts)
        .load_dashboard(&range("2024-01-01", "2024-01-07"), FallbackPolicy::Never)
        .await
        .unwrap();

    assert_eq!(view.provenance, Provenance::Upstream);
    assert_eq!(view.records.len(), 1);
    assert_eq!(view.records[0].record.quality_score, 66);
    assert_eq!(view.report.as_ref().map(|r| r.summary_only), Some(true));
}
