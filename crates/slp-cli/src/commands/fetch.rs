//! `slp fetch`, `slp mock`, `slp raw`, `slp hypnogram`.

use anyhow::{Context, Result};
use slp_config::{resolve_secrets, SourceMode};
use slp_reconcile::{
    attach_notes, format_duration, format_efficiency, generate_mock, generate_mock_seeded,
    score_band, sort_newest_first, stage_percentage, trend_series, try_decode_hypnogram,
    HypnogramStage, SENTINEL_STAGES, TREND_MAX_POINTS,
};
use slp_runtime::{build_service, source_mode_for, DashboardView};
use slp_schemas::{DateRange, FallbackPolicy, SleepRecordWithNote};
use slp_upstream::SleepEndpoint;

use super::CliConfig;

pub struct FetchArgs {
    pub range: DateRange,
    pub policy: FallbackPolicy,
    pub json: bool,
    pub require_data: bool,
    pub trend: bool,
}

pub async fn run_fetch(cfg: &CliConfig, args: FetchArgs) -> Result<()> {
    let secrets = resolve_secrets(&cfg.loaded.config_json, source_mode_for(args.policy))?;
    let service = build_service(&cfg.app, &secrets).await?;

    let view = service
        .load_dashboard(&args.range, args.policy)
        .await
        .context("dashboard load failed")?;
    let view = if args.require_data {
        view.require_data()?
    } else {
        view
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }
    print_view(&view);
    if args.trend {
        print_trend(&view);
    }
    Ok(())
}

/// Offline: synthetic records only, no upstream or notes access.
pub fn run_mock(range: &DateRange, seed: Option<u64>, json: bool) -> Result<()> {
    let records = match seed {
        Some(seed) => generate_mock_seeded(range, seed),
        None => generate_mock(range),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    let mut decorated = attach_notes(records, &[]);
    sort_newest_first(&mut decorated);
    println!("provenance=synthetic");
    println!("range={}..{}", range.start_str(), range.end_str());
    println!("records={}", decorated.len());
    for r in &decorated {
        println!("{}", record_line(r));
    }
    Ok(())
}

/// One endpoint's body exactly as upstream returned it.
pub async fn run_raw(cfg: &CliConfig, endpoint: SleepEndpoint, range: &DateRange) -> Result<()> {
    let secrets = resolve_secrets(&cfg.loaded.config_json, SourceMode::Live)?;
    let service = build_service(&cfg.app, &secrets).await?;
    let body = service
        .fetch_raw(endpoint, range)
        .await
        .with_context(|| format!("raw fetch failed endpoint={}", endpoint.as_str()))?;
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

pub fn run_hypnogram(trace: &str, json: bool) -> Result<()> {
    let (stages, sentinel) = match try_decode_hypnogram(trace) {
        Some(stages) => (stages, false),
        None => (SENTINEL_STAGES.to_vec(), true),
    };

    if json {
        let out = serde_json::json!({ "stages": stages, "sentinel": sentinel });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let joined: Vec<String> = stages.iter().map(|s| s.to_string()).collect();
    println!("intervals={}", stages.len());
    println!("sentinel={sentinel}");
    println!("stages={}", joined.join(","));
    for stage in [
        HypnogramStage::Deep,
        HypnogramStage::Light,
        HypnogramStage::Rem,
        HypnogramStage::Awake,
    ] {
        let n = stages.iter().filter(|&&c| c == stage as u8).count();
        println!("{}_minutes={}", stage.label().to_ascii_lowercase(), n * 5);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn print_view(view: &DashboardView) {
    println!("provenance={}", provenance_str(view));
    println!("fallback={}", view.fallback.as_str());
    println!("range={}..{}", view.range.start_str(), view.range.end_str());
    println!("notes_available={}", view.notes_available);
    println!("records={}", view.records.len());
    if let Some(report) = &view.report {
        println!(
            "reconcile detailed_in={} summary_in={} scores_overlaid={} duplicates_collapsed={} summary_only={}",
            report.detailed_in,
            report.summary_in,
            report.scores_overlaid,
            report.duplicates_collapsed,
            report.summary_only
        );
    }
    for r in &view.records {
        println!("{}", record_line(r));
    }
}

fn print_trend(view: &DashboardView) {
    for p in trend_series(&view.canonical_records(), TREND_MAX_POINTS) {
        println!(
            "trend day={} label=\"{}\" total_h={} deep_h={} rem_h={}",
            p.day, p.label, p.total_hours, p.deep_hours, p.rem_hours
        );
    }
}

fn provenance_str(view: &DashboardView) -> &'static str {
    match view.provenance {
        slp_runtime::Provenance::Upstream => "upstream",
        slp_runtime::Provenance::Synthetic => "synthetic",
        slp_runtime::Provenance::NoData => "no_data",
    }
}

fn record_line(r: &SleepRecordWithNote) -> String {
    let rec = &r.record;
    let score = if rec.has_quality_score() {
        format!("{} band={}", rec.quality_score, score_band(rec.quality_score).as_str())
    } else {
        "unknown".to_string()
    };
    let mut line = format!(
        "day={} source={} score={} total=\"{}\" efficiency={} deep_pct={:.0} rem_pct={:.0} bedtime_synthesized={}",
        rec.day,
        rec.source.as_str(),
        score,
        format_duration(rec.total_sleep_seconds),
        format_efficiency(rec.efficiency_percent),
        stage_percentage(rec, HypnogramStage::Deep),
        stage_percentage(rec, HypnogramStage::Rem),
        rec.bedtime_synthesized,
    );
    if let Some(note) = &r.note {
        line.push_str(&format!(" note={:?}", note.notes));
    }
    line
}
