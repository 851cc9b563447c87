//! Sleep record reconciliation.
//!
//! Merges the two upstream shapes (per-session "detailed" records and
//! per-day "summary" records) into one [`CanonicalSleepRecord`] per day:
//!
//! 1. Score pre-pass over summary records builds `day -> score` from valid
//!    (positive) scores. When that finds nothing at all, a second pass looks
//!    inside each record's nested payload.
//! 2. Each detailed record is unwrapped (`sleep` sub-object) and normalized
//!    through the [`DETAILED`] probe table.
//! 3. The summary score for a day, when present, overwrites the detailed
//!    record's own score.
//! 4. With no detailed records at all, summary records are normalized through
//!    the [`SUMMARY`] table instead.
//! 5. With no records from either source the outcome is [`ReconcileOutcome::NoData`].
//!
//! Pure: no I/O, no logging, no clock reads. "Now" is an input via
//! [`ReconcileContext`].

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value;
use slp_schemas::{CanonicalSleepRecord, DateRange, RawRecord, RecordSource, DAY_FORMAT};

use crate::hypnogram::{try_decode_hypnogram, SENTINEL_TRACE};
use crate::probe::{
    first_present, probe_f64, probe_seconds, probe_string, unwrap_payload, ProbeTable, DETAILED,
    SUMMARY,
};
use crate::score::{extract_score, nested_valid_score, valid_score};

// ---------------------------------------------------------------------------
// Inputs / outputs
// ---------------------------------------------------------------------------

/// Values the reconciler substitutes when upstream omits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileContext {
    /// Day assigned to records that carry no `day` at all.
    pub fallback_day: NaiveDate,
    /// Substituted for missing bedtimes; such records are flagged
    /// `bedtime_synthesized`.
    pub now: DateTime<Utc>,
}

impl ReconcileContext {
    pub fn new(fallback_day: NaiveDate, now: DateTime<Utc>) -> Self {
        Self { fallback_day, now }
    }

    /// Records without a day are attributed to the start of the queried range.
    pub fn for_range(range: &DateRange, now: DateTime<Utc>) -> Self {
        Self::new(range.start(), now)
    }
}

/// Counters describing one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub detailed_in: usize,
    pub summary_in: usize,
    /// Days with a valid summary score (after either pass).
    pub summary_scores: usize,
    /// The nested-payload score pass ran.
    pub nested_score_pass: bool,
    /// Records whose score was replaced by the summary score.
    pub scores_overlaid: usize,
    /// Extra records for an already-seen day that were dropped.
    pub duplicates_collapsed: usize,
    /// Records were built from the summary source alone.
    pub summary_only: bool,
    pub bedtimes_synthesized: usize,
    pub records_out: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    /// At least one record, ordered by ascending day.
    Records {
        records: Vec<CanonicalSleepRecord>,
        report: ReconcileReport,
    },
    /// Neither source had any record. Nothing is fabricated.
    NoData { report: ReconcileReport },
}

impl ReconcileOutcome {
    pub fn is_no_data(&self) -> bool {
        matches!(self, ReconcileOutcome::NoData { .. })
    }

    pub fn report(&self) -> &ReconcileReport {
        match self {
            ReconcileOutcome::Records { report, .. } | ReconcileOutcome::NoData { report } => {
                report
            }
        }
    }

    pub fn records(&self) -> &[CanonicalSleepRecord] {
        match self {
            ReconcileOutcome::Records { records, .. } => records,
            ReconcileOutcome::NoData { .. } => &[],
        }
    }

    pub fn into_parts(self) -> (Vec<CanonicalSleepRecord>, ReconcileReport) {
        match self {
            ReconcileOutcome::Records { records, report } => (records, report),
            ReconcileOutcome::NoData { report } => (Vec::new(), report),
        }
    }
}

// ---------------------------------------------------------------------------
// Reconcile
// ---------------------------------------------------------------------------

/// Merge detailed and summary records into canonical per-day records.
///
/// Never fails: malformed records produce defaulted fields, not errors.
pub fn reconcile(
    detailed: &[RawRecord],
    summary: &[RawRecord],
    ctx: &ReconcileContext,
) -> ReconcileOutcome {
    let mut report = ReconcileReport {
        detailed_in: detailed.len(),
        summary_in: summary.len(),
        ..ReconcileReport::default()
    };

    if detailed.is_empty() && summary.is_empty() {
        return ReconcileOutcome::NoData { report };
    }

    let scores = summary_scores(summary, ctx, &mut report);

    let (source, table, records) = if detailed.is_empty() {
        report.summary_only = true;
        (RecordSource::Summary, &SUMMARY, summary)
    } else {
        (RecordSource::Detailed, &DETAILED, detailed)
    };

    let mut by_day: BTreeMap<String, CanonicalSleepRecord> = BTreeMap::new();
    for (index, raw) in records.iter().enumerate() {
        let rec = normalize(raw, table, source, index, ctx);
        match by_day.get(&rec.day) {
            Some(kept) => {
                report.duplicates_collapsed += 1;
                // The main sleep of a day outlasts its naps.
                if rec.total_sleep_seconds > kept.total_sleep_seconds {
                    by_day.insert(rec.day.clone(), rec);
                }
            }
            None => {
                by_day.insert(rec.day.clone(), rec);
            }
        }
    }

    let mut out: Vec<CanonicalSleepRecord> = by_day.into_values().collect();
    for rec in out.iter_mut() {
        if let Some(score) = scores.get(&rec.day) {
            if rec.quality_score != *score {
                report.scores_overlaid += 1;
            }
            rec.quality_score = *score;
        }
        if rec.bedtime_synthesized {
            report.bedtimes_synthesized += 1;
        }
    }

    report.records_out = out.len();
    ReconcileOutcome::Records {
        records: out,
        report,
    }
}

/// Day-indexed valid scores from the summary source.
fn summary_scores(
    summary: &[RawRecord],
    ctx: &ReconcileContext,
    report: &mut ReconcileReport,
) -> BTreeMap<String, i64> {
    let mut scores = BTreeMap::new();
    for raw in summary {
        if let Some(score) = valid_score(unwrap_payload(raw)) {
            scores.insert(resolve_day(raw, &SUMMARY, ctx), score);
        }
    }

    if scores.is_empty() {
        report.nested_score_pass = !summary.is_empty();
        for raw in summary {
            if let Some(score) = nested_valid_score(raw) {
                scores.insert(resolve_day(raw, &SUMMARY, ctx), score);
            }
        }
    }

    report.summary_scores = scores.len();
    scores
}

/// The record's day: its own, then its nested payload's, then the fallback.
fn resolve_day(raw: &Value, table: &ProbeTable, ctx: &ReconcileContext) -> String {
    probe_string(raw, table.day)
        .or_else(|| probe_string(unwrap_payload(raw), table.day))
        .unwrap_or_else(|| ctx.fallback_day.format(DAY_FORMAT).to_string())
}

fn normalize(
    raw: &Value,
    table: &ProbeTable,
    source: RecordSource,
    index: usize,
    ctx: &ReconcileContext,
) -> CanonicalSleepRecord {
    let p = unwrap_payload(raw);
    let day = probe_string(p, table.day)
        .unwrap_or_else(|| ctx.fallback_day.format(DAY_FORMAT).to_string());

    let id = probe_string(p, table.id)
        .unwrap_or_else(|| format!("{}-{}-{}", source.as_str(), day, index));

    let start = probe_timestamp(p, table.bedtime_start);
    let end = probe_timestamp(p, table.bedtime_end);
    let now: DateTime<FixedOffset> = ctx.now.into();

    CanonicalSleepRecord {
        id,
        day,
        source,
        bedtime_synthesized: start.is_none() || end.is_none(),
        bedtime_start: start.unwrap_or(now),
        bedtime_end: end.unwrap_or(now),
        latency_seconds: probe_seconds(p, table.latency),
        total_sleep_seconds: probe_seconds(p, table.total_sleep),
        awake_seconds: probe_seconds(p, table.awake),
        light_sleep_seconds: probe_seconds(p, table.light_sleep),
        rem_sleep_seconds: probe_seconds(p, table.rem_sleep),
        deep_sleep_seconds: probe_seconds(p, table.deep_sleep),
        efficiency_percent: probe_f64(p, table.efficiency),
        hypnogram_trace: probe_trace(p, table.hypnogram),
        heart_rate_lowest: probe_f64(p, table.hr_lowest),
        heart_rate_average: probe_f64(p, table.hr_average),
        temperature_delta: probe_f64(p, table.temperature_delta),
        quality_score: extract_score(p),
    }
}

fn probe_timestamp(p: &Value, candidates: &[&str]) -> Option<DateTime<FixedOffset>> {
    let s = probe_string(p, candidates)?;
    DateTime::parse_from_rfc3339(&s).ok()
}

/// Keep upstream's encoding when it decodes; arrays are re-encoded as JSON.
fn probe_trace(p: &Value, candidates: &[&str]) -> String {
    let trace = match first_present(p, candidates) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(v @ Value::Array(_)) => v.to_string(),
        _ => return SENTINEL_TRACE.to_string(),
    };
    if try_decode_hypnogram(&trace).is_some() {
        trace
    } else {
        SENTINEL_TRACE.to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
