//! Dashboard view helpers.
//!
//! Pure presentation transforms over canonical records: nap filtering, note
//! joins, ordering, display formatting and the trend chart series.

use chrono::NaiveDate;
use serde::Serialize;
use slp_schemas::{CanonicalSleepRecord, SleepNote, SleepRecordWithNote};

use crate::hypnogram::HypnogramStage;

/// Default cap on trend chart points.
pub const TREND_MAX_POINTS: usize = 12;

// ---------------------------------------------------------------------------
// Record list transforms
// ---------------------------------------------------------------------------

/// Drop sessions shorter than `min_sleep_seconds` (naps).
pub fn filter_naps(
    records: Vec<CanonicalSleepRecord>,
    min_sleep_seconds: u64,
) -> Vec<CanonicalSleepRecord> {
    records
        .into_iter()
        .filter(|r| r.total_sleep_seconds >= min_sleep_seconds)
        .collect()
}

/// Join notes onto records by calendar day. Records without a note get `None`.
pub fn attach_notes(
    records: Vec<CanonicalSleepRecord>,
    notes: &[SleepNote],
) -> Vec<SleepRecordWithNote> {
    records
        .into_iter()
        .map(|record| {
            let note = record
                .day_date()
                .and_then(|day| notes.iter().find(|n| n.day == day))
                .cloned();
            SleepRecordWithNote { record, note }
        })
        .collect()
}

/// Descending by day; records sharing a day keep their relative order.
pub fn sort_newest_first(records: &mut [SleepRecordWithNote]) {
    records.sort_by(|a, b| b.record.day.cmp(&a.record.day));
}

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

/// `25_200` => `"7h 0m"`. Seconds below a minute are dropped.
pub fn format_duration(seconds: u64) -> String {
    format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
}

/// `91.6` => `"92%"`.
pub fn format_efficiency(efficiency: f64) -> String {
    format!("{:.0}%", efficiency.round())
}

/// Share of total sleep spent in `stage`, as a percentage. 0 when no sleep.
pub fn stage_percentage(record: &CanonicalSleepRecord, stage: HypnogramStage) -> f64 {
    if record.total_sleep_seconds == 0 {
        return 0.0;
    }
    let secs = match stage {
        HypnogramStage::Deep => record.deep_sleep_seconds,
        HypnogramStage::Light => record.light_sleep_seconds,
        HypnogramStage::Rem => record.rem_sleep_seconds,
        HypnogramStage::Awake => record.awake_seconds,
    };
    secs as f64 / record.total_sleep_seconds as f64 * 100.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    Good,
    Fair,
    Poor,
}

impl ScoreBand {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreBand::Good => "good",
            ScoreBand::Fair => "fair",
            ScoreBand::Poor => "poor",
        }
    }
}

pub fn score_band(score: i64) -> ScoreBand {
    if score >= 80 {
        ScoreBand::Good
    } else if score >= 70 {
        ScoreBand::Fair
    } else {
        ScoreBand::Poor
    }
}

// ---------------------------------------------------------------------------
// Trend series
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub day: NaiveDate,
    /// Axis label, e.g. `"Wed Mar 5"`.
    pub label: String,
    pub total_hours: f64,
    pub deep_hours: f64,
    pub rem_hours: f64,
}

/// Oldest-to-newest chart points, downsampled evenly to at most `max_points`.
///
/// The most recent record is always present. Records with a malformed day are
/// skipped.
pub fn trend_series(records: &[CanonicalSleepRecord], max_points: usize) -> Vec<TrendPoint> {
    let mut points: Vec<TrendPoint> = records
        .iter()
        .filter_map(|r| {
            let day = r.day_date()?;
            Some(TrendPoint {
                day,
                label: day.format("%a %b %-d").to_string(),
                total_hours: hours_1dp(r.total_sleep_seconds),
                deep_hours: hours_1dp(r.deep_sleep_seconds),
                rem_hours: hours_1dp(r.rem_sleep_seconds),
            })
        })
        .collect();
    points.sort_by_key(|p| p.day);

    if max_points == 0 || points.len() <= max_points {
        return points;
    }

    let step = points.len().div_ceil(max_points);
    let last = points.len() - 1;
    let mut picked: Vec<usize> = (0..points.len())
        .step_by(step)
        .take(max_points - 1)
        .collect();
    if picked.last() != Some(&last) {
        picked.push(last);
    }

    picked.into_iter().map(|i| points[i].clone()).collect()
}

fn hours_1dp(seconds: u64) -> f64 {
    (seconds as f64 / 360.0).round() / 10.0
}
