//! slp-schemas
//!
//! Shared data types for SleepDesk. No I/O and no normalization logic live
//! here; see `slp-reconcile` for how raw upstream payloads become
//! [`CanonicalSleepRecord`]s.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Calendar-day wire format used by the upstream API and the notes table.
pub const DAY_FORMAT: &str = "%Y-%m-%d";

/// Longest range accepted from user input, in days (one leap year).
pub const MAX_RANGE_DAYS: u32 = 366;

/// An upstream record exactly as decoded from the `data` array.
///
/// The shape differs between the detailed and daily-summary endpoints and has
/// drifted over time, so it is probed defensively and never trusted.
pub type RawRecord = serde_json::Value;

// ---------------------------------------------------------------------------
// Canonical record
// ---------------------------------------------------------------------------

/// Which upstream shape supplied a record's fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordSource {
    Detailed,
    Summary,
    Mock,
}

impl RecordSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordSource::Detailed => "detailed",
            RecordSource::Summary => "summary",
            RecordSource::Mock => "mock",
        }
    }
}

/// One day's sleep, field-complete.
///
/// Every field is populated with either an upstream value or its documented
/// default: durations and vitals zero-fill, the hypnogram falls back to a
/// sentinel trace, and `quality_score == 0` means "unknown".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalSleepRecord {
    pub id: String,
    /// `YYYY-MM-DD`; the join key across sources and against notes.
    pub day: String,
    pub source: RecordSource,
    pub bedtime_start: DateTime<FixedOffset>,
    pub bedtime_end: DateTime<FixedOffset>,
    /// `true` when either bedtime had to be defaulted to the reconcile clock.
    pub bedtime_synthesized: bool,
    pub latency_seconds: u64,
    pub total_sleep_seconds: u64,
    pub awake_seconds: u64,
    pub light_sleep_seconds: u64,
    pub rem_sleep_seconds: u64,
    pub deep_sleep_seconds: u64,
    /// Nominally 0..=100; upstream is not validated.
    pub efficiency_percent: f64,
    /// Sleep stage per 5-minute interval, encoded as upstream sent it.
    pub hypnogram_trace: String,
    pub heart_rate_lowest: f64,
    pub heart_rate_average: f64,
    pub temperature_delta: f64,
    pub quality_score: i64,
}

impl CanonicalSleepRecord {
    /// The record's day as a date, if it is well-formed.
    pub fn day_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.day.trim(), DAY_FORMAT).ok()
    }

    pub fn has_quality_score(&self) -> bool {
        self.quality_score != 0
    }
}

// ---------------------------------------------------------------------------
// Notes
// ---------------------------------------------------------------------------

/// A user-authored note, keyed by calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SleepNote {
    pub id: Uuid,
    pub day: NaiveDate,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A canonical record decorated with its note (if any) for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepRecordWithNote {
    #[serde(flatten)]
    pub record: CanonicalSleepRecord,
    pub note: Option<SleepNote>,
}

// ---------------------------------------------------------------------------
// Fallback policy
// ---------------------------------------------------------------------------

/// When a dashboard may show synthetic data instead of upstream data.
///
/// Mock data is never shown implicitly: the default is [`FallbackPolicy::Never`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    #[default]
    Never,
    OnEmpty,
    OnFailure,
    OnEmptyOrFailure,
    Always,
}

impl FallbackPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackPolicy::Never => "never",
            FallbackPolicy::OnEmpty => "on_empty",
            FallbackPolicy::OnFailure => "on_failure",
            FallbackPolicy::OnEmptyOrFailure => "on_empty_or_failure",
            FallbackPolicy::Always => "always",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "never" => Some(FallbackPolicy::Never),
            "on_empty" => Some(FallbackPolicy::OnEmpty),
            "on_failure" => Some(FallbackPolicy::OnFailure),
            "on_empty_or_failure" => Some(FallbackPolicy::OnEmptyOrFailure),
            "always" => Some(FallbackPolicy::Always),
            _ => None,
        }
    }

    pub fn mock_on_empty(&self) -> bool {
        matches!(
            self,
            FallbackPolicy::OnEmpty | FallbackPolicy::OnEmptyOrFailure
        )
    }

    pub fn mock_on_failure(&self) -> bool {
        matches!(
            self,
            FallbackPolicy::OnFailure | FallbackPolicy::OnEmptyOrFailure
        )
    }
}

// ---------------------------------------------------------------------------
// Date range
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DateRangeError {
    #[error("invalid {field} date '{raw}': expected YYYY-MM-DD")]
    Parse { field: &'static str, raw: String },
    #[error("end date {end} is before start date {start}")]
    Inverted { start: NaiveDate, end: NaiveDate },
    #[error("range covers {days} days; at most {max} are allowed")]
    TooLong { days: i64, max: u32 },
}

/// Inclusive `[start, end]` calendar-day range. `end >= start` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, DateRangeError> {
        if end < start {
            return Err(DateRangeError::Inverted { start, end });
        }
        Ok(Self { start, end })
    }

    /// Parse a `(start_date, end_date)` pair in `YYYY-MM-DD` form.
    ///
    /// Ranges longer than [`MAX_RANGE_DAYS`] are rejected.
    pub fn parse(start: &str, end: &str) -> Result<Self, DateRangeError> {
        let start_d = parse_day(start, "start")?;
        let end_d = parse_day(end, "end")?;
        let range = Self::new(start_d, end_d)?;
        let days = (end_d - start_d).num_days() + 1;
        if days > i64::from(MAX_RANGE_DAYS) {
            return Err(DateRangeError::TooLong {
                days,
                max: MAX_RANGE_DAYS,
            });
        }
        Ok(range)
    }

    /// The `days` days leading up to and including `today`
    /// (a one-week window is `last_days(today, 7)` => today-7 ..= today).
    pub fn last_days(today: NaiveDate, days: u32) -> Self {
        Self {
            start: today - Duration::days(i64::from(days)),
            end: today,
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn start_str(&self) -> String {
        self.start.format(DAY_FORMAT).to_string()
    }

    pub fn end_str(&self) -> String {
        self.end.format(DAY_FORMAT).to_string()
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        day >= self.start && day <= self.end
    }

    /// Number of calendar days covered (always >= 1).
    pub fn len_days(&self) -> u32 {
        // end >= start, so the difference is non-negative.
        (self.end - self.start).num_days() as u32 + 1
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let start = self.start;
        (0..self.len_days()).map(move |i| start + Duration::days(i64::from(i)))
    }

    /// Same start, end pushed out by `days`.
    pub fn pad_end(&self, days: u32) -> Self {
        Self {
            start: self.start,
            end: self.end + Duration::days(i64::from(days)),
        }
    }
}

fn parse_day(raw: &str, field: &'static str) -> Result<NaiveDate, DateRangeError> {
    NaiveDate::parse_from_str(raw.trim(), DAY_FORMAT).map_err(|_| DateRangeError::Parse {
        field,
        raw: raw.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
