//! In-memory fakes and raw-record builders for scenario tests.
//!
//! [`FixtureSource`] stands in for the upstream API and records every call;
//! [`InMemoryNotesStore`] stands in for Postgres. Both can be switched into a
//! failing mode to exercise degradation paths.

use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::{NaiveDate, Utc};
use serde_json::{json, Value};
use slp_db::{NotesError, NotesStore};
use slp_schemas::{DateRange, RawRecord, SleepNote, DAY_FORMAT};
use slp_upstream::{SleepEndpoint, SleepSource, UpstreamError};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

pub fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, DAY_FORMAT).unwrap_or_else(|_| panic!("bad test day {s}"))
}

pub fn range(start: &str, end: &str) -> DateRange {
    DateRange::parse(start, end).unwrap_or_else(|e| panic!("bad test range: {e}"))
}

/// A detailed-endpoint session as the current API shapes it.
pub fn detailed_record(day: &str, total_sleep_seconds: u64, score: i64) -> RawRecord {
    json!({
        "id": format!("sess-{day}-{total_sleep_seconds}"),
        "day": day,
        "bedtime_start": format!("{day}T00:15:00+00:00"),
        "bedtime_end": format!("{day}T07:45:00+00:00"),
        "total_sleep_duration": total_sleep_seconds,
        "awake_time": 1_800,
        "light_sleep_duration": total_sleep_seconds / 2,
        "rem_sleep_duration": total_sleep_seconds / 4,
        "deep_sleep_duration": total_sleep_seconds / 4,
        "latency": 540,
        "efficiency": 90,
        "hypnogram_5min": "44332211223344",
        "hr_lowest": 50,
        "hr_average": 58.5,
        "temperature_delta": -0.1,
        "score": score
    })
}

/// A daily-summary record carrying only a day and a top-level score.
pub fn summary_record(day: &str, score: i64) -> RawRecord {
    json!({ "id": format!("daily-{day}"), "day": day, "score": score })
}

/// A daily-summary record whose score is only inside a nested payload.
pub fn nested_summary_record(day: &str, container: &str, score: i64) -> RawRecord {
    let mut rec = json!({ "id": format!("daily-{day}"), "day": day });
    rec[container] = json!({ "score": score });
    rec
}

// ---------------------------------------------------------------------------
// Upstream fake
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Canned {
    Records(Vec<RawRecord>),
    Status { status: u16, body: String },
    Timeout,
}

/// Canned upstream. Each endpoint answers with its own records or failure.
#[derive(Debug)]
pub struct FixtureSource {
    detailed: Canned,
    daily: Canned,
    calls: Mutex<Vec<(SleepEndpoint, DateRange)>>,
}

impl FixtureSource {
    pub fn new(detailed: Vec<RawRecord>, daily: Vec<RawRecord>) -> Self {
        Self::from_canned(Canned::Records(detailed), Canned::Records(daily))
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    /// Both endpoints answer with `status` and `body`.
    pub fn failing(status: u16, body: &str) -> Self {
        let c = Canned::Status {
            status,
            body: body.to_string(),
        };
        Self::from_canned(c.clone(), c)
    }

    /// The daily endpoint succeeds; the detailed endpoint times out.
    pub fn detailed_times_out(daily: Vec<RawRecord>) -> Self {
        Self::from_canned(Canned::Timeout, Canned::Records(daily))
    }

    fn from_canned(detailed: Canned, daily: Canned) -> Self {
        Self {
            detailed,
            daily,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every `(endpoint, range)` requested so far, in order.
    pub fn calls(&self) -> Vec<(SleepEndpoint, DateRange)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl SleepSource for FixtureSource {
    fn source_name(&self) -> &'static str {
        "fixture"
    }

    async fn fetch_raw(
        &self,
        endpoint: SleepEndpoint,
        range: &DateRange,
    ) -> Result<Value, UpstreamError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((endpoint, *range));
        }
        let canned = match endpoint {
            SleepEndpoint::Detailed => &self.detailed,
            SleepEndpoint::Daily => &self.daily,
        };
        match canned {
            Canned::Records(records) => Ok(json!({ "data": records, "next_token": null })),
            Canned::Status { status, body } => Err(UpstreamError::Status {
                status: *status,
                body: body.clone(),
            }),
            Canned::Timeout => Err(UpstreamError::Timeout(std::time::Duration::from_secs(15))),
        }
    }
}

// ---------------------------------------------------------------------------
// Notes fake
// ---------------------------------------------------------------------------

/// Notes keyed by day, last writer wins, matching the Postgres store.
#[derive(Debug, Default)]
pub struct InMemoryNotesStore {
    notes: Mutex<BTreeMap<NaiveDate, SleepNote>>,
    failing: bool,
}

impl InMemoryNotesStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails with a database error.
    pub fn failing() -> Self {
        Self {
            notes: Mutex::new(BTreeMap::new()),
            failing: true,
        }
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<NaiveDate, SleepNote>>, NotesError> {
        if self.failing {
            return Err(NotesError::Database("injected failure".to_string()));
        }
        self.notes
            .lock()
            .map_err(|_| NotesError::Database("notes lock poisoned".to_string()))
    }
}

#[async_trait::async_trait]
impl NotesStore for InMemoryNotesStore {
    async fn notes_in_range(&self, range: &DateRange) -> Result<Vec<SleepNote>, NotesError> {
        let notes = self.guard()?;
        Ok(notes
            .range(range.start()..=range.end())
            .rev()
            .map(|(_, n)| n.clone())
            .collect())
    }

    async fn note_for_day(&self, day: NaiveDate) -> Result<Option<SleepNote>, NotesError> {
        Ok(self.guard()?.get(&day).cloned())
    }

    async fn upsert_note(&self, day: NaiveDate, text: &str) -> Result<SleepNote, NotesError> {
        let mut notes = self.guard()?;
        let now = Utc::now();
        let note = notes.entry(day).or_insert_with(|| SleepNote {
            id: Uuid::new_v4(),
            day,
            notes: String::new(),
            created_at: now,
            updated_at: now,
        });
        note.notes = text.to_string();
        note.updated_at = now;
        Ok(note.clone())
    }

    async fn update_note(&self, id: Uuid, text: &str) -> Result<SleepNote, NotesError> {
        let mut notes = self.guard()?;
        let note = notes
            .values_mut()
            .find(|n| n.id == id)
            .ok_or(NotesError::NotFound(id))?;
        note.notes = text.to_string();
        note.updated_at = Utc::now();
        Ok(note.clone())
    }
}
