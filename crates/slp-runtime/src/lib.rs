//! slp-runtime
//!
//! The dashboard pipeline: fetch both upstream shapes, reconcile, apply the
//! caller's fallback policy, then clip, filter naps, attach notes and sort.
//!
//! This is the only layer that decides whether synthetic data is shown, and
//! every view it returns says where its records came from ([`Provenance`]).
//!
//! This crate does **not**:
//! - parse upstream fields (that is `slp-reconcile`)
//! - speak HTTP or SQL directly (that is `slp-upstream` / `slp-db`)

mod wiring;

pub use wiring::{build_service, connect_notes, source_mode_for};

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use slp_config::AppConfig;
use slp_db::{NotesError, NotesStore};
use slp_reconcile::{
    attach_notes, filter_naps, generate_mock, generate_mock_seeded, reconcile, sort_newest_first,
    ReconcileContext, ReconcileOutcome, ReconcileReport,
};
use slp_schemas::{
    CanonicalSleepRecord, DateRange, FallbackPolicy, RawRecord, SleepNote, SleepRecordWithNote,
};
use slp_upstream::{SleepEndpoint, SleepSource, UpstreamError};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("upstream fetch failed: {0}")]
    Upstream(#[from] UpstreamError),
    #[error("no sleep data for {start}..={end}")]
    NoData { start: NaiveDate, end: NaiveDate },
    #[error("notes: {0}")]
    Notes(#[from] NotesError),
}

/// Where a view's records came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Upstream,
    /// Mock data, selected by the caller's fallback policy.
    Synthetic,
    /// Upstream answered but had nothing for the range.
    NoData,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub range: DateRange,
    pub provenance: Provenance,
    pub fallback: FallbackPolicy,
    /// `true` only when the notes store was queried and answered for this view.
    pub notes_available: bool,
    /// Newest day first.
    pub records: Vec<SleepRecordWithNote>,
    /// Absent for synthetic views.
    pub report: Option<ReconcileReport>,
}

impl DashboardView {
    /// Turn an empty upstream answer into an error for callers that need data.
    pub fn require_data(self) -> Result<Self, RuntimeError> {
        if self.provenance == Provenance::NoData {
            return Err(RuntimeError::NoData {
                start: self.range.start(),
                end: self.range.end(),
            });
        }
        Ok(self)
    }

    pub fn canonical_records(&self) -> Vec<CanonicalSleepRecord> {
        self.records.iter().map(|r| r.record.clone()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceOptions {
    pub min_sleep_seconds: u64,
    pub end_date_padding_days: u32,
    /// Seed for synthetic views; `None` draws from the thread RNG.
    pub mock_seed: Option<u64>,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl ServiceOptions {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            min_sleep_seconds: cfg.dashboard.min_sleep_seconds,
            end_date_padding_days: cfg.upstream.end_date_padding_days,
            mock_seed: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct SleepService {
    source: Arc<dyn SleepSource>,
    notes: Option<Arc<dyn NotesStore>>,
    options: ServiceOptions,
}

impl SleepService {
    pub fn new(
        source: Arc<dyn SleepSource>,
        notes: Option<Arc<dyn NotesStore>>,
        options: ServiceOptions,
    ) -> Self {
        Self {
            source,
            notes,
            options,
        }
    }

    pub fn options(&self) -> &ServiceOptions {
        &self.options
    }

    pub fn source_name(&self) -> &'static str {
        self.source.source_name()
    }

    pub fn notes_store(&self) -> Option<&Arc<dyn NotesStore>> {
        self.notes.as_ref()
    }

    pub async fn load_dashboard(
        &self,
        range: &DateRange,
        policy: FallbackPolicy,
    ) -> Result<DashboardView, RuntimeError> {
        self.load_dashboard_at(range, policy, Utc::now()).await
    }

    /// [`Self::load_dashboard`] with an explicit clock for bedtime defaults.
    pub async fn load_dashboard_at(
        &self,
        range: &DateRange,
        policy: FallbackPolicy,
        now: DateTime<Utc>,
    ) -> Result<DashboardView, RuntimeError> {
        tracing::info!(
            start = %range.start(),
            end = %range.end(),
            fallback = policy.as_str(),
            source = self.source.source_name(),
            "dashboard load"
        );

        if policy == FallbackPolicy::Always {
            return Ok(self.synthetic_view(range, policy).await);
        }

        let fetch_range = range.pad_end(self.options.end_date_padding_days);
        let (summary, detailed) = match self.fetch_both(&fetch_range).await {
            Ok(both) => both,
            Err(e) if policy.mock_on_failure() => {
                tracing::warn!(error = %e, "upstream failed; showing synthetic data per fallback policy");
                return Ok(self.synthetic_view(range, policy).await);
            }
            Err(e) => {
                tracing::error!(error = %e, "upstream failed");
                return Err(e.into());
            }
        };

        let ctx = ReconcileContext::for_range(range, now);
        match reconcile(&detailed, &summary, &ctx) {
            ReconcileOutcome::NoData { report } => {
                if policy.mock_on_empty() {
                    tracing::info!("upstream returned no records; showing synthetic data per fallback policy");
                    return Ok(self.synthetic_view(range, policy).await);
                }
                tracing::info!("upstream returned no records");
                Ok(DashboardView {
                    range: *range,
                    provenance: Provenance::NoData,
                    fallback: policy,
                    notes_available: false,
                    records: Vec::new(),
                    report: Some(report),
                })
            }
            ReconcileOutcome::Records { records, report } => {
                let clipped = clip_to_range(records, range);
                let kept = filter_naps(clipped, self.options.min_sleep_seconds);
                let (records, notes_available) = self.decorate(range, kept).await;

                tracing::info!(
                    detailed_in = report.detailed_in,
                    summary_in = report.summary_in,
                    reconciled = report.records_out,
                    shown = records.len(),
                    scores_overlaid = report.scores_overlaid,
                    summary_only = report.summary_only,
                    "dashboard ready"
                );

                Ok(DashboardView {
                    range: *range,
                    provenance: Provenance::Upstream,
                    fallback: policy,
                    notes_available,
                    records,
                    report: Some(report),
                })
            }
        }
    }

    /// Raw upstream body for one endpoint, unpadded and unreconciled.
    pub async fn fetch_raw(
        &self,
        endpoint: SleepEndpoint,
        range: &DateRange,
    ) -> Result<serde_json::Value, RuntimeError> {
        Ok(self.source.fetch_raw(endpoint, range).await?)
    }

    pub async fn notes_in_range(&self, range: &DateRange) -> Result<Vec<SleepNote>, RuntimeError> {
        Ok(self.require_notes()?.notes_in_range(range).await?)
    }

    pub async fn save_note(&self, day: NaiveDate, text: &str) -> Result<SleepNote, RuntimeError> {
        Ok(self.require_notes()?.upsert_note(day, text).await?)
    }

    fn require_notes(&self) -> Result<&Arc<dyn NotesStore>, NotesError> {
        self.notes
            .as_ref()
            .ok_or_else(|| NotesError::Config("no notes store configured".to_string()))
    }

    /// Summary first, then detailed. Either failing fails the fetch.
    async fn fetch_both(
        &self,
        range: &DateRange,
    ) -> Result<(Vec<RawRecord>, Vec<RawRecord>), UpstreamError> {
        let summary = self.source.fetch_summary(range).await?;
        let detailed = self.source.fetch_detailed(range).await?;
        tracing::debug!(
            summary = summary.len(),
            detailed = detailed.len(),
            "upstream records fetched"
        );
        Ok((summary, detailed))
    }

    async fn synthetic_view(&self, range: &DateRange, policy: FallbackPolicy) -> DashboardView {
        let mock = match self.options.mock_seed {
            Some(seed) => generate_mock_seeded(range, seed),
            None => generate_mock(range),
        };
        let (records, notes_available) = self.decorate(range, mock).await;
        DashboardView {
            range: *range,
            provenance: Provenance::Synthetic,
            fallback: policy,
            notes_available,
            records,
            report: None,
        }
    }

    /// Attach notes and order newest first. A failing store degrades to no notes.
    async fn decorate(
        &self,
        range: &DateRange,
        records: Vec<CanonicalSleepRecord>,
    ) -> (Vec<SleepRecordWithNote>, bool) {
        let (notes, available) = match &self.notes {
            None => (Vec::new(), false),
            Some(store) => match store.notes_in_range(range).await {
                Ok(notes) => (notes, true),
                Err(e) => {
                    tracing::warn!(error = %e, "notes unavailable; continuing without them");
                    (Vec::new(), false)
                }
            },
        };

        let mut out = attach_notes(records, &notes);
        sort_newest_first(&mut out);
        (out, available)
    }
}

/// Drop records outside the requested range (padding brings in extra days).
fn clip_to_range(records: Vec<CanonicalSleepRecord>, range: &DateRange) -> Vec<CanonicalSleepRecord> {
    records
        .into_iter()
        .filter(|r| r.day_date().is_some_and(|d| range.contains(d)))
        .collect()
}
