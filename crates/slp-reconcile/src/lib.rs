//! slp-reconcile
//!
//! Turns raw upstream sleep payloads into canonical per-day records.
//!
//! Deterministic and I/O-free: the caller fetches, this crate merges. The
//! only inputs beyond the payloads are a fallback day and a "now" instant,
//! both carried by [`ReconcileContext`]. Mock generation is the one source of
//! randomness and has a seeded variant.
//!
//! This crate does **not**:
//! - talk to the network or the notes database
//! - decide whether mock data should be shown (callers own that policy)
//! - log

pub mod hypnogram;
pub mod mock;
pub mod probe;
pub mod reconciler;
pub mod score;
pub mod view;

pub use hypnogram::{
    decode_hypnogram, try_decode_hypnogram, HypnogramStage, SENTINEL_STAGES, SENTINEL_TRACE,
};
pub use mock::{generate_mock, generate_mock_seeded};
pub use reconciler::{reconcile, ReconcileContext, ReconcileOutcome, ReconcileReport};
pub use score::{extract_score, valid_score};
pub use view::{
    attach_notes, filter_naps, format_duration, format_efficiency, score_band, sort_newest_first,
    stage_percentage, trend_series, ScoreBand, TrendPoint, TREND_MAX_POINTS,
};
