//! Synthetic records for demos and offline development.
//!
//! One record per day of the range, in ascending day order.
//! Mock records are always tagged [`RecordSource::Mock`]; whether a caller
//! shows them is decided by its fallback policy, never here.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use slp_schemas::{CanonicalSleepRecord, DateRange, RecordSource, DAY_FORMAT};

use crate::hypnogram::SENTINEL_TRACE;

const TEMPLATE_LATENCY: u64 = 600;
const TEMPLATE_TOTAL: u64 = 25_200;
const TEMPLATE_AWAKE: u64 = 1_800;
const TEMPLATE_HR_LOWEST: f64 = 52.0;
const TEMPLATE_HR_AVERAGE: f64 = 62.0;
const TEMPLATE_TEMPERATURE_DELTA: f64 = 0.2;

pub fn generate_mock(range: &DateRange) -> Vec<CanonicalSleepRecord> {
    generate_with(range, &mut rand::thread_rng())
}

/// Deterministic variant: the same `(range, seed)` yields the same records.
pub fn generate_mock_seeded(range: &DateRange, seed: u64) -> Vec<CanonicalSleepRecord> {
    generate_with(range, &mut StdRng::seed_from_u64(seed))
}

fn generate_with<R: Rng>(range: &DateRange, rng: &mut R) -> Vec<CanonicalSleepRecord> {
    range
        .days()
        .enumerate()
        .map(|(i, day)| mock_record(i, day, rng))
        .collect()
}

fn mock_record<R: Rng>(index: usize, day: NaiveDate, rng: &mut R) -> CanonicalSleepRecord {
    let midnight: DateTime<FixedOffset> = Utc
        .from_utc_datetime(&day.and_time(NaiveTime::default()))
        .into();

    CanonicalSleepRecord {
        id: format!("mock-{index}"),
        day: day.format(DAY_FORMAT).to_string(),
        source: RecordSource::Mock,
        bedtime_start: midnight - Duration::hours(8),
        bedtime_end: midnight - Duration::minutes(30),
        bedtime_synthesized: false,
        latency_seconds: TEMPLATE_LATENCY,
        total_sleep_seconds: TEMPLATE_TOTAL,
        awake_seconds: TEMPLATE_AWAKE,
        light_sleep_seconds: rng.gen_range(10_000..15_000),
        rem_sleep_seconds: rng.gen_range(5_000..9_000),
        deep_sleep_seconds: rng.gen_range(4_000..7_000),
        efficiency_percent: f64::from(rng.gen_range(80u8..100)),
        hypnogram_trace: SENTINEL_TRACE.to_string(),
        heart_rate_lowest: TEMPLATE_HR_LOWEST,
        heart_rate_average: TEMPLATE_HR_AVERAGE,
        temperature_delta: TEMPLATE_TEMPERATURE_DELTA,
        quality_score: rng.gen_range(70..100),
    }
}
