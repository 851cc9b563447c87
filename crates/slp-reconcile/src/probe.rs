//! Field probing over untyped upstream payloads.
//!
//! Upstream has renamed and re-nested its fields several times. Each
//! canonical field therefore has an ordered list of candidate locations
//! (JSON Pointers). The first candidate that is present and non-null wins;
//! a winner that cannot be coerced yields the field's default, it does not
//! fall through to later candidates.
//!
//! Adding support for a new upstream shape is a one-line change to a table
//! below.
//!
//! This module does **not**:
//! - decide which record wins a day (that is `reconciler.rs`)
//! - extract quality scores (that is `score.rs`)

use serde_json::Value;

// ---------------------------------------------------------------------------
// Probe tables
// ---------------------------------------------------------------------------

/// Candidate locations for every canonical field of one upstream shape.
#[derive(Debug, Clone, Copy)]
pub struct ProbeTable {
    pub id: &'static [&'static str],
    pub day: &'static [&'static str],
    pub bedtime_start: &'static [&'static str],
    pub bedtime_end: &'static [&'static str],
    pub latency: &'static [&'static str],
    pub total_sleep: &'static [&'static str],
    pub awake: &'static [&'static str],
    pub light_sleep: &'static [&'static str],
    pub rem_sleep: &'static [&'static str],
    pub deep_sleep: &'static [&'static str],
    pub efficiency: &'static [&'static str],
    pub hypnogram: &'static [&'static str],
    pub hr_lowest: &'static [&'static str],
    pub hr_average: &'static [&'static str],
    pub temperature_delta: &'static [&'static str],
}

/// Hypnogram: nested object form first, then the two flat forms.
const HYPNOGRAM: &[&str] = &["/hypnogram/hypnogram_5min", "/sleep_phase_5_min", "/hypnogram_5min"];

/// Per-session endpoint.
pub static DETAILED: ProbeTable = ProbeTable {
    id: &["/id"],
    day: &["/day"],
    bedtime_start: &["/bedtime_start"],
    bedtime_end: &["/bedtime_end"],
    latency: &["/latency"],
    total_sleep: &[
        "/duration",
        "/total_sleep_duration",
        "/total_sleep",
        "/sleep_duration",
        "/total",
    ],
    awake: &["/awake_time", "/awake_duration", "/awake"],
    light_sleep: &["/light_sleep_duration", "/light_sleep", "/light"],
    rem_sleep: &["/rem_sleep_duration", "/rem_sleep", "/rem"],
    deep_sleep: &["/deep_sleep_duration", "/deep_sleep", "/deep"],
    efficiency: &["/efficiency"],
    hypnogram: HYPNOGRAM,
    hr_lowest: &["/hr_lowest"],
    hr_average: &["/hr_average"],
    temperature_delta: &["/temperature_delta"],
};

/// Daily-summary endpoint: the detailed names plus the `contributors` tree.
pub static SUMMARY: ProbeTable = ProbeTable {
    id: &["/id"],
    day: &["/day"],
    bedtime_start: &["/bedtime_start"],
    bedtime_end: &["/bedtime_end"],
    latency: &["/sleep_latency", "/latency", "/contributors/latency/value"],
    total_sleep: &[
        "/duration",
        "/total_sleep_duration",
        "/total_sleep",
        "/sleep_duration",
        "/total",
        "/contributors/total_sleep/value",
    ],
    awake: &[
        "/awake_time",
        "/awake_duration",
        "/awake",
        "/contributors/awake_time/value",
    ],
    light_sleep: &[
        "/light_sleep_duration",
        "/light_sleep",
        "/light",
        "/contributors/light_sleep/value",
    ],
    rem_sleep: &[
        "/rem_sleep_duration",
        "/rem_sleep",
        "/rem",
        "/contributors/rem_sleep/value",
    ],
    deep_sleep: &[
        "/deep_sleep_duration",
        "/deep_sleep",
        "/deep",
        "/contributors/deep_sleep/value",
    ],
    efficiency: &["/efficiency", "/contributors/efficiency/value"],
    hypnogram: HYPNOGRAM,
    hr_lowest: &["/hr_lowest", "/contributors/restfulness/hr_lowest"],
    hr_average: &["/hr_average", "/contributors/restfulness/hr_average"],
    temperature_delta: &["/temperature_delta", "/contributors/temperature/value"],
};

/// Some shapes wrap the real payload one level deeper under this key.
const WRAPPER_KEY: &str = "sleep";

// ---------------------------------------------------------------------------
// Probing
// ---------------------------------------------------------------------------

/// The record's payload: its `sleep` sub-object when present, else itself.
pub fn unwrap_payload(record: &Value) -> &Value {
    match record.get(WRAPPER_KEY) {
        Some(inner) if inner.is_object() => inner,
        _ => record,
    }
}

/// First candidate that is present and not `null`.
pub fn first_present<'a>(payload: &'a Value, candidates: &[&str]) -> Option<&'a Value> {
    candidates
        .iter()
        .filter_map(|ptr| payload.pointer(ptr))
        .find(|v| !v.is_null())
}

/// Numeric coercion: JSON numbers and numeric strings. Non-finite values fail.
pub fn coerce_f64(v: &Value) -> Option<f64> {
    let f = match v {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    f.is_finite().then_some(f)
}

/// Integer coercion; fractional values truncate toward zero.
pub fn coerce_i64(v: &Value) -> Option<i64> {
    if let Some(i) = v.as_i64() {
        return Some(i);
    }
    if let Value::String(s) = v {
        if let Ok(i) = s.trim().parse::<i64>() {
            return Some(i);
        }
    }
    let f = coerce_f64(v)?.trunc();
    if f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

/// Non-negative whole seconds; absent, uncoercible or negative => 0.
pub fn probe_seconds(payload: &Value, candidates: &[&str]) -> u64 {
    first_present(payload, candidates)
        .and_then(coerce_i64)
        .map(|s| s.max(0) as u64)
        .unwrap_or(0)
}

/// Numeric vital; absent or uncoercible => 0.0.
pub fn probe_f64(payload: &Value, candidates: &[&str]) -> f64 {
    first_present(payload, candidates)
        .and_then(coerce_f64)
        .unwrap_or(0.0)
}

/// Text field. Numbers are rendered (some ids arrive numeric); blank strings
/// count as absent.
pub fn probe_string(payload: &Value, candidates: &[&str]) -> Option<String> {
    match first_present(payload, candidates)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn total_sleep_prefers_duration_over_later_names() {
        let p = json!({ "total_sleep_duration": 100, "duration": 200, "total": 300 });
        assert_eq!(probe_seconds(&p, DETAILED.total_sleep), 200);
    }

    #[test]
    fn null_candidate_is_skipped() {
        let p = json!({ "duration": null, "total_sleep": 90 });
        assert_eq!(probe_seconds(&p, DETAILED.total_sleep), 90);
    }

    #[test]
    fn present_zero_wins_over_later_candidates() {
        let p = json!({ "duration": 0, "total": 300 });
        assert_eq!(probe_seconds(&p, DETAILED.total_sleep), 0);
    }

    #[test]
    fn uncoercible_winner_defaults_instead_of_falling_through() {
        let p = json!({ "duration": "lots", "total": 300 });
        assert_eq!(probe_seconds(&p, DETAILED.total_sleep), 0);
    }

    #[test]
    fn seconds_accept_numeric_strings_and_floats() {
        assert_eq!(probe_seconds(&json!({ "duration": " 25200 " }), DETAILED.total_sleep), 25_200);
        assert_eq!(probe_seconds(&json!({ "duration": 25200.9 }), DETAILED.total_sleep), 25_200);
    }

    #[test]
    fn negative_seconds_clamp_to_zero() {
        assert_eq!(probe_seconds(&json!({ "awake_time": -5 }), DETAILED.awake), 0);
    }

    #[test]
    fn absent_everything_zero_fills() {
        let p = json!({});
        assert_eq!(probe_seconds(&p, DETAILED.deep_sleep), 0);
        assert_eq!(probe_f64(&p, DETAILED.hr_average), 0.0);
        assert_eq!(probe_string(&p, DETAILED.id), None);
    }

    #[test]
    fn summary_falls_back_to_contributors_tree() {
        let p = json!({ "contributors": { "deep_sleep": { "value": 4800 } } });
        assert_eq!(probe_seconds(&p, SUMMARY.deep_sleep), 4800);
        // Detailed table does not look there.
        assert_eq!(probe_seconds(&p, DETAILED.deep_sleep), 0);
    }

    #[test]
    fn summary_restfulness_vitals() {
        let p = json!({ "contributors": { "restfulness": { "hr_lowest": 51, "hr_average": 60.5 } } });
        assert_eq!(probe_f64(&p, SUMMARY.hr_lowest), 51.0);
        assert_eq!(probe_f64(&p, SUMMARY.hr_average), 60.5);
    }

    #[test]
    fn pointer_into_non_object_is_absent() {
        // `hypnogram` as a flat string must not satisfy the nested form.
        let p = json!({ "hypnogram": "1234", "hypnogram_5min": "4321" });
        let v = first_present(&p, DETAILED.hypnogram).unwrap();
        assert_eq!(v, "4321");
    }

    #[test]
    fn unwrap_payload_descends_into_sleep_object_only() {
        let wrapped = json!({ "sleep": { "day": "2024-01-05" }, "day": "outer" });
        assert_eq!(unwrap_payload(&wrapped)["day"], "2024-01-05");

        let not_object = json!({ "sleep": 42, "day": "outer" });
        assert_eq!(unwrap_payload(&not_object)["day"], "outer");
    }

    #[test]
    fn numeric_id_is_rendered() {
        assert_eq!(probe_string(&json!({ "id": 17 }), DETAILED.id).as_deref(), Some("17"));
        assert_eq!(probe_string(&json!({ "id": "  " }), DETAILED.id), None);
    }

    #[test]
    fn coerce_rejects_bools_and_non_finite() {
        assert_eq!(coerce_f64(&json!(true)), None);
        assert_eq!(coerce_f64(&json!("NaN")), None);
        assert_eq!(coerce_i64(&json!("inf")), None);
        assert_eq!(coerce_i64(&json!("-3")), Some(-3));
    }
}
