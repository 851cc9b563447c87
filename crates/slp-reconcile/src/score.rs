//! Quality-score extraction.
//!
//! Upstream has exposed the sleep score in at least four places over the
//! lifetime of its API. Candidates are checked in strict priority order;
//! the first present, non-null value is coerced to an integer. Anything that
//! fails coercion, or a record with no candidate at all, scores 0 ("unknown").

use serde_json::Value;

use crate::probe::{coerce_i64, first_present};

/// Score locations, highest priority first.
pub const SCORE_CANDIDATES: &[&str] = &[
    "/score",
    "/contributors/score/value",
    "/sleep_score",
    "/sleep_score_delta",
];

/// Keys under which a summary record may carry its original nested payload.
/// Probed only when no summary record yields a score at the top level.
pub const NESTED_PAYLOAD_KEYS: &[&str] = &["/_rawData", "/rawData", "/sleep"];

/// Extract a quality score from a single payload. Never fails.
pub fn extract_score(payload: &Value) -> i64 {
    first_present(payload, SCORE_CANDIDATES)
        .and_then(coerce_i64)
        .unwrap_or(0)
}

/// A score usable for the day-indexed overlay: strictly positive.
pub fn valid_score(payload: &Value) -> Option<i64> {
    Some(extract_score(payload)).filter(|s| *s > 0)
}

/// Look for a valid score inside the record's nested payload containers.
pub fn nested_valid_score(record: &Value) -> Option<i64> {
    NESTED_PAYLOAD_KEYS
        .iter()
        .filter_map(|key| record.pointer(key))
        .filter(|inner| inner.is_object())
        .find_map(valid_score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn direct_score_has_top_priority() {
        let p = json!({ "score": 72, "contributors": { "score": { "value": 55 } }, "sleep_score": 61 });
        assert_eq!(extract_score(&p), 72);
    }

    #[test]
    fn contributors_score_value_is_second() {
        let p = json!({ "contributors": { "score": { "value": 55 } }, "sleep_score": 61 });
        assert_eq!(extract_score(&p), 55);
    }

    #[test]
    fn sleep_score_is_third() {
        let p = json!({ "sleep_score": 61, "sleep_score_delta": 3 });
        assert_eq!(extract_score(&p), 61);
    }

    #[test]
    fn sleep_score_delta_is_last() {
        assert_eq!(extract_score(&json!({ "sleep_score_delta": -4 })), -4);
    }

    #[test]
    fn no_candidates_scores_zero() {
        assert_eq!(extract_score(&json!({ "day": "2024-01-05" })), 0);
        assert_eq!(extract_score(&json!(null)), 0);
        assert_eq!(extract_score(&json!([1, 2, 3])), 0);
    }

    #[test]
    fn null_direct_score_falls_through() {
        let p = json!({ "score": null, "sleep_score": 61 });
        assert_eq!(extract_score(&p), 61);
    }

    #[test]
    fn string_scores_coerce() {
        assert_eq!(extract_score(&json!({ "score": "83" })), 83);
        assert_eq!(extract_score(&json!({ "score": "83.7" })), 83);
    }

    #[test]
    fn uncoercible_first_candidate_scores_zero() {
        let p = json!({ "score": "n/a", "sleep_score": 61 });
        assert_eq!(extract_score(&p), 0);
    }

    #[test]
    fn valid_score_requires_positive() {
        assert_eq!(valid_score(&json!({ "score": 0 })), None);
        assert_eq!(valid_score(&json!({ "sleep_score_delta": -2 })), None);
        assert_eq!(valid_score(&json!({ "score": 1 })), Some(1));
    }

    #[test]
    fn nested_score_checks_containers_in_order() {
        let r = json!({
            "_rawData": { "score": 0 },
            "rawData": { "contributors": { "score": { "value": 66 } } },
            "sleep": { "score": 70 }
        });
        assert_eq!(nested_valid_score(&r), Some(66));
        assert_eq!(nested_valid_score(&json!({ "rawData": "77" })), None);
    }
}
