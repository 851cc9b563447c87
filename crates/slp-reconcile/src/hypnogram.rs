//! Hypnogram trace decoding.
//!
//! A trace is one stage code per 5-minute interval. Three encodings are
//! accepted, tried in order:
//! 1. a JSON array literal (`"[4,4,3,2]"`), elements coerced to numbers
//! 2. a comma-separated list (`"4,4,3,2"`)
//! 3. bare digits, one stage per character (`"4432"`)
//!
//! Empty or unparseable input decodes to [`SENTINEL_STAGES`] so a chart can
//! always be drawn.
//!
//! Every element must be a whole number in `0..=255`. A fractional, negative
//! or larger element (`"[1.5]"`, `"[-1]"`, `"[300]"`) makes the whole trace
//! unparseable; no element is rounded or clamped.

use serde_json::Value;

/// Trace substituted when upstream omits the hypnogram.
pub const SENTINEL_TRACE: &str = "4444332221111222333444332221111222333444";

/// [`SENTINEL_TRACE`] decoded.
pub const SENTINEL_STAGES: [u8; 40] = [
    4, 4, 4, 4, 3, 3, 2, 2, 2, 1, 1, 1, 1, 2, 2, 2, 3, 3, 3, 4, 4, 4, 3, 3, 2, 2, 2, 1, 1, 1, 1, 2,
    2, 2, 3, 3, 3, 4, 4, 4,
];

/// Decode a trace, falling back to the sentinel pattern.
pub fn decode_hypnogram(trace: &str) -> Vec<u8> {
    try_decode_hypnogram(trace).unwrap_or_else(|| SENTINEL_STAGES.to_vec())
}

/// Strict decode: `None` for empty or unparseable input.
pub fn try_decode_hypnogram(trace: &str) -> Option<Vec<u8>> {
    let t = trace.trim();
    if t.is_empty() {
        return None;
    }

    let stages = if let Some(stages) = decode_json_array(t) {
        stages
    } else if t.contains(',') {
        t.split(',')
            .map(|code| code.trim().parse::<u8>().ok())
            .collect::<Option<Vec<_>>>()?
    } else {
        t.chars()
            .map(|c| c.to_digit(10).map(|d| d as u8))
            .collect::<Option<Vec<_>>>()?
    };

    (!stages.is_empty()).then_some(stages)
}

fn decode_json_array(t: &str) -> Option<Vec<u8>> {
    if !(t.starts_with('[') && t.ends_with(']')) {
        return None;
    }
    let items: Vec<Value> = serde_json::from_str(t).ok()?;
    items.iter().map(stage_code).collect()
}

fn stage_code(v: &Value) -> Option<u8> {
    match v {
        Value::Number(n) => n.as_u64().and_then(|c| u8::try_from(c).ok()),
        Value::String(s) => s.trim().parse::<u8>().ok(),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

/// Stage codes as the wearable reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HypnogramStage {
    Deep = 1,
    Light = 2,
    Rem = 3,
    Awake = 4,
}

impl HypnogramStage {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(HypnogramStage::Deep),
            2 => Some(HypnogramStage::Light),
            3 => Some(HypnogramStage::Rem),
            4 => Some(HypnogramStage::Awake),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            HypnogramStage::Deep => "Deep",
            HypnogramStage::Light => "Light",
            HypnogramStage::Rem => "REM",
            HypnogramStage::Awake => "Awake",
        }
    }

    /// Dashboard palette colour.
    pub fn color(&self) -> &'static str {
        match self {
            HypnogramStage::Deep => "#3B82F6",
            HypnogramStage::Light => "#A3E635",
            HypnogramStage::Rem => "#EC4899",
            HypnogramStage::Awake => "#9CA3AF",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_digits() {
        assert_eq!(decode_hypnogram("1234"), vec![1, 2, 3, 4]);
    }

    #[test]
    fn json_array() {
        assert_eq!(decode_hypnogram("[1,2,3]"), vec![1, 2, 3]);
        assert_eq!(decode_hypnogram(r#"[4, "3", 2]"#), vec![4, 3, 2]);
    }

    #[test]
    fn comma_separated() {
        assert_eq!(decode_hypnogram("4, 3,2 ,1"), vec![4, 3, 2, 1]);
    }

    #[test]
    fn empty_yields_sentinel() {
        let s = decode_hypnogram("");
        assert_eq!(s.len(), 40);
        assert_eq!(s, SENTINEL_STAGES.to_vec());
        assert_eq!(decode_hypnogram("   "), SENTINEL_STAGES.to_vec());
        assert_eq!(decode_hypnogram("[]"), SENTINEL_STAGES.to_vec());
    }

    #[test]
    fn garbage_yields_sentinel() {
        assert_eq!(decode_hypnogram("abc"), SENTINEL_STAGES.to_vec());
        assert_eq!(decode_hypnogram("1,x,3"), SENTINEL_STAGES.to_vec());
        assert_eq!(decode_hypnogram("[1,{}]"), SENTINEL_STAGES.to_vec());
        assert_eq!(try_decode_hypnogram("12a4"), None);
    }

    #[test]
    fn out_of_range_elements_reject_whole_trace() {
        for trace in ["[1.5]", "[-1]", "[300]", "[4,3,256]", "4,-1,3"] {
            assert_eq!(try_decode_hypnogram(trace), None, "trace {trace}");
        }
        assert_eq!(decode_hypnogram("[2,1.5]"), SENTINEL_STAGES.to_vec());
    }

    #[test]
    fn sentinel_trace_decodes_to_sentinel_stages() {
        assert_eq!(try_decode_hypnogram(SENTINEL_TRACE), Some(SENTINEL_STAGES.to_vec()));
    }

    #[test]
    fn stage_codes_map_to_labels() {
        assert_eq!(HypnogramStage::from_code(3).map(|s| s.label()), Some("REM"));
        assert_eq!(HypnogramStage::from_code(1).map(|s| s.color()), Some("#3B82F6"));
        assert_eq!(HypnogramStage::from_code(9), None);
    }
}
