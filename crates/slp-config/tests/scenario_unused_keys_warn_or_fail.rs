use slp_config::{load_layered_yaml_from_strings, report_unused_keys, UnusedKeyPolicy};

/// Unused-key guard:
/// 1) unused keys are reported in Warn without error
/// 2) unused keys fail in Fail
/// 3) every key the typed config reads is consumed
/// 4) ordering is deterministic

#[test]
fn warn_mode_reports_unused_keys_without_error() {
    let yaml = r#"
upstream:
  timeout_secs: 10
  retries: 3
legacy:
  supabase_url_env: "SUPABASE_URL"
"#;
    let loaded = load_layered_yaml_from_strings(&[yaml]).unwrap();
    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn)
        .expect("warn mode must not error");

    assert_eq!(
        report.unused_leaf_pointers,
        vec![
            "/legacy/supabase_url_env".to_string(),
            "/upstream/retries".to_string()
        ]
    );
}

#[test]
fn fail_mode_errors_on_unused_keys() {
    let loaded = load_layered_yaml_from_strings(&["dashbord:\n  fallback: always\n"]).unwrap();
    let err = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Fail)
        .unwrap_err()
        .to_string();
    assert!(err.contains("CONFIG_UNUSED_KEYS"), "got: {err}");
    assert!(err.contains("/dashbord/fallback"), "got: {err}");
}

#[test]
fn shipped_base_config_is_fully_consumed() {
    let base = concat!(env!("CARGO_MANIFEST_DIR"), "/../../config/base.yaml");
    let dev = concat!(env!("CARGO_MANIFEST_DIR"), "/../../config/dev.yaml");
    let loaded = slp_config::load_layered_yaml(&[base, dev]).unwrap();
    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Fail).unwrap();
    assert!(report.is_clean());
}
