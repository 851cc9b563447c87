//! Mode-aware secret resolution.
//!
//! Failure tests use sentinel env var names that are never set anywhere, so
//! no test mutates the process environment. `PATH` stands in for "a
//! variable that is certainly set".

use slp_config::load_layered_yaml_from_strings;
use slp_config::secrets::{resolve_secrets, SourceMode};

fn load(yaml: &str) -> serde_json::Value {
    load_layered_yaml_from_strings(&[yaml])
        .expect("test yaml must parse cleanly")
        .config_json
}

#[test]
fn live_mode_fails_when_token_missing() {
    let cfg = load("upstream:\n  token_env: \"SLP_SENTINEL_TOKEN_MISSING_A1\"\n");
    let msg = resolve_secrets(&cfg, SourceMode::Live)
        .unwrap_err()
        .to_string();
    assert!(msg.contains("SECRETS_MISSING"), "got: {msg}");
    assert!(msg.contains("mode=LIVE"), "got: {msg}");
    assert!(msg.contains("SLP_SENTINEL_TOKEN_MISSING_A1"), "got: {msg}");
}

#[test]
fn mock_mode_requires_nothing() {
    let cfg = load(
        "upstream:\n  token_env: \"SLP_SENTINEL_TOKEN_MISSING_B1\"\n\
         notes:\n  database_url_env: \"SLP_SENTINEL_DB_MISSING_B1\"\n",
    );
    let s = resolve_secrets(&cfg, SourceMode::Mock).unwrap();
    assert!(s.oura_token.is_none());
    assert!(s.database_url.is_none());
    assert_eq!(s.token_env, "SLP_SENTINEL_TOKEN_MISSING_B1");
}

#[test]
fn live_mode_succeeds_without_database_url() {
    let cfg = load(
        "upstream:\n  token_env: \"PATH\"\n\
         notes:\n  database_url_env: \"SLP_SENTINEL_DB_MISSING_C1\"\n",
    );
    let s = resolve_secrets(&cfg, SourceMode::Live).unwrap();
    assert!(s.oura_token.is_some());
    assert!(s.database_url.is_none());
}

#[test]
fn defaults_apply_when_names_absent() {
    let s = resolve_secrets(&load("{}"), SourceMode::Mock).unwrap();
    assert_eq!(s.token_env, "OURA_TOKEN");
    assert_eq!(s.database_url_env, "SLP_DATABASE_URL");
}

#[test]
fn debug_output_is_redacted() {
    let cfg = load("upstream:\n  token_env: \"PATH\"\n");
    let s = resolve_secrets(&cfg, SourceMode::Live).unwrap();
    let path_value = std::env::var("PATH").unwrap();
    let dbg = format!("{s:?}");
    assert!(dbg.contains("<REDACTED>"));
    assert!(!dbg.contains(&path_value));
}
