//! Shared helpers for `slp` subcommands.

pub mod fetch;
pub mod notes;

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use slp_config::{
    load_layered_yaml, load_layered_yaml_from_strings, report_unused_keys, AppConfig,
    LoadedConfig, UnusedKeyPolicy,
};
use slp_schemas::{DateRange, FallbackPolicy, DAY_FORMAT};
use tracing_subscriber::EnvFilter;

/// Read when no `--config` is given, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/base.yaml";

pub struct CliConfig {
    pub loaded: LoadedConfig,
    pub app: AppConfig,
}

/// Load layered config. With no paths, use [`DEFAULT_CONFIG_PATH`] if it
/// exists, else built-in defaults.
pub fn load_config(paths: &[String]) -> Result<CliConfig> {
    let loaded = if paths.is_empty() {
        if Path::new(DEFAULT_CONFIG_PATH).exists() {
            load_layered_yaml(&[DEFAULT_CONFIG_PATH])?
        } else {
            load_layered_yaml_from_strings(&[])?
        }
    } else {
        let refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
        load_layered_yaml(&refs)?
    };
    let app = loaded.app_config()?;
    Ok(CliConfig { loaded, app })
}

/// Logs go to stderr; stdout carries only command output.
pub fn init_tracing(app: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&app.diagnostics.log_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn warn_unused_keys(loaded: &LoadedConfig) -> Result<()> {
    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn)?;
    for pointer in &report.unused_leaf_pointers {
        tracing::warn!(pointer = %pointer, "CONFIG_UNUSED_KEYS: no code reads this key");
    }
    Ok(())
}

pub fn parse_day(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DAY_FORMAT)
        .with_context(|| format!("invalid day '{raw}' (expected YYYY-MM-DD)"))
}

/// Both bounds given: parse them. Neither: the last `default_days` ending today.
pub fn resolve_range(
    start: Option<&str>,
    end: Option<&str>,
    default_days: u32,
) -> Result<DateRange> {
    match (start, end) {
        (Some(s), Some(e)) => Ok(DateRange::parse(s, e)?),
        (None, None) => Ok(DateRange::last_days(Utc::now().date_naive(), default_days)),
        _ => anyhow::bail!("--start and --end must be given together"),
    }
}

pub fn parse_fallback(raw: Option<&str>, default: FallbackPolicy) -> Result<FallbackPolicy> {
    match raw {
        None => Ok(default),
        Some(s) => FallbackPolicy::parse(s).with_context(|| {
            format!(
                "invalid fallback '{s}' (expected never|on_empty|on_failure|on_empty_or_failure|always)"
            )
        }),
    }
}
