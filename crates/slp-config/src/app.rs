//! Typed view over the merged configuration tree.
//!
//! Every section and field is optional in YAML; absent values take the
//! defaults below. Unknown keys are not an error here, they are reported by
//! [`crate::report_unused_keys`].

use std::net::SocketAddr;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use slp_schemas::{FallbackPolicy, MAX_RANGE_DAYS};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub upstream: UpstreamConfig,
    pub notes: NotesConfig,
    pub dashboard: DashboardConfig,
    pub diagnostics: DiagnosticsConfig,
    pub daemon: DaemonConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Env var NAME holding the bearer token.
    pub token_env: String,
    /// Days added to the upstream `end_date`; results are clipped back.
    pub end_date_padding_days: u32,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.ouraring.com".to_string(),
            timeout_secs: 15,
            token_env: "OURA_TOKEN".to_string(),
            end_date_padding_days: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotesConfig {
    pub enabled: bool,
    /// Env var NAME holding the Postgres connection string.
    pub database_url_env: String,
}

impl Default for NotesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            database_url_env: "SLP_DATABASE_URL".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Sessions shorter than this are naps and are hidden.
    pub min_sleep_seconds: u64,
    pub fallback: FallbackPolicy,
    pub default_range_days: u32,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            min_sleep_seconds: 3600,
            fallback: FallbackPolicy::Never,
            default_range_days: 7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// `tracing_subscriber::EnvFilter` directive; `RUST_LOG` wins when set.
    pub log_filter: String,
    pub trace_upstream_payloads: bool,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            log_filter: "info".to_string(),
            trace_upstream_payloads: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub bind_addr: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8899".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_json(config_json: &Value) -> Result<Self> {
        let cfg: AppConfig =
            serde_json::from_value(config_json.clone()).context("CONFIG_INVALID: typed decode")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.upstream.base_url.trim().is_empty() {
            bail!("CONFIG_INVALID: upstream.base_url is empty");
        }
        if self.upstream.timeout_secs == 0 {
            bail!("CONFIG_INVALID: upstream.timeout_secs must be > 0");
        }
        if self.upstream.token_env.trim().is_empty() {
            bail!("CONFIG_INVALID: upstream.token_env is empty");
        }
        if self.dashboard.default_range_days == 0 {
            bail!("CONFIG_INVALID: dashboard.default_range_days must be > 0");
        }
        if self.dashboard.default_range_days >= MAX_RANGE_DAYS {
            bail!("CONFIG_INVALID: dashboard.default_range_days must be < {MAX_RANGE_DAYS}");
        }
        self.bind_addr()?;
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.daemon
            .bind_addr
            .parse::<SocketAddr>()
            .with_context(|| format!("CONFIG_INVALID: daemon.bind_addr '{}'", self.daemon.bind_addr))
    }

    pub fn upstream_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.upstream.timeout_secs)
    }
}
