//! Runtime secret resolution.
//!
//! # Contract
//! - Config YAML stores only **env var NAMES** (e.g. `"OURA_TOKEN"`).
//! - Binaries call [`resolve_secrets`] once at startup and pass the result
//!   into constructors; `std::env::var` is not scattered elsewhere.
//! - `Debug` redacts values. Errors name the variable, never its value.
//!
//! # Mode-aware enforcement
//! - `Live`: the upstream token is **required**.
//! - `Mock`: nothing is required.
//!
//! The notes database URL is optional in every mode; without it the dashboard
//! runs without notes.

use anyhow::{bail, Result};
use serde_json::Value;

const DEFAULT_TOKEN_ENV: &str = "OURA_TOKEN";
const DEFAULT_DATABASE_URL_ENV: &str = "SLP_DATABASE_URL";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceMode {
    /// Real upstream data.
    Live,
    /// Synthetic data only; no upstream calls.
    Mock,
}

impl SourceMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceMode::Live => "LIVE",
            SourceMode::Mock => "MOCK",
        }
    }
}

/// **Values are redacted in `Debug` output.**
#[derive(Clone)]
pub struct ResolvedSecrets {
    /// Upstream bearer token. `None` if the named env var was absent or empty.
    pub oura_token: Option<String>,
    /// Notes database URL. `None` if the named env var was absent or empty.
    pub database_url: Option<String>,
    /// The env var names that were consulted, safe to print.
    pub token_env: String,
    pub database_url_env: String,
}

impl std::fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecrets")
            .field("oura_token", &self.oura_token.as_ref().map(|_| "<REDACTED>"))
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "<REDACTED>"),
            )
            .field("token_env", &self.token_env)
            .field("database_url_env", &self.database_url_env)
            .finish()
    }
}

/// Non-empty trimmed string at `pointer`, else `None`.
fn read_str_at(config: &Value, pointer: &str) -> Option<String> {
    let s = config.pointer(pointer)?.as_str()?.trim();
    (!s.is_empty()).then(|| s.to_string())
}

/// `None` if the variable is unset or blank.
fn resolve_env(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

/// Resolve secrets from the environment for `mode`.
///
/// # Errors
/// `SECRETS_MISSING` naming the first missing required env var.
pub fn resolve_secrets(config_json: &Value, mode: SourceMode) -> Result<ResolvedSecrets> {
    let token_env = read_str_at(config_json, "/upstream/token_env")
        .unwrap_or_else(|| DEFAULT_TOKEN_ENV.to_string());
    let database_url_env = read_str_at(config_json, "/notes/database_url_env")
        .unwrap_or_else(|| DEFAULT_DATABASE_URL_ENV.to_string());

    let oura_token = resolve_env(&token_env);
    let database_url = resolve_env(&database_url_env);

    if mode == SourceMode::Live && oura_token.is_none() {
        bail!(
            "SECRETS_MISSING mode={}: required env var '{}' \
             (upstream access token) is not set or empty",
            mode.as_str(),
            token_env,
        );
    }

    Ok(ResolvedSecrets {
        oura_token,
        database_url,
        token_env,
        database_url_env,
    })
}
