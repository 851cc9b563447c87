//! Production wiring: config + resolved secrets -> [`SleepService`].
//!
//! Shared by the CLI and the daemon so both degrade the same way when the
//! token or the notes database is missing.

use std::sync::Arc;

use anyhow::{Context, Result};
use slp_config::{AppConfig, ResolvedSecrets, SourceMode};
use slp_db::{NotesStore, PgNotesStore};
use slp_schemas::FallbackPolicy;
use slp_upstream::{OuraClient, SleepSource, UnconfiguredSource};

use crate::{ServiceOptions, SleepService};

/// `Live` when upstream failures cannot fall back to synthetic data.
///
/// Under `Live` a missing token is a startup error; otherwise it only means
/// every fetch fails and the policy takes over.
pub fn source_mode_for(policy: FallbackPolicy) -> SourceMode {
    if policy == FallbackPolicy::Always || policy.mock_on_failure() {
        SourceMode::Mock
    } else {
        SourceMode::Live
    }
}

pub async fn build_service(cfg: &AppConfig, secrets: &ResolvedSecrets) -> Result<SleepService> {
    let source: Arc<dyn SleepSource> = match &secrets.oura_token {
        Some(token) => Arc::new(
            OuraClient::new_with_base_url(
                token.clone(),
                cfg.upstream.base_url.clone(),
                cfg.upstream_timeout(),
            )
            .context("upstream client init failed")?
            .with_payload_tracing(cfg.diagnostics.trace_upstream_payloads),
        ),
        None => {
            tracing::warn!(
                token_env = %secrets.token_env,
                "upstream token not set; upstream fetches will fail"
            );
            Arc::new(UnconfiguredSource::new(format!(
                "env var '{}' is not set",
                secrets.token_env
            )))
        }
    };

    let notes = connect_notes(cfg, secrets).await;
    Ok(SleepService::new(
        source,
        notes,
        ServiceOptions::from_config(cfg),
    ))
}

/// Notes store if enabled and reachable. Never fails: notes are optional.
pub async fn connect_notes(
    cfg: &AppConfig,
    secrets: &ResolvedSecrets,
) -> Option<Arc<dyn NotesStore>> {
    if !cfg.notes.enabled {
        tracing::info!("notes disabled by config");
        return None;
    }
    let Some(url) = secrets.database_url.as_deref() else {
        tracing::info!(
            database_url_env = %secrets.database_url_env,
            "notes database url not set; running without notes"
        );
        return None;
    };

    match slp_db::connect(url).await {
        Ok(pool) => Some(Arc::new(PgNotesStore::new(pool))),
        Err(e) => {
            tracing::warn!(error = %e, "notes database unreachable; running without notes");
            None
        }
    }
}
