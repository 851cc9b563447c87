//! slp-daemon entry point.
//!
//! Thin: load config, set up tracing, wire the service, attach middleware,
//! and serve. Handlers live in `routes.rs`; shared state in `state.rs`.

use std::{net::SocketAddr, path::Path, sync::Arc};

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use slp_config::{
    load_layered_yaml, load_layered_yaml_from_strings, report_unused_keys, resolve_secrets,
    AppConfig, LoadedConfig, UnusedKeyPolicy,
};
use slp_daemon::{routes, state};
use slp_runtime::{build_service, source_mode_for};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, Level};

const DEFAULT_CONFIG_PATH: &str = "config/base.yaml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    let loaded = load_config_from_env()?;
    let app = loaded.app_config()?;
    init_tracing(&app);

    let unused = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn)?;
    for pointer in &unused.unused_leaf_pointers {
        tracing::warn!(pointer = %pointer, "CONFIG_UNUSED_KEYS: no code reads this key");
    }

    // A default policy that never falls back on failure needs a token at boot.
    let secrets = resolve_secrets(&loaded.config_json, source_mode_for(app.dashboard.fallback))?;
    let service = build_service(&app, &secrets).await?;
    info!(
        config_hash = %loaded.config_hash,
        upstream = service.source_name(),
        notes = service.notes_store().is_some(),
        fallback = app.dashboard.fallback.as_str(),
        "service wired"
    );

    let shared = Arc::new(state::AppState::new(service, &app, loaded.config_hash.clone()));

    let app_router = routes::build_router(Arc::clone(&shared))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_localhost_only());

    let addr = match bind_addr_from_env() {
        Some(addr) => addr,
        None => app.bind_addr()?,
    };
    info!("slp-daemon listening on http://{}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app_router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server crashed")?;

    Ok(())
}

/// `SLP_CONFIG` is a comma-separated list of YAML paths in merge order.
/// Unset: `config/base.yaml` if present, else built-in defaults.
fn load_config_from_env() -> anyhow::Result<LoadedConfig> {
    match std::env::var("SLP_CONFIG") {
        Ok(raw) if !raw.trim().is_empty() => {
            let paths: Vec<&str> = raw
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .collect();
            load_layered_yaml(&paths)
        }
        _ if Path::new(DEFAULT_CONFIG_PATH).exists() => load_layered_yaml(&[DEFAULT_CONFIG_PATH]),
        _ => load_layered_yaml_from_strings(&[]),
    }
}

fn init_tracing(app: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&app.diagnostics.log_filter))
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn bind_addr_from_env() -> Option<SocketAddr> {
    std::env::var("SLP_DAEMON_ADDR").ok()?.parse().ok()
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown requested");
    }
}

/// CORS: allow only localhost origins.
fn cors_localhost_only() -> CorsLayer {
    let allowed_origins = [
        "http://localhost",
        "http://127.0.0.1",
        "http://localhost:3000",
        "http://127.0.0.1:3000",
        "http://localhost:5173",
        "http://127.0.0.1:5173",
    ];

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers(tower_http::cors::Any)
}
