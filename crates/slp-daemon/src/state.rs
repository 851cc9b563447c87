//! Shared state for slp-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum. The state is read-only
//! after boot; everything mutable lives behind the service's stores.

use slp_config::AppConfig;
use slp_runtime::SleepService;
use slp_schemas::FallbackPolicy;

/// Static build metadata included in health responses.
#[derive(Clone, Debug)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

#[derive(Clone)]
pub struct AppState {
    pub build: BuildInfo,
    pub service: SleepService,
    /// Used when a request names no `fallback`.
    pub default_fallback: FallbackPolicy,
    /// Window used when a request names no dates.
    pub default_range_days: u32,
    pub config_hash: String,
}

impl AppState {
    pub fn new(service: SleepService, app: &AppConfig, config_hash: impl Into<String>) -> Self {
        Self {
            build: BuildInfo {
                service: "slp-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            service,
            default_fallback: app.dashboard.fallback,
            default_range_days: app.dashboard.default_range_days,
            config_hash: config_hash.into(),
        }
    }
}

/// Monotonically increasing uptime since first call (process lifetime).
pub fn uptime_secs() -> u64 {
    static START: std::sync::OnceLock<std::time::Instant> = std::sync::OnceLock::new();
    START
        .get_or_init(std::time::Instant::now)
        .elapsed()
        .as_secs()
}
