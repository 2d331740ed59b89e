use tilewalk_engine::{parse_map_id, LoopConfig, DEFAULT_START_MAP};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const START_MAP_ENV_VAR: &str = "TILEWALK_START_MAP";

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
}

pub(crate) fn build_app() -> AppWiring {
    init_tracing();
    info!("=== Tilewalk Startup ===");

    let config = LoopConfig {
        window_title: format!("Tilewalk {}", env!("CARGO_PKG_VERSION")),
        start_map: parse_start_map(std::env::var(START_MAP_ENV_VAR).ok()),
        ..LoopConfig::default()
    };

    AppWiring { config }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

/// Invalid or blank overrides fall back to the default map.
fn parse_start_map(raw: Option<String>) -> String {
    let Some(raw) = raw else {
        return DEFAULT_START_MAP.to_string();
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return DEFAULT_START_MAP.to_string();
    }
    match parse_map_id(trimmed) {
        Ok(map_id) => map_id.to_string(),
        Err(error) => {
            warn!(
                env_var = START_MAP_ENV_VAR,
                value = trimmed,
                error = %error,
                "invalid start map override; falling back to default"
            );
            DEFAULT_START_MAP.to_string()
        }
    }
}
