//! Log subscriber setup.
//!
//! The member crates log through the `log` facade; the `tracing-log` bridge
//! forwards those records into the subscriber installed here.

use tracing_subscriber::EnvFilter;

use crate::config::ToolkitConfig;

const FALLBACK_FILTER: &str = "info";

/// Pick the filter: `RUST_LOG`, else the configured directives, else `info`.
fn build_filter(env_directives: Option<String>, configured: &str) -> EnvFilter {
    env_directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .or_else(|| EnvFilter::try_new(configured).ok())
        .unwrap_or_else(|| EnvFilter::new(FALLBACK_FILTER))
}

/// Install the global subscriber.
///
/// Returns `false` if one was already installed; the existing one is kept.
pub fn init_logging(config: &ToolkitConfig) -> bool {
    let filter = build_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok(), &config.log_filter);
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    let installed = if config.log_json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    match installed {
        Ok(()) => {
            tracing::debug!(json = config.log_json, "logging initialised");
            true
        }
        Err(e) => {
            tracing::debug!("logging already initialised: {}", e);
            false
        }
    }
}
