//! Host configuration, loaded from a JSON file.
//!
//! Every field has a default, so an empty object (or a missing file) yields a
//! working configuration.

use std::fs;
use std::path::Path;

use dtk_totp::totp::TickerConfig;
use serde::{Deserialize, Serialize};

use crate::error::ToolkitError;

/// Top-level host configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolkitConfig {
    /// `EnvFilter` directives used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    /// Emit JSON log lines instead of human-readable ones.
    #[serde(default)]
    pub log_json: bool,
    /// Authenticator refresh ticker.
    #[serde(default)]
    pub ticker: TickerConfig,
    /// Timeout for request-tester dispatches, in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// `User-Agent` sent when a command does not set one.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Honour `HTTP_PROXY`/`HTTPS_PROXY` for request-tester dispatches.
    #[serde(default = "default_use_system_proxy")]
    pub use_system_proxy: bool,
}

fn default_log_filter() -> String {
    "info".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("devtoolkit/{}", env!("CARGO_PKG_VERSION"))
}

fn default_use_system_proxy() -> bool {
    true
}

impl Default for ToolkitConfig {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
            log_json: false,
            ticker: TickerConfig::default(),
            request_timeout_secs: default_request_timeout(),
            user_agent: default_user_agent(),
            use_system_proxy: default_use_system_proxy(),
        }
    }
}

impl ToolkitConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ToolkitError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`; a missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ToolkitError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!("no config at {}; using defaults", path.display());
            return Ok(Self::default());
        }
        let data = fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }

    /// Write as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ToolkitError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ToolkitError> {
        if self.ticker.interval_ms == 0 {
            return Err(ToolkitError::Config(
                "ticker.intervalMs must be greater than zero".into(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(ToolkitError::Config(
                "requestTimeoutSecs must be greater than zero".into(),
            ));
        }
        if self.user_agent.trim().is_empty() {
            return Err(ToolkitError::Config("userAgent must not be empty".into()));
        }
        Ok(())
    }
}
