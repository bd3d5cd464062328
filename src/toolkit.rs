//! Host service: owns the authenticator engine, the request tester's HTTP
//! client and its request history, built from one [`ToolkitConfig`].

use std::sync::Arc;
use std::time::Duration;

use dtk_curl::curl::{self, ParsedRequest, RequestHistory, ResponseSummary, SavedRequest};
use dtk_totp::totp::{
    CodeFrame, EngineState, Presenter, TotpEngine, TotpEngineState, TotpError, VerifyResult,
};
use tokio::sync::Mutex;

use crate::config::ToolkitConfig;
use crate::error::ToolkitError;

/// Shared host state.
pub type ToolkitState = Arc<Mutex<Toolkit>>;

/// Presenter that writes refreshes to the log. Codes are never logged.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogPresenter;

impl Presenter for LogPresenter {
    fn present(&self, frame: &CodeFrame) {
        tracing::debug!(
            counter = frame.counter,
            remaining = frame.remaining_seconds,
            "authenticator refreshed"
        );
    }

    fn report_error(&self, error: &TotpError) {
        tracing::warn!(kind = ?error.kind, "authenticator refresh failed: {}", error.message);
    }
}

pub struct Toolkit {
    config: ToolkitConfig,
    authenticator: TotpEngineState,
    http: reqwest::Client,
    requests: Mutex<RequestHistory>,
}

impl Toolkit {
    /// Build the host with a caller-supplied presenter (e.g. a UI bridge).
    pub fn new(config: ToolkitConfig, presenter: Arc<dyn Presenter>) -> Result<Self, ToolkitError> {
        config.validate()?;

        let authenticator = TotpEngine::new(presenter)
            .with_ticker_config(config.ticker.clone())?
            .into_state();

        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(config.user_agent.as_str());
        if !config.use_system_proxy {
            builder = builder.no_proxy();
        }
        let http = builder.build()?;

        tracing::info!(
            interval_ms = config.ticker.interval_ms,
            timeout_secs = config.request_timeout_secs,
            "toolkit ready"
        );
        Ok(Self {
            config,
            authenticator,
            http,
            requests: Mutex::new(RequestHistory::new()),
        })
    }

    /// Build the host with refreshes going to the log.
    pub fn with_log_presenter(config: ToolkitConfig) -> Result<Self, ToolkitError> {
        Self::new(config, Arc::new(LogPresenter))
    }

    pub fn into_state(self) -> ToolkitState {
        Arc::new(Mutex::new(self))
    }

    pub fn config(&self) -> &ToolkitConfig {
        &self.config
    }

    /// Handle to the engine, for callers that drive it directly.
    pub fn authenticator(&self) -> TotpEngineState {
        Arc::clone(&self.authenticator)
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    //  Authenticator
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Load a provisioning URI and return the first frame, if one could be derived.
    pub async fn load_authenticator(&self, uri: &str) -> Result<Option<CodeFrame>, ToolkitError> {
        let mut engine = self.authenticator.lock().await;
        engine.load_uri(uri).await?;
        Ok(engine.current_frame())
    }

    pub async fn stop_authenticator(&self) {
        self.authenticator.lock().await.teardown().await;
    }

    pub async fn authenticator_state(&self) -> EngineState {
        self.authenticator.lock().await.state()
    }

    pub async fn current_code(&self) -> Result<CodeFrame, ToolkitError> {
        Ok(self.authenticator.lock().await.generate_code()?)
    }

    pub async fn verify_code(&self, code: &str, drift_window: u32) -> Result<VerifyResult, ToolkitError> {
        Ok(self.authenticator.lock().await.verify_code(code, drift_window)?)
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    //  Request tester
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    pub fn parse_request(&self, command: &str) -> Result<ParsedRequest, ToolkitError> {
        Ok(curl::parse_curl(command)?)
    }

    /// Record a curl command in the history, then parse and send it.
    pub async fn send_request(&self, command: &str) -> Result<ResponseSummary, ToolkitError> {
        self.requests.lock().await.record(command);
        let parsed = self.parse_request(command)?;
        let summary = curl::dispatch(&self.http, &parsed).await?;
        tracing::info!(
            method = %parsed.method,
            status = summary.status,
            elapsed_ms = summary.elapsed_ms,
            "request tester dispatch complete"
        );
        Ok(summary)
    }

    pub fn format_json(&self, input: &str) -> Result<String, ToolkitError> {
        Ok(curl::format_json(input)?)
    }

    /// Snapshot of recent commands and saved requests.
    pub async fn request_history(&self) -> RequestHistory {
        self.requests.lock().await.clone()
    }

    pub async fn save_to_collection(&self, name: &str, command: &str) -> Result<SavedRequest, ToolkitError> {
        Ok(self.requests.lock().await.save_to_collection(name, command)?)
    }

    pub async fn delete_collection_item(&self, id: u64) -> bool {
        self.requests.lock().await.delete_collection_item(id)
    }
}
