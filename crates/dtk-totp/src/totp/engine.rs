//! Authenticator engine: owns the loaded config and the refresh ticker.
//!
//! The engine is either **Idle** (nothing loaded) or **Running** (a config is
//! loaded and exactly one ticker task re-derives the code every interval).
//! Each tick reads the clock afresh instead of counting ticks, so late or
//! skipped ticks never cause drift.
//!
//! Reload and teardown bump a generation number behind the emit gate and
//! abort the previous ticker task. A tick only emits while holding the gate
//! and only if its generation is still current, so no stale frame can reach
//! the presenter after a reload.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, Instant, MissedTickBehavior};

use crate::totp::clock::{Clock, SystemClock};
use crate::totp::core;
use crate::totp::presenter::Presenter;
use crate::totp::types::*;
use crate::totp::uri;

/// Thread-safe engine state shared with the host.
pub type TotpEngineState = Arc<Mutex<TotpEngine>>;

/// Lifecycle state of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineState {
    Idle,
    Running,
}

/// Everything one ticker generation needs to derive and emit a frame.
struct TickContext {
    generation: u64,
    gate: Arc<Mutex<u64>>,
    config: Arc<OtpConfig>,
    clock: Arc<dyn Clock>,
    presenter: Arc<dyn Presenter>,
    frames: Arc<watch::Sender<Option<CodeFrame>>>,
}

impl TickContext {
    fn derive(&self) -> Result<CodeFrame, TotpError> {
        let now = self.clock.now_unix()?;
        core::derive_frame(&self.config, now)
    }

    /// Deliver a result. Caller must hold the gate.
    fn emit(&self, result: Result<CodeFrame, TotpError>) {
        match result {
            Ok(frame) => {
                self.frames.send_replace(Some(frame.clone()));
                self.presenter.present(&frame);
            }
            Err(err) => {
                // The previous frame stays in `frames`; the next tick retries.
                log::warn!("TOTP tick failed (generation {}): {}", self.generation, err);
                self.presenter.report_error(&err);
            }
        }
    }

    async fn tick(&self) {
        let result = self.derive();
        let current = self.gate.lock().await;
        if *current != self.generation {
            log::trace!(
                "dropping tick from generation {} (current {})",
                self.generation,
                *current
            );
            return;
        }
        self.emit(result);
    }
}

fn spawn_ticker(ctx: TickContext, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval_at(Instant::now() + every, every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            ctx.tick().await;
        }
    })
}

/// Central authenticator engine.
pub struct TotpEngine {
    clock: Arc<dyn Clock>,
    presenter: Arc<dyn Presenter>,
    ticker_config: TickerConfig,
    config: Option<Arc<OtpConfig>>,
    /// Current generation; also serialises emission.
    gate: Arc<Mutex<u64>>,
    frames: Arc<watch::Sender<Option<CodeFrame>>>,
    ticker: Option<JoinHandle<()>>,
}

impl TotpEngine {
    /// Create an idle engine reading the system clock and ticking every second.
    pub fn new(presenter: Arc<dyn Presenter>) -> Self {
        let (frames, _) = watch::channel(None);
        Self {
            clock: Arc::new(SystemClock),
            presenter,
            ticker_config: TickerConfig::default(),
            config: None,
            gate: Arc::new(Mutex::new(0)),
            frames: Arc::new(frames),
            ticker: None,
        }
    }

    /// Builder: replace the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Builder: replace the ticker settings.
    pub fn with_ticker_config(mut self, ticker_config: TickerConfig) -> Result<Self, TotpError> {
        ticker_config.validate()?;
        self.ticker_config = ticker_config;
        Ok(self)
    }

    /// Wrap in `Arc<Mutex<_>>` for sharing with the host.
    pub fn into_state(self) -> TotpEngineState {
        Arc::new(Mutex::new(self))
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    //  Lifecycle
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Parse a provisioning URI and load it.
    ///
    /// On a parse error nothing changes: a running ticker keeps running with
    /// its current config.
    pub async fn load_uri(&mut self, uri: &str) -> Result<(), TotpError> {
        let config = uri::parse_otpauth_uri(uri)?;
        self.load(config).await;
        Ok(())
    }

    /// Load a config (Idle → Running, or Running → Running on reload).
    ///
    /// The previous ticker is cancelled before the new one is spawned; the
    /// current frame is emitted immediately. A frame left over from the
    /// previous config is cleared first, so if the first derivation fails
    /// [`current_frame`](Self::current_frame) is `None` until a tick succeeds.
    pub async fn load(&mut self, config: OtpConfig) {
        let gate = Arc::clone(&self.gate);
        let mut current = gate.lock().await;
        *current += 1;
        if let Some(previous) = self.ticker.take() {
            previous.abort();
        }
        self.frames.send_replace(None);

        let config = Arc::new(config);
        let ctx = TickContext {
            generation: *current,
            gate: Arc::clone(&self.gate),
            config: Arc::clone(&config),
            clock: Arc::clone(&self.clock),
            presenter: Arc::clone(&self.presenter),
            frames: Arc::clone(&self.frames),
        };
        ctx.emit(ctx.derive());

        log::info!(
            "authenticator loaded '{}' (generation {})",
            config.display_name(),
            *current
        );
        self.config = Some(config);
        self.ticker = Some(spawn_ticker(ctx, self.ticker_config.interval()));
    }

    /// Stop the ticker and drop the config (Running → Idle).
    pub async fn teardown(&mut self) {
        let gate = Arc::clone(&self.gate);
        let mut current = gate.lock().await;
        *current += 1;
        if let Some(previous) = self.ticker.take() {
            previous.abort();
            log::info!("authenticator stopped (generation {})", *current);
        }
        self.config = None;
        self.frames.send_replace(None);
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    //  Queries
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    pub fn state(&self) -> EngineState {
        if self.ticker.is_some() {
            EngineState::Running
        } else {
            EngineState::Idle
        }
    }

    /// The loaded config, if running.
    pub fn config(&self) -> Option<&OtpConfig> {
        self.config.as_deref()
    }

    /// The last successfully emitted frame.
    pub fn current_frame(&self) -> Option<CodeFrame> {
        self.frames.borrow().clone()
    }

    /// Watch successive frames (`None` after teardown).
    pub fn subscribe(&self) -> watch::Receiver<Option<CodeFrame>> {
        self.frames.subscribe()
    }

    /// Derive the frame for "now" without emitting it (e.g. for copy-to-clipboard).
    pub fn generate_code(&self) -> Result<CodeFrame, TotpError> {
        let config = self.require_config()?;
        let now = self.clock.now_unix()?;
        core::derive_frame(config, now)
    }

    /// Check a user-supplied code against the loaded config.
    pub fn verify_code(&self, code: &str, drift_window: u32) -> Result<VerifyResult, TotpError> {
        let config = self.require_config()?;
        let now = self.clock.now_unix()?;
        core::verify_code_at(config, code, drift_window, now)
    }

    fn require_config(&self) -> Result<&OtpConfig, TotpError> {
        self.config
            .as_deref()
            .ok_or_else(|| TotpError::new(TotpErrorKind::NotRunning, "no authenticator loaded"))
    }
}

impl Drop for TotpEngine {
    fn drop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::totp::core;
    use crate::totp::presenter::PresenterEvent;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Unix time that starts a 30s step: remaining = 30 at load.
    const BASE: u64 = 1_111_111_110;

    /// Clock driven by tokio's (pausable) time.
    struct PausedClock {
        base: u64,
        start: Instant,
        fail_at: Option<u64>,
    }

    impl PausedClock {
        fn new(base: u64) -> Self {
            Self { base, start: Instant::now(), fail_at: None }
        }
    }

    impl Clock for PausedClock {
        fn now_unix(&self) -> Result<u64, TotpError> {
            let elapsed = self.start.elapsed().as_secs();
            if self.fail_at == Some(elapsed) {
                return Err(TotpError::new(TotpErrorKind::ClockUnavailable, "clock glitch"));
            }
            Ok(self.base + elapsed)
        }
    }

    #[derive(Default)]
    struct Recorder {
        events: std::sync::Mutex<Vec<PresenterEvent>>,
        calls: AtomicU64,
    }

    impl Recorder {
        fn events(&self) -> Vec<PresenterEvent> {
            self.events.lock().unwrap().clone()
        }

        fn frames(&self) -> Vec<CodeFrame> {
            self.events()
                .into_iter()
                .filter_map(|e| match e {
                    PresenterEvent::Frame(f) => Some(f),
                    PresenterEvent::Error(_) => None,
                })
                .collect()
        }
    }

    impl Presenter for Recorder {
        fn present(&self, frame: &CodeFrame) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.events.lock().unwrap().push(PresenterEvent::Frame(frame.clone()));
        }

        fn report_error(&self, error: &TotpError) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.events.lock().unwrap().push(PresenterEvent::Error(error.clone()));
        }
    }

    fn config_a() -> OtpConfig {
        OtpConfig::new(b"12345678901234567890".to_vec(), 6, 30, Algorithm::Sha1).unwrap()
    }

    fn config_b() -> OtpConfig {
        OtpConfig::new(b"another shared secret".to_vec(), 8, 30, Algorithm::Sha256).unwrap()
    }

    fn engine_with(clock: PausedClock) -> (TotpEngine, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let engine = TotpEngine::new(recorder.clone()).with_clock(Arc::new(clock));
        (engine, recorder)
    }

    async fn run_for(millis: u64) {
        time::sleep(Duration::from_millis(millis)).await;
    }

    // ── Lifecycle ────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn starts_idle() {
        let (engine, recorder) = engine_with(PausedClock::new(BASE));
        assert_eq!(engine.state(), EngineState::Idle);
        assert!(engine.current_frame().is_none());
        assert_eq!(engine.generate_code().unwrap_err().kind, TotpErrorKind::NotRunning);
        run_for(3_500).await;
        assert!(recorder.events().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn load_emits_immediately_then_every_second() {
        let (mut engine, recorder) = engine_with(PausedClock::new(BASE));
        engine.load(config_a()).await;
        assert_eq!(engine.state(), EngineState::Running);
        assert_eq!(recorder.frames().len(), 1);

        run_for(5_500).await;
        let frames = recorder.frames();
        assert_eq!(frames.len(), 6);
        for (i, frame) in frames.iter().enumerate() {
            let now = BASE + i as u64;
            assert_eq!(frame.code, core::derive_code(&config_a(), now).unwrap());
            assert_eq!(frame.remaining_seconds, 30 - i as u32);
        }
        assert_eq!(engine.current_frame().as_ref(), frames.last());
    }

    #[tokio::test(start_paused = true)]
    async fn reload_keeps_exactly_one_ticker() {
        let (mut engine, recorder) = engine_with(PausedClock::new(BASE));
        engine.load(config_a()).await;
        engine.load(config_b()).await;

        run_for(10_500).await;
        // Two immediate emissions plus ten ticks from a single ticker.
        assert_eq!(recorder.calls.load(Ordering::SeqCst), 12);

        let frames = recorder.frames();
        assert_eq!(frames[0].code.len(), 6);
        for frame in &frames[1..] {
            assert_eq!(frame.code.len(), 8, "stale frame from the first config");
        }
        assert_eq!(engine.config(), Some(&config_b()));
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_stops_emissions() {
        let (mut engine, recorder) = engine_with(PausedClock::new(BASE));
        engine.load(config_a()).await;
        run_for(2_500).await;
        assert_eq!(recorder.frames().len(), 3);

        engine.teardown().await;
        assert_eq!(engine.state(), EngineState::Idle);
        assert!(engine.config().is_none());
        assert!(engine.current_frame().is_none());

        run_for(5_000).await;
        assert_eq!(recorder.frames().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_engine_stops_ticker() {
        let (mut engine, recorder) = engine_with(PausedClock::new(BASE));
        engine.load(config_a()).await;
        drop(engine);
        run_for(3_500).await;
        assert_eq!(recorder.frames().len(), 1);
    }

    // ── Timing ───────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn remaining_seconds_counts_down_and_resets() {
        // Start 25s into a step so the run crosses a boundary.
        let (mut engine, recorder) = engine_with(PausedClock::new(BASE + 25));
        engine.load(config_a()).await;
        run_for(40_500).await;

        let frames = recorder.frames();
        assert_eq!(frames.len(), 41);
        let mut resets = 0;
        for pair in frames.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            assert!(next.remaining_seconds >= 1 && next.remaining_seconds <= 30);
            if next.remaining_seconds < prev.remaining_seconds {
                assert_eq!(next.remaining_seconds, prev.remaining_seconds - 1);
                assert_eq!(next.counter, prev.counter);
            } else {
                assert_eq!(prev.remaining_seconds, 1);
                assert_eq!(next.remaining_seconds, 30);
                assert_eq!(next.counter, prev.counter + 1);
                resets += 1;
            }
            assert!(next.progress >= 0.0 && next.progress < 1.0);
        }
        assert_eq!(resets, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn custom_interval_is_honoured() {
        let recorder = Arc::new(Recorder::default());
        let mut engine = TotpEngine::new(recorder.clone())
            .with_clock(Arc::new(PausedClock::new(BASE)))
            .with_ticker_config(TickerConfig { interval_ms: 250 })
            .unwrap();
        engine.load(config_a()).await;
        run_for(1_100).await;
        assert_eq!(recorder.frames().len(), 5);
    }

    #[test]
    fn zero_interval_is_rejected() {
        let engine = TotpEngine::new(Arc::new(Recorder::default()))
            .with_ticker_config(TickerConfig { interval_ms: 0 });
        assert_eq!(engine.err().map(|e| e.kind), Some(TotpErrorKind::InvalidTickerConfig));
    }

    // ── Failures ─────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn tick_failure_is_reported_and_ticking_continues() {
        let mut clock = PausedClock::new(BASE);
        clock.fail_at = Some(2);
        let (mut engine, recorder) = engine_with(clock);
        engine.load(config_a()).await;

        run_for(2_500).await;
        let events = recorder.events();
        assert_eq!(events.len(), 3);
        assert!(matches!(
            &events[2],
            PresenterEvent::Error(e) if e.kind == TotpErrorKind::ClockUnavailable
        ));
        // The frame from t+1 stays current.
        let shown = engine.current_frame().unwrap();
        assert_eq!(shown.remaining_seconds, 29);

        run_for(1_000).await;
        let frames = recorder.frames();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[2].remaining_seconds, 27);
        assert_eq!(engine.state(), EngineState::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn reload_with_failed_first_derivation_clears_old_frame() {
        let mut clock = PausedClock::new(BASE);
        clock.fail_at = Some(1);
        let (mut engine, recorder) = engine_with(clock);
        engine.load(config_a()).await;
        assert_eq!(engine.current_frame().map(|f| f.code.len()), Some(6));

        run_for(1_500).await;
        engine.load(config_b()).await;
        assert!(engine.current_frame().is_none());
        assert_eq!(engine.state(), EngineState::Running);
        assert!(matches!(
            recorder.events().last(),
            Some(PresenterEvent::Error(e)) if e.kind == TotpErrorKind::ClockUnavailable
        ));

        run_for(1_100).await;
        let frame = engine.current_frame().unwrap();
        assert_eq!(frame.code, core::derive_code(&config_b(), BASE + 2).unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_uri_leaves_running_ticker_untouched() {
        let (mut engine, recorder) = engine_with(PausedClock::new(BASE));
        engine
            .load_uri("otpauth://totp/Acme:alice?secret=GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ")
            .await
            .unwrap();
        let loaded = engine.config().cloned();

        let err = engine
            .load_uri("otpauth://hotp/Acme:alice?secret=JBSWY3DPEHPK3PXP&counter=0")
            .await
            .unwrap_err();
        assert_eq!(err.kind, TotpErrorKind::InvalidUri);
        assert_eq!(engine.state(), EngineState::Running);
        assert_eq!(engine.config().cloned(), loaded);

        run_for(2_500).await;
        assert_eq!(recorder.frames().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_generation_tick_is_dropped() {
        let recorder = Arc::new(Recorder::default());
        let (frames, _) = watch::channel(None);
        let ctx = TickContext {
            generation: 1,
            gate: Arc::new(Mutex::new(2)),
            config: Arc::new(config_a()),
            clock: Arc::new(PausedClock::new(BASE)),
            presenter: recorder.clone(),
            frames: Arc::new(frames),
        };
        ctx.tick().await;
        assert!(recorder.events().is_empty());
        assert!(ctx.frames.borrow().is_none());

        *ctx.gate.lock().await = 1;
        ctx.tick().await;
        assert_eq!(recorder.frames().len(), 1);
    }

    // ── On-demand derivation ─────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn generate_and_verify_against_loaded_config() {
        let (mut engine, _recorder) = engine_with(PausedClock::new(BASE));
        engine.load(config_a()).await;

        let frame = engine.generate_code().unwrap();
        assert_eq!(frame.code, core::derive_code(&config_a(), BASE).unwrap());

        let vr = engine.verify_code(&frame.code, 0).unwrap();
        assert!(vr.valid);

        let previous = core::derive_code(&config_a(), BASE - 30).unwrap();
        let vr = engine.verify_code(&previous, 1).unwrap();
        assert!(vr.valid);
        assert_eq!(vr.drift, -1);
    }

    #[tokio::test(start_paused = true)]
    async fn shared_state_and_subscription() {
        let recorder = Arc::new(Recorder::default());
        let state = TotpEngine::new(recorder.clone())
            .with_clock(Arc::new(PausedClock::new(BASE)))
            .into_state();
        let mut rx = state.lock().await.subscribe();

        state
            .lock()
            .await
            .load_uri("otpauth://totp/Acme:alice@example.com?secret=JBSWY3DPEHPK3PXP")
            .await
            .unwrap();
        rx.changed().await.unwrap();
        let first = rx.borrow_and_update().clone().unwrap();
        assert_eq!(first.remaining_seconds, 30);

        rx.changed().await.unwrap();
        let second = rx.borrow_and_update().clone().unwrap();
        assert_eq!(second.remaining_seconds, 29);

        state.lock().await.teardown().await;
        assert_eq!(state.lock().await.state(), EngineState::Idle);
    }
}
