//! Presenter seam: where refreshed codes and tick errors are delivered.
//!
//! The engine calls the presenter from its ticker task, one call at a time.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::totp::types::*;

/// Receives one frame per tick, or an error notification when a tick fails.
pub trait Presenter: Send + Sync {
    fn present(&self, frame: &CodeFrame);

    /// A failed tick. The previously presented frame should stay on screen.
    fn report_error(&self, error: &TotpError);
}

/// Event forwarded by [`ChannelPresenter`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum PresenterEvent {
    Frame(CodeFrame),
    Error(TotpError),
}

/// Forwards presenter calls over an unbounded channel, e.g. to a UI bridge.
#[derive(Debug, Clone)]
pub struct ChannelPresenter {
    tx: mpsc::UnboundedSender<PresenterEvent>,
}

impl ChannelPresenter {
    /// Create a presenter and the receiving end of its channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PresenterEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: PresenterEvent) {
        if self.tx.send(event).is_err() {
            log::debug!("presenter channel closed; dropping event");
        }
    }
}

impl Presenter for ChannelPresenter {
    fn present(&self, frame: &CodeFrame) {
        self.send(PresenterEvent::Frame(frame.clone()));
    }

    fn report_error(&self, error: &TotpError) {
        self.send(PresenterEvent::Error(error.clone()));
    }
}
