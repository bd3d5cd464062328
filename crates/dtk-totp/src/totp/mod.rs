//! TOTP crate: sub-modules.

pub mod types;
pub mod secret;
pub mod core;
pub mod uri;
pub mod clock;
pub mod presenter;
pub mod engine;

// Re-export top-level items for convenience.
pub use types::*;
pub use clock::{Clock, SystemClock};
pub use presenter::{ChannelPresenter, Presenter, PresenterEvent};
pub use engine::{EngineState, TotpEngine, TotpEngineState};
