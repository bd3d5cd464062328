//! # DevToolkit host
//!
//! Wires the authenticator engine (`dtk-totp`) and the request tester
//! (`dtk-curl`) into one host with shared configuration and logging.

pub mod config;
pub mod error;
pub mod logging;
pub mod toolkit;

pub use config::ToolkitConfig;
pub use error::ToolkitError;
pub use logging::init_logging;
pub use toolkit::{LogPresenter, Toolkit, ToolkitState};
