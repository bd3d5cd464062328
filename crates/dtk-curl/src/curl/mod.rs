//! cURL crate: sub-modules.

pub mod types;
pub mod parser;
pub mod request;
pub mod format;
pub mod history;

// Re-export top-level items for convenience.
pub use types::*;
pub use parser::parse_curl;
pub use request::dispatch;
pub use format::format_json;
pub use history::{RequestHistory, SavedRequest, HISTORY_LIMIT};
