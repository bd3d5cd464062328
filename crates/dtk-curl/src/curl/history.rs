//! Recently sent commands and named, saved requests.
//!
//! Recent commands are kept most-recent-first with no duplicates, capped at
//! [`HISTORY_LIMIT`]. Saved requests keep insertion order and are removed by
//! id. The whole store serialises with serde so the host can persist it.

use serde::{Deserialize, Serialize};

use crate::curl::types::*;

/// Maximum number of recent commands kept.
pub const HISTORY_LIMIT: usize = 10;

/// Characters of a command shown in a list preview.
pub const PREVIEW_CHARS: usize = 30;

/// A named request in a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedRequest {
    pub id: u64,
    pub name: String,
    pub command: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestHistory {
    #[serde(default)]
    recent: Vec<String>,
    #[serde(default)]
    collections: Vec<SavedRequest>,
    /// Last id handed out.
    #[serde(default)]
    last_id: u64,
}

impl RequestHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent first.
    pub fn recent(&self) -> &[String] {
        &self.recent
    }

    pub fn collections(&self) -> &[SavedRequest] {
        &self.collections
    }

    pub fn saved(&self, id: u64) -> Option<&SavedRequest> {
        self.collections.iter().find(|item| item.id == id)
    }

    /// Move `command` to the front of the recent list. Blank commands are
    /// ignored and `false` is returned.
    pub fn record(&mut self, command: &str) -> bool {
        let command = command.trim();
        if command.is_empty() {
            return false;
        }
        self.recent.retain(|c| c != command);
        self.recent.insert(0, command.to_string());
        self.recent.truncate(HISTORY_LIMIT);
        true
    }

    pub fn clear_recent(&mut self) {
        self.recent.clear();
    }

    /// Add a named request to the collection.
    pub fn save_to_collection(&mut self, name: &str, command: &str) -> Result<SavedRequest, CurlError> {
        let command = command.trim();
        if command.is_empty() {
            return Err(CurlError::new(CurlErrorKind::EmptyCommand, "enter a curl command first"));
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(CurlError::new(CurlErrorKind::EmptyName, "saved requests need a name"));
        }

        self.last_id += 1;
        let item = SavedRequest {
            id: self.last_id,
            name: name.to_string(),
            command: command.to_string(),
        };
        log::debug!("saved request {} as '{}'", item.id, item.name);
        self.collections.push(item.clone());
        Ok(item)
    }

    /// Remove a saved request; `false` when no item has that id.
    pub fn delete_collection_item(&mut self, id: u64) -> bool {
        let before = self.collections.len();
        self.collections.retain(|item| item.id != id);
        self.collections.len() != before
    }
}

/// Shorten a command for list display: the first [`PREVIEW_CHARS`]
/// characters followed by `...`.
pub fn preview(command: &str) -> String {
    if command.chars().count() <= PREVIEW_CHARS {
        return command.to_string();
    }
    let head: String = command.chars().take(PREVIEW_CHARS).collect();
    format!("{}...", head)
}
