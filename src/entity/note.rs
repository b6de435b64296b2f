// src/entity/note.rs
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A note saved against a whole prompt, from before notes were versioned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyNote {
    #[serde(default)]
    pub content: String,
    /// Milliseconds since the Unix epoch
    #[serde(default)]
    pub last_saved: i64,
}

impl LegacyNote {
    pub fn new(content: &str) -> Self {
        Self {
            content: content.trim().to_string(),
            last_saved: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// Legacy notes keyed by prompt id.
pub type NotesLegacyStore = BTreeMap<String, LegacyNote>;
