// src/entity/version.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Metadata, PromptType};

/// One immutable revision of a prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    #[serde(alias = "version")]
    pub number: u32,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(rename = "type", default)]
    pub prompt_type: PromptType,
    #[serde(default)]
    pub metadata: Option<Metadata>,
    /// Notes snapshot taken when this version was written
    #[serde(default)]
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The fields a reader sees for a prompt's current revision.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionView {
    pub title: String,
    pub content: String,
    #[serde(rename = "type")]
    pub prompt_type: PromptType,
    pub metadata: Option<Metadata>,
    pub notes: String,
}

impl From<&Version> for VersionView {
    fn from(version: &Version) -> Self {
        Self {
            title: version.title.clone(),
            content: version.content.clone(),
            prompt_type: version.prompt_type,
            metadata: version.metadata.clone(),
            notes: version.notes.clone(),
        }
    }
}
