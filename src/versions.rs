//! Version history of a prompt.
//!
//! Versions are append-only: an edit always adds a version numbered one past
//! the highest existing number and makes it the default. Existing versions
//! are never changed or removed.

use chrono::Utc;
use serde_json::Value;
use tracing::info;

use crate::entity::{Metadata, NotesLegacyStore, PromptRecord, PromptType, Version, VersionView};
use crate::error::{Result, ShelfError};
use crate::library::{find_mut, required, PromptLibrary};
use crate::migration::first_version;
use crate::storage::KeyValueStore;

/// Replacement values for an edit.
#[derive(Debug, Clone)]
pub struct EditRequest {
    pub title: String,
    pub content: String,
    pub prompt_type: PromptType,
    pub notes: String,
}

impl PromptRecord {
    /// The version with the highest number.
    pub fn latest(&self) -> Result<&Version> {
        self.versions
            .iter()
            .max_by_key(|v| v.number)
            .ok_or_else(|| ShelfError::NoVersions(self.id.clone()))
    }

    /// The version numbered `number`.
    pub fn version(&self, number: u32) -> Result<&Version> {
        self.versions
            .iter()
            .find(|v| v.number == number)
            .ok_or_else(|| ShelfError::VersionNotFound {
                id: self.id.clone(),
                number,
            })
    }

    /// The default version, or the latest when the default is missing.
    pub fn effective_default(&self) -> Result<&Version> {
        match self.version(self.default_version_number) {
            Ok(version) => Ok(version),
            Err(_) => self.latest(),
        }
    }

    /// Copy the effective default into the flat legacy fields.
    ///
    /// Returns whether any field changed.
    pub fn refresh_flat_cache(&mut self) -> bool {
        let (title, content, prompt_type, metadata) = match self.effective_default() {
            Ok(v) => (
                v.title.clone(),
                v.content.clone(),
                v.prompt_type,
                v.metadata.clone(),
            ),
            Err(_) => return false,
        };

        let changed = self.title != title
            || self.content != content
            || self.prompt_type != prompt_type
            || self.metadata != metadata;

        self.title = title;
        self.content = content;
        self.prompt_type = prompt_type;
        self.metadata = metadata;
        changed
    }

    /// Version numbers in ascending order.
    pub fn version_numbers(&self) -> Vec<u32> {
        let mut numbers: Vec<u32> = self.versions.iter().map(|v| v.number).collect();
        numbers.sort_unstable();
        numbers
    }
}

/// What a reader should see for `record` right now.
///
/// Falls back to the flat fields and the legacy note only when the record
/// has no versions at all.
pub fn current_view(record: &PromptRecord, notes: &NotesLegacyStore) -> VersionView {
    match record.effective_default() {
        Ok(version) => VersionView::from(version),
        Err(_) => VersionView {
            title: record.title.clone(),
            content: record.content.clone(),
            prompt_type: record.prompt_type,
            metadata: record.metadata.clone(),
            notes: notes
                .get(&record.id)
                .map(|n| n.content.clone())
                .unwrap_or_default(),
        },
    }
}

impl<S: KeyValueStore> PromptLibrary<S> {
    /// Make version `number` the default for prompt `id`.
    pub fn set_default(&self, id: &str, number: u32) -> Result<()> {
        let mut records = self.load_records();
        let record = find_mut(&mut records, id)?;
        record.version(number)?;

        record.default_version_number = number;
        record.refresh_flat_cache();
        self.save_records(&records)?;

        info!(id, number, "default version changed");
        Ok(())
    }

    /// Current view of prompt `id`.
    pub fn view(&self, id: &str) -> Result<VersionView> {
        let record = self.get(id)?;
        Ok(current_view(&record, &self.load_notes()))
    }

    /// Append a version carrying the edit and make it the default.
    pub fn append_edit(&self, id: &str, edit: EditRequest) -> Result<Version> {
        let title = required("Title", &edit.title)?.to_string();
        let content = required("Content", &edit.content)?.to_string();

        let mut records = self.load_records();
        let legacy_note = self.load_notes().remove(id);
        let record = find_mut(&mut records, id)?;

        if record.versions.is_empty() {
            let notes = legacy_note.map(|n| n.content).unwrap_or_default();
            let first = first_version(
                &record.title,
                &record.content,
                record.prompt_type,
                record.metadata.clone(),
                notes,
            );
            record.versions.push(first);
            record.default_version_number = 1;
        }

        let number = record.latest()?.number + 1;
        let previous = record.effective_default()?;
        let now = Utc::now();
        let token_estimate = Some(self.config().tokens.estimate(&content));

        let metadata = match previous.metadata.clone().or_else(|| record.metadata.clone()) {
            Some(mut metadata) => {
                metadata.updated_at = Some(now);
                metadata.token_estimate = token_estimate;
                if metadata.created_at.is_none() {
                    metadata.created_at = Some(now);
                }
                if metadata.extra.contains_key("version") {
                    metadata.extra.insert("version".to_string(), Value::from(number));
                }
                metadata
            }
            None => Metadata {
                created_at: Some(now),
                updated_at: Some(now),
                token_estimate,
                ..Metadata::default()
            },
        };

        let version = Version {
            number,
            title,
            content,
            prompt_type: edit.prompt_type,
            metadata: Some(metadata),
            notes: edit.notes.trim().to_string(),
            created_at: previous.created_at,
            updated_at: now,
        };

        record.versions.push(version.clone());
        record.default_version_number = number;
        record.refresh_flat_cache();
        self.save_records(&records)?;

        info!(id, number, "appended version");
        Ok(version)
    }
}
