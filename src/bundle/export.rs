use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::stats::{compute_statistics, Statistics};
use super::validate::validate_bundle;
use crate::entity::{NotesLegacyStore, PromptRecord};
use crate::error::{Result, ShelfError};
use crate::library::PromptLibrary;
use crate::storage::KeyValueStore;

/// A portable snapshot of the whole library.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBundle {
    pub format_version: String,
    pub exported_at: DateTime<Utc>,
    pub statistics: Statistics,
    pub records: Vec<PromptRecord>,
    pub legacy_notes: NotesLegacyStore,
}

impl ExportBundle {
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Download name for an export taken at `at`.
pub fn export_filename(at: DateTime<Utc>) -> String {
    format!("prompt-library-export-{}.json", at.format("%Y-%m-%dT%H-%M-%S"))
}

impl<S: KeyValueStore> PromptLibrary<S> {
    /// Build an export bundle and check it against the import rules.
    ///
    /// A bundle that its own import would reject is never handed out.
    pub fn export(&self) -> Result<ExportBundle> {
        let records = self.load_records();
        let bundle = ExportBundle {
            format_version: self.config().export_format_version.clone(),
            exported_at: Utc::now(),
            statistics: compute_statistics(&records),
            records,
            legacy_notes: self.load_notes(),
        };

        let value = serde_json::to_value(&bundle)?;
        validate_bundle(&value).map_err(|e| {
            error!(error = %e, "export failed its own validation");
            match e {
                ShelfError::Validation(reason) => ShelfError::Export(reason),
                other => ShelfError::Export(other.to_string()),
            }
        })?;

        info!(
            prompts = bundle.statistics.total_prompts,
            notes = bundle.legacy_notes.len(),
            "exported library"
        );
        Ok(bundle)
    }

    /// The export as pretty-printed JSON.
    pub fn export_json(&self) -> Result<String> {
        self.export()?.to_json_pretty()
    }
}
