use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::validate::{field, validate_bundle, FORMAT_VERSION_FIELDS, NOTES_FIELDS, RECORDS_FIELDS};
use crate::entity::{NotesLegacyStore, PromptRecord};
use crate::error::{Result, ShelfError};
use crate::library::PromptLibrary;
use crate::migration::migrate_records;
use crate::storage::{keys, KeyValueStore};

// Backup slot content meaning "the key was absent"
const ABSENT: &str = "null";

/// How an import combines with the existing library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeStrategy {
    /// Union the bundle with the library
    Merge,
    /// Discard the library and install the bundle
    Replace,
}

impl fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeStrategy::Merge => write!(f, "merge"),
            MergeStrategy::Replace => write!(f, "replace"),
        }
    }
}

impl FromStr for MergeStrategy {
    type Err = ShelfError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "merge" => Ok(MergeStrategy::Merge),
            "replace" => Ok(MergeStrategy::Replace),
            other => Err(ShelfError::validation(format!(
                "Unknown import strategy \"{}\" (expected merge or replace)",
                other
            ))),
        }
    }
}

/// Answer to "some incoming prompts already exist".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Resolution {
    KeepExisting,
    KeepImport,
    Cancel,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::KeepExisting => write!(f, "keep-existing"),
            Resolution::KeepImport => write!(f, "keep-import"),
            Resolution::Cancel => write!(f, "cancel"),
        }
    }
}

impl FromStr for Resolution {
    type Err = ShelfError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "keep-existing" | "existing" => Ok(Resolution::KeepExisting),
            "keep-import" | "import" => Ok(Resolution::KeepImport),
            "cancel" => Ok(Resolution::Cancel),
            other => Err(ShelfError::validation(format!(
                "Unknown duplicate resolution \"{}\"",
                other
            ))),
        }
    }
}

/// Decides what a merge does with prompts whose ids already exist.
///
/// Asked at most once per import, with every duplicate id at once.
pub trait DuplicateResolver {
    fn resolve(
        &self,
        duplicate_ids: &[String],
        existing: &[PromptRecord],
        incoming: &[PromptRecord],
    ) -> Resolution;
}

impl DuplicateResolver for Resolution {
    fn resolve(&self, _: &[String], _: &[PromptRecord], _: &[PromptRecord]) -> Resolution {
        *self
    }
}

impl<F> DuplicateResolver for F
where
    F: Fn(&[String], &[PromptRecord], &[PromptRecord]) -> Resolution,
{
    fn resolve(
        &self,
        duplicate_ids: &[String],
        existing: &[PromptRecord],
        incoming: &[PromptRecord],
    ) -> Resolution {
        self(duplicate_ids, existing, incoming)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
}

/// Receives user-facing outcome messages.
pub trait Notifier {
    fn notify(&self, message: &str, kind: NotificationKind);
}

#[derive(Debug, Clone, Copy)]
pub struct ImportOptions {
    pub strategy: MergeStrategy,
    /// Continue when the bundle's format version differs from ours
    pub proceed_anyway: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            strategy: MergeStrategy::Merge,
            proceed_anyway: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub strategy: MergeStrategy,
    /// Records in the bundle
    pub imported: usize,
    pub duplicates: Vec<String>,
    pub resolution: Option<Resolution>,
    pub warnings: Vec<String>,
}

impl ImportReport {
    pub fn message(&self) -> String {
        let mut message = format!("Import successful! Imported {} prompt(s).", self.imported);
        if self.strategy == MergeStrategy::Merge && !self.duplicates.is_empty() {
            message.push_str(&format!(
                " {} duplicate(s) were handled.",
                self.duplicates.len()
            ));
        }
        message
    }
}

/// Read an export file without blocking the caller's runtime.
pub async fn read_bundle_file(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let path = path.as_ref();
    debug!(path = %path.display(), "reading import file");
    tokio::fs::read(path)
        .await
        .map_err(|e| ShelfError::Storage(format!("Failed to read {}: {}", path.display(), e)))
}

/// Tell the user how an import ended.
pub fn notify_outcome(outcome: &Result<ImportReport>, notifier: &dyn Notifier) {
    match outcome {
        Ok(report) => notifier.notify(&report.message(), NotificationKind::Success),
        Err(e @ ShelfError::RollbackFailed { .. }) => {
            notifier.notify(&e.to_string(), NotificationKind::Error)
        }
        Err(ShelfError::ImportCancelled) => notifier.notify(
            "Import cancelled. Your library was not changed.",
            NotificationKind::Error,
        ),
        Err(e) => notifier.notify(
            &format!("Import failed: {}. Your library was not changed.", e),
            NotificationKind::Error,
        ),
    }
}

impl<S: KeyValueStore> PromptLibrary<S> {
    /// Import an export bundle.
    ///
    /// The stored prompts and notes are snapshotted before anything else
    /// happens. If any later step fails, the snapshot is written back and
    /// the original error returned. If writing it back fails too, the error
    /// is [`ShelfError::RollbackFailed`] and the backup slots are left in
    /// place for manual recovery.
    pub fn apply_import(
        &self,
        bytes: &[u8],
        options: &ImportOptions,
        resolver: &dyn DuplicateResolver,
    ) -> Result<ImportReport> {
        if let Err(e) = self.snapshot() {
            error!(error = %e, "could not back up library, import aborted");
            return Err(match e {
                ShelfError::Storage(msg) => ShelfError::Storage(msg),
                other => ShelfError::Storage(other.to_string()),
            });
        }

        match self.run_import(bytes, options, resolver) {
            Ok(report) => {
                info!(
                    strategy = %report.strategy,
                    imported = report.imported,
                    duplicates = report.duplicates.len(),
                    "import complete"
                );
                Ok(report)
            }
            Err(original) => {
                warn!(error = %original, "import failed, restoring backup");
                match self.restore_snapshot() {
                    Ok(()) => {
                        info!("library restored from backup");
                        Err(original)
                    }
                    Err(restore) => {
                        error!(
                            error = %original,
                            restore_error = %restore,
                            "restoring backup failed, manual recovery required"
                        );
                        Err(ShelfError::RollbackFailed {
                            original: original.to_string(),
                            restore: restore.to_string(),
                        })
                    }
                }
            }
        }
    }

    /// Read `path` and import it.
    pub async fn import_file(
        &self,
        path: impl AsRef<Path>,
        options: &ImportOptions,
        resolver: &dyn DuplicateResolver,
    ) -> Result<ImportReport> {
        let bytes = read_bundle_file(path).await?;
        self.apply_import(&bytes, options, resolver)
    }

    fn snapshot(&self) -> Result<()> {
        let records = self.store().raw(keys::RECORDS)?;
        let notes = self.store().raw(keys::LEGACY_NOTES)?;

        self.store()
            .save_raw(keys::RECORDS_BACKUP, records.as_deref().unwrap_or(ABSENT))?;
        self.store()
            .save_raw(keys::LEGACY_NOTES_BACKUP, notes.as_deref().unwrap_or(ABSENT))?;

        debug!("library backed up");
        Ok(())
    }

    fn restore_snapshot(&self) -> Result<()> {
        for (backup, live) in [
            (keys::RECORDS_BACKUP, keys::RECORDS),
            (keys::LEGACY_NOTES_BACKUP, keys::LEGACY_NOTES),
        ] {
            let saved = self
                .store()
                .raw(backup)?
                .ok_or_else(|| ShelfError::Storage(format!("Backup slot '{}' is empty", backup)))?;

            if saved == ABSENT {
                self.store().remove(live)?;
            } else {
                self.store().save_raw(live, &saved)?;
            }
        }
        Ok(())
    }

    fn run_import(
        &self,
        bytes: &[u8],
        options: &ImportOptions,
        resolver: &dyn DuplicateResolver,
    ) -> Result<ImportReport> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| ShelfError::validation(format!("Invalid format: {}", e)))?;
        validate_bundle(&value)?;
        let object = value
            .as_object()
            .ok_or_else(|| ShelfError::validation("Export data must be an object"))?;

        let mut warnings = Vec::new();
        let expected = &self.config().export_format_version;
        let found = field(object, FORMAT_VERSION_FIELDS)
            .and_then(Value::as_str)
            .unwrap_or_default();
        if found != expected.as_str() {
            if !options.proceed_anyway {
                return Err(ShelfError::FormatVersionMismatch {
                    found: found.to_string(),
                    expected: expected.clone(),
                });
            }
            warn!(found, expected = %expected, "importing a different format version");
            warnings.push(format!(
                "Export file uses format version {}, expected {}",
                found, expected
            ));
        }

        let incoming_notes: NotesLegacyStore = match field(object, NOTES_FIELDS) {
            None | Some(Value::Null) => NotesLegacyStore::new(),
            Some(notes) => serde_json::from_value(notes.clone())
                .map_err(|e| ShelfError::validation(format!("Invalid legacyNotes: {}", e)))?,
        };

        let raw_records = field(object, RECORDS_FIELDS)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let migration = migrate_records(raw_records, &incoming_notes, self.config());
        if migration.dropped > 0 {
            warnings.push(format!(
                "{} record(s) in the file could not be read and were skipped",
                migration.dropped
            ));
        }
        let incoming = migration.records;
        let imported = incoming.len();

        let current = self.load_records();
        let existing_ids: HashSet<&str> = current.iter().map(|r| r.id.as_str()).collect();
        let mut duplicates: Vec<String> = Vec::new();
        for record in &incoming {
            if existing_ids.contains(record.id.as_str()) && !duplicates.contains(&record.id) {
                duplicates.push(record.id.clone());
            }
        }

        let (records, notes, resolution) = match options.strategy {
            MergeStrategy::Replace => (incoming, incoming_notes, None),
            MergeStrategy::Merge => {
                let resolution = if duplicates.is_empty() {
                    None
                } else {
                    Some(resolver.resolve(&duplicates, &current, &incoming))
                };
                let is_duplicate = |r: &PromptRecord| duplicates.contains(&r.id);

                let records: Vec<PromptRecord> = match resolution {
                    Some(Resolution::Cancel) => return Err(ShelfError::ImportCancelled),
                    Some(Resolution::KeepExisting) => current
                        .into_iter()
                        .chain(incoming.into_iter().filter(|r| !is_duplicate(r)))
                        .collect(),
                    Some(Resolution::KeepImport) => current
                        .into_iter()
                        .filter(|r| !is_duplicate(r))
                        .chain(incoming)
                        .collect(),
                    None => current.into_iter().chain(incoming).collect(),
                };

                let mut notes = self.load_notes();
                notes.extend(incoming_notes);
                (records, notes, resolution)
            }
        };

        self.save_records(&records)?;
        self.save_notes(&notes)?;

        Ok(ImportReport {
            strategy: options.strategy,
            imported,
            duplicates,
            resolution,
            warnings,
        })
    }
}
