//! Upgrades stored prompts to the versioned layout.
//!
//! Runs on every load, before anything else sees the data. Input that is
//! already migrated passes through unchanged, so a second run over the output
//! of the first is a no-op.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{error, warn};

use crate::config::LibraryConfig;
use crate::entity::{Metadata, NotesLegacyStore, PromptRecord, PromptType, Version};
use crate::error::{Result, ShelfError};

/// A stored prompt in any historical shape.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRecord {
    id: String,
    #[serde(default, alias = "group")]
    category: Option<String>,
    #[serde(default)]
    rating: Option<Value>,
    #[serde(default)]
    versions: Option<Value>,
    #[serde(default, alias = "defaultVersion")]
    default_version_number: Option<Value>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(rename = "type", default)]
    prompt_type: Option<String>,
    #[serde(default)]
    metadata: Option<Value>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// A stored version in any historical shape.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawVersion {
    #[serde(default, alias = "version")]
    number: Option<Value>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(rename = "type", default)]
    prompt_type: Option<String>,
    #[serde(default)]
    metadata: Option<Value>,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

/// Record field holding version entries that could not be read.
///
/// They stay in the stored document so that writing the record back never
/// loses them.
pub const UNREADABLE_VERSIONS: &str = "unreadableVersions";

/// Result of migrating a stored collection.
#[derive(Debug, Default)]
pub struct Migration {
    pub records: Vec<PromptRecord>,
    /// Records whose stored form had to change
    pub migrated: usize,
    /// Elements that could not be read as a prompt at all
    pub dropped: usize,
}

impl Migration {
    /// Whether the migrated collection should be written back.
    pub fn needs_persist(&self) -> bool {
        self.migrated > 0
    }
}

/// Migrate every element of a stored prompt collection.
pub fn migrate_records(
    raw: Vec<Value>,
    notes: &NotesLegacyStore,
    config: &LibraryConfig,
) -> Migration {
    let mut migration = Migration::default();

    for (index, value) in raw.into_iter().enumerate() {
        match migrate_record(value, notes, config) {
            Ok((record, touched)) => {
                if touched {
                    migration.migrated += 1;
                }
                migration.records.push(record);
            }
            Err(e) => {
                error!(index, error = %e, "skipping unreadable prompt");
                migration.dropped += 1;
            }
        }
    }

    migration
}

/// Migrate one stored prompt. The flag is true when anything changed.
pub fn migrate_record(
    value: Value,
    notes: &NotesLegacyStore,
    config: &LibraryConfig,
) -> Result<(PromptRecord, bool)> {
    let raw: RawRecord = serde_json::from_value(value).map_err(|e| ShelfError::Integrity {
        id: "<unknown>".to_string(),
        reason: e.to_string(),
    })?;

    let mut touched = false;
    let id = raw.id;

    let category = match raw.category {
        Some(category) if !category.is_empty() => category,
        _ => {
            touched = true;
            config.default_category.clone()
        }
    };

    let prompt_type = read_type(
        &id,
        raw.prompt_type.as_deref(),
        PromptType::default(),
        &mut touched,
    );
    let metadata = read_metadata(&id, raw.metadata, &mut touched);

    let rating = raw.rating.as_ref().map(normalize_rating).unwrap_or(0);
    let title = raw.title.unwrap_or_default();
    let content = raw.content.unwrap_or_default();

    let (versions, unreadable) = match raw.versions {
        Some(Value::Array(items)) => {
            read_versions(&id, items, prompt_type, metadata.as_ref(), &mut touched)
        }
        None | Some(Value::Null) => (Vec::new(), Vec::new()),
        Some(other) => {
            warn!(id = %id, "version history is not an array, rebuilding from flat fields");
            (Vec::new(), vec![other])
        }
    };

    let mut extra = raw.extra;
    if !unreadable.is_empty() {
        touched = true;
        set_aside(&mut extra, unreadable);
    }

    let (versions, default_version_number) = if versions.is_empty() {
        touched = true;
        let notes = notes
            .get(&id)
            .map(|note| note.content.clone())
            .unwrap_or_default();
        let first = first_version(&title, &content, prompt_type, metadata.clone(), notes);
        (vec![first], 1)
    } else {
        let latest = versions.iter().map(|v| v.number).max().unwrap_or(1);
        let requested = raw
            .default_version_number
            .as_ref()
            .and_then(Value::as_u64);
        let default = match requested {
            Some(n) if versions.iter().any(|v| u64::from(v.number) == n) => n as u32,
            Some(n) => {
                warn!(id = %id, requested = n, latest, "default version missing, using latest");
                touched = true;
                latest
            }
            None => {
                touched = true;
                latest
            }
        };
        (versions, default)
    };

    let mut record = PromptRecord {
        id,
        category,
        rating,
        versions,
        default_version_number,
        title,
        content,
        prompt_type,
        metadata,
        extra,
    };

    touched |= record.refresh_flat_cache();

    if let Err(e) = check_integrity(&record) {
        error!(error = %e, "prompt kept as-is");
    }

    Ok((record, touched))
}

/// Read a stored type name, accepting any spelling `PromptType` parses.
fn read_type(id: &str, value: Option<&str>, fallback: PromptType, touched: &mut bool) -> PromptType {
    match value {
        Some(s) if !s.is_empty() => match s.parse::<PromptType>() {
            Ok(t) => {
                *touched |= t.to_string() != s;
                t
            }
            Err(_) => {
                warn!(id, value = s, fallback = %fallback, "unknown prompt type");
                *touched = true;
                fallback
            }
        },
        _ => {
            *touched = true;
            fallback
        }
    }
}

fn read_metadata(id: &str, value: Option<Value>, touched: &mut bool) -> Option<Metadata> {
    match value {
        None | Some(Value::Null) => None,
        Some(value) => match serde_json::from_value::<Metadata>(value) {
            Ok(metadata) => Some(metadata),
            Err(e) => {
                warn!(id, error = %e, "discarding unreadable metadata");
                *touched = true;
                None
            }
        },
    }
}

/// Read each stored version on its own.
///
/// Returns the readable versions and the raw entries that could not be read.
fn read_versions(
    id: &str,
    items: Vec<Value>,
    record_type: PromptType,
    record_metadata: Option<&Metadata>,
    touched: &mut bool,
) -> (Vec<Version>, Vec<Value>) {
    let mut versions = Vec::with_capacity(items.len());
    let mut unreadable = Vec::new();

    for (index, item) in items.into_iter().enumerate() {
        let read = RawVersion::deserialize(&item)
            .map_err(|e| e.to_string())
            .and_then(|raw| read_version(id, raw, record_type, record_metadata, touched));

        match read {
            Ok(version) => versions.push(version),
            Err(reason) => {
                let e = ShelfError::Integrity {
                    id: id.to_string(),
                    reason: format!("version at index {} is unreadable: {}", index, reason),
                };
                error!(error = %e, "keeping unreadable version aside");
                unreadable.push(item);
            }
        }
    }

    (versions, unreadable)
}

fn read_version(
    id: &str,
    raw: RawVersion,
    record_type: PromptType,
    record_metadata: Option<&Metadata>,
    touched: &mut bool,
) -> std::result::Result<Version, String> {
    let number = match &raw.number {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => {
            *touched = true;
            s.trim().parse().ok()
        }
        _ => None,
    }
    .and_then(|n| u32::try_from(n).ok())
    .ok_or_else(|| "missing or invalid number".to_string())?;

    let prompt_type = read_type(id, raw.prompt_type.as_deref(), record_type, touched);
    let metadata = read_metadata(id, raw.metadata, touched);

    let created_at = match raw.created_at {
        Some(at) => at,
        None => {
            *touched = true;
            metadata
                .as_ref()
                .or(record_metadata)
                .and_then(|m| m.created_at)
                .unwrap_or_else(Utc::now)
        }
    };
    let updated_at = match raw.updated_at {
        Some(at) => at,
        None => {
            *touched = true;
            metadata
                .as_ref()
                .and_then(|m| m.updated_at)
                .unwrap_or(created_at)
        }
    };

    Ok(Version {
        number,
        title: raw.title.unwrap_or_default(),
        content: raw.content.unwrap_or_default(),
        prompt_type,
        metadata,
        notes: raw.notes.unwrap_or_default(),
        created_at,
        updated_at,
    })
}

/// Append unreadable version entries to the record's set-aside list.
fn set_aside(extra: &mut Map<String, Value>, entries: Vec<Value>) {
    match extra.get_mut(UNREADABLE_VERSIONS) {
        Some(Value::Array(kept)) => kept.extend(entries),
        Some(other) => {
            let mut all = vec![other.take()];
            all.extend(entries);
            *other = Value::Array(all);
        }
        None => {
            extra.insert(UNREADABLE_VERSIONS.to_string(), Value::Array(entries));
        }
    }
}

/// Build version 1 out of a prompt's flat fields.
pub(crate) fn first_version(
    title: &str,
    content: &str,
    prompt_type: PromptType,
    metadata: Option<Metadata>,
    notes: String,
) -> Version {
    let now = Utc::now();
    let created_at = metadata.as_ref().and_then(|m| m.created_at).unwrap_or(now);
    let updated_at = metadata.as_ref().and_then(|m| m.updated_at).unwrap_or(now);

    Version {
        number: 1,
        title: title.to_string(),
        content: content.to_string(),
        prompt_type,
        metadata,
        notes,
        created_at,
        updated_at,
    }
}

/// Check the invariants migration cannot repair.
pub fn check_integrity(record: &PromptRecord) -> Result<()> {
    if record.versions.is_empty() {
        return Err(ShelfError::Integrity {
            id: record.id.clone(),
            reason: "no versions".to_string(),
        });
    }

    let mut seen = HashSet::new();
    for version in &record.versions {
        if !seen.insert(version.number) {
            return Err(ShelfError::Integrity {
                id: record.id.clone(),
                reason: format!("duplicate version number {}", version.number),
            });
        }
    }

    Ok(())
}

fn normalize_rating(value: &Value) -> u8 {
    let rating = value
        .as_u64()
        .or_else(|| value.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64))
        .unwrap_or(0);
    rating.min(5) as u8
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::entity::LegacyNote;

    fn config() -> LibraryConfig {
        LibraryConfig::default()
    }

    fn legacy_prompt() -> Value {
        json!({
            "id": "prompt_legacy",
            "title": "Old",
            "content": "Old content",
            "rating": 4,
            "metadata": {
                "model": "gpt-4",
                "createdAt": "2024-01-01T00:00:00.000Z",
                "updatedAt": "2024-01-02T00:00:00.000Z"
            }
        })
    }

    #[test]
    fn test_legacy_record_gets_first_version() {
        let mut notes = NotesLegacyStore::new();
        notes.insert(
            "prompt_legacy".to_string(),
            LegacyNote {
                content: "remember this".to_string(),
                last_saved: 1,
            },
        );

        let (record, touched) = migrate_record(legacy_prompt(), &notes, &config()).unwrap();

        assert!(touched);
        assert_eq!(record.category, "Toolbox");
        assert_eq!(record.prompt_type, PromptType::Standard);
        assert_eq!(record.rating, 4);
        assert_eq!(record.versions.len(), 1);
        assert_eq!(record.default_version_number, 1);

        let v1 = &record.versions[0];
        assert_eq!(v1.number, 1);
        assert_eq!(v1.title, "Old");
        assert_eq!(v1.content, "Old content");
        assert_eq!(v1.notes, "remember this");
        assert_eq!(v1.created_at.to_rfc3339(), "2024-01-01T00:00:00+00:00");
        assert_eq!(v1.updated_at.to_rfc3339(), "2024-01-02T00:00:00+00:00");
    }

    #[test]
    fn test_legacy_field_names_are_understood() {
        let value = json!({
            "id": "p1",
            "group": "Web-React",
            "type": "Few Shot",
            "title": "T",
            "content": "C",
            "versions": [
                {"version": 1, "title": "T0", "content": "C0", "type": "Standard",
                 "createdAt": "2024-01-01T00:00:00Z", "updatedAt": "2024-01-01T00:00:00Z"},
                {"version": 2, "title": "T", "content": "C", "type": "Few Shot",
                 "createdAt": "2024-01-01T00:00:00Z", "updatedAt": "2024-01-03T00:00:00Z"}
            ],
            "defaultVersion": 2
        });

        let (record, touched) = migrate_record(value, &NotesLegacyStore::new(), &config()).unwrap();

        assert!(!touched);
        assert_eq!(record.category, "Web-React");
        assert_eq!(record.prompt_type, PromptType::FewShot);
        assert_eq!(record.default_version_number, 2);
        assert_eq!(record.versions[1].number, 2);
    }

    #[test]
    fn test_missing_default_points_at_latest() {
        let value = json!({
            "id": "p1",
            "category": "General",
            "type": "Standard",
            "title": "B",
            "content": "b",
            "versions": [
                {"number": 1, "title": "A", "content": "a", "type": "Standard"},
                {"number": 3, "title": "B", "content": "b", "type": "Standard"}
            ]
        });

        let (record, touched) = migrate_record(value, &NotesLegacyStore::new(), &config()).unwrap();

        assert!(touched);
        assert_eq!(record.default_version_number, 3);
    }

    #[test]
    fn test_dangling_default_is_repaired_and_cache_refreshed() {
        let value = json!({
            "id": "p1",
            "category": "General",
            "type": "Standard",
            "title": "stale",
            "content": "stale",
            "versions": [
                {"number": 1, "title": "A", "content": "a", "type": "Standard"},
                {"number": 2, "title": "B", "content": "b", "type": "Standard"}
            ],
            "defaultVersionNumber": 9
        });

        let (record, touched) = migrate_record(value, &NotesLegacyStore::new(), &config()).unwrap();

        assert!(touched);
        assert_eq!(record.default_version_number, 2);
        assert_eq!(record.title, "B");
        assert_eq!(record.content, "b");
    }

    #[test]
    fn test_empty_versions_are_rebuilt() {
        let value = json!({
            "id": "p1", "category": "General", "type": "Standard",
            "title": "T", "content": "C", "versions": [], "defaultVersionNumber": 0
        });

        let (record, touched) = migrate_record(value, &NotesLegacyStore::new(), &config()).unwrap();

        assert!(touched);
        assert_eq!(record.versions.len(), 1);
        assert_eq!(record.default_version_number, 1);
    }

    #[test]
    fn test_migration_is_idempotent() {
        let raw = vec![
            legacy_prompt(),
            json!({"id": "p2", "title": "x", "content": "y", "type": "zero-shot"}),
        ];

        let first = migrate_records(raw, &NotesLegacyStore::new(), &config());
        assert_eq!(first.migrated, 2);
        let first_json = serde_json::to_string(&first.records).unwrap();

        let again: Vec<Value> = serde_json::from_str(&first_json).unwrap();
        let second = migrate_records(again, &NotesLegacyStore::new(), &config());
        let second_json = serde_json::to_string(&second.records).unwrap();

        assert_eq!(second.migrated, 0);
        assert!(!second.needs_persist());
        assert_eq!(first_json, second_json);
    }

    #[test]
    fn test_unknown_fields_survive() {
        let mut value = legacy_prompt();
        value["pinned"] = json!(true);

        let (record, _) = migrate_record(value, &NotesLegacyStore::new(), &config()).unwrap();
        let back = serde_json::to_value(&record).unwrap();

        assert_eq!(back["pinned"], json!(true));
        assert_eq!(back["category"], json!("Toolbox"));
        assert!(back.get("group").is_none());
    }

    #[test]
    fn test_duplicate_version_numbers_are_kept() {
        let value = json!({
            "id": "p1", "category": "General", "type": "Standard",
            "title": "T", "content": "C",
            "versions": [
                {"number": 1, "title": "T", "content": "C", "type": "Standard"},
                {"number": 1, "title": "T", "content": "C", "type": "Standard"}
            ],
            "defaultVersionNumber": 1
        });

        let (record, _) = migrate_record(value, &NotesLegacyStore::new(), &config()).unwrap();

        assert_eq!(record.versions.len(), 2);
        assert!(matches!(
            check_integrity(&record),
            Err(ShelfError::Integrity { .. })
        ));
    }

    #[test]
    fn test_unreadable_element_is_skipped() {
        let raw = vec![json!({"title": "no id"}), json!(42), legacy_prompt()];

        let migration = migrate_records(raw, &NotesLegacyStore::new(), &config());

        assert_eq!(migration.records.len(), 1);
        assert_eq!(migration.dropped, 2);
    }

    fn three_versions(second_type: &str) -> Value {
        json!({
            "id": "p", "category": "General", "type": "Standard",
            "title": "T", "content": "three", "defaultVersionNumber": 3,
            "versions": [
                {"number": 1, "title": "T", "content": "one", "type": "Standard",
                 "createdAt": "2024-01-01T00:00:00Z", "updatedAt": "2024-01-01T00:00:00Z"},
                {"number": 2, "title": "T", "content": "two", "type": second_type,
                 "createdAt": "2024-01-01T00:00:00Z", "updatedAt": "2024-01-02T00:00:00Z"},
                {"number": 3, "title": "T", "content": "three", "type": "Standard",
                 "createdAt": "2024-01-01T00:00:00Z", "updatedAt": "2024-01-03T00:00:00Z"}
            ]
        })
    }

    #[test]
    fn test_version_type_is_read_leniently() {
        let (record, touched) =
            migrate_record(three_versions("zero-shot"), &NotesLegacyStore::new(), &config())
                .unwrap();

        assert!(touched);
        assert_eq!(record.version_numbers(), vec![1, 2, 3]);
        assert_eq!(record.versions[1].prompt_type, PromptType::ZeroShot);
        assert_eq!(record.versions[0].content, "one");
    }

    #[test]
    fn test_unknown_version_type_falls_back_to_record_type() {
        let (record, _) =
            migrate_record(three_versions("Many Shot"), &NotesLegacyStore::new(), &config())
                .unwrap();

        assert_eq!(record.versions.len(), 3);
        assert_eq!(record.versions[1].prompt_type, PromptType::Standard);
    }

    #[test]
    fn test_unreadable_version_is_set_aside_not_lost() {
        let mut value = three_versions("Standard");
        value["versions"][1]["number"] = json!("two");
        value["versions"][2]["createdAt"] = json!("not a date");

        let (record, touched) = migrate_record(value, &NotesLegacyStore::new(), &config()).unwrap();

        assert!(touched);
        assert_eq!(record.version_numbers(), vec![1]);
        assert_eq!(record.default_version_number, 1);
        let aside = record.extra[UNREADABLE_VERSIONS].as_array().unwrap();
        assert_eq!(aside.len(), 2);
        assert_eq!(aside[0]["content"], "two");

        let stored = serde_json::to_value(&record).unwrap();
        let (again, touched) = migrate_record(stored, &NotesLegacyStore::new(), &config()).unwrap();
        assert!(!touched);
        assert_eq!(again, record);
    }

    #[test]
    fn test_versions_that_are_not_an_array_are_kept_aside() {
        let value = json!({
            "id": "p", "category": "General", "type": "Standard",
            "title": "T", "content": "flat", "versions": {"1": "odd"}
        });

        let (record, touched) = migrate_record(value, &NotesLegacyStore::new(), &config()).unwrap();

        assert!(touched);
        assert_eq!(record.versions.len(), 1);
        assert_eq!(record.versions[0].content, "flat");
        assert_eq!(record.extra[UNREADABLE_VERSIONS], json!([{"1": "odd"}]));
    }

    #[test]
    fn test_missing_version_timestamps_are_filled_once() {
        let value = json!({
            "id": "p", "category": "General", "type": "Standard",
            "title": "T", "content": "c", "defaultVersionNumber": 1,
            "metadata": {"createdAt": "2024-05-01T00:00:00Z"},
            "versions": [{"number": 1, "title": "T", "content": "c", "type": "Standard"}]
        });

        let (first, touched) = migrate_record(value, &NotesLegacyStore::new(), &config()).unwrap();
        assert!(touched);
        assert_eq!(
            first.versions[0].created_at.to_rfc3339(),
            "2024-05-01T00:00:00+00:00"
        );
        assert_eq!(first.versions[0].updated_at, first.versions[0].created_at);

        let stored = serde_json::to_value(&first).unwrap();
        let (second, touched) = migrate_record(stored, &NotesLegacyStore::new(), &config()).unwrap();
        assert!(!touched);
        assert_eq!(second.versions, first.versions);
    }

    #[test]
    fn test_rating_is_clamped() {
        assert_eq!(normalize_rating(&json!(9)), 5);
        assert_eq!(normalize_rating(&json!(2.6)), 3);
        assert_eq!(normalize_rating(&json!(-1)), 0);
        assert_eq!(normalize_rating(&json!("x")), 0);
    }
}
