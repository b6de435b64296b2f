//! The prompt library service.
//!
//! [`PromptLibrary`] holds no state of its own between calls beyond the
//! configuration: every operation is a read-modify-write cycle against the
//! store. There is no compare-and-swap on the whole-collection write, so two
//! operations interleaved on the same store would lose the first one's
//! effect. Callers issue one operation at a time.

use serde_json::Value;
use tracing::{info, warn};

use crate::config::LibraryConfig;
use crate::entity::{
    new_prompt_id, LegacyNote, Metadata, NewPrompt, NotesLegacyStore, PromptRecord, Version,
};
use crate::error::{Result, ShelfError};
use crate::migration::migrate_records;
use crate::storage::{keys, JsonStore, KeyValueStore};

const MAX_MODEL_NAME_LEN: usize = 100;
const MAX_RATING: u8 = 5;

#[derive(Debug)]
pub struct PromptLibrary<S> {
    store: JsonStore<S>,
    config: LibraryConfig,
}

impl<S: KeyValueStore> PromptLibrary<S> {
    pub fn new(backend: S) -> Self {
        Self::with_config(backend, LibraryConfig::default())
    }

    pub fn with_config(backend: S, config: LibraryConfig) -> Self {
        Self {
            store: JsonStore::new(backend),
            config,
        }
    }

    /// Open with the configuration saved in the store, if any.
    pub fn open(backend: S) -> Self {
        let store = JsonStore::new(backend);
        let config = store.load_opt(keys::CONFIG).unwrap_or_default();
        Self { store, config }
    }

    pub fn store(&self) -> &JsonStore<S> {
        &self.store
    }

    pub fn config(&self) -> &LibraryConfig {
        &self.config
    }

    /// Load every prompt, migrating legacy shapes on the way in.
    pub fn load_records(&self) -> Vec<PromptRecord> {
        let raw = match self.store.load_value(keys::RECORDS) {
            Some(Value::Array(items)) => items,
            Some(_) => {
                warn!("stored prompt collection is not an array, treating it as empty");
                return Vec::new();
            }
            None => return Vec::new(),
        };

        let notes = self.load_notes();
        let migration = migrate_records(raw, &notes, &self.config);

        if migration.needs_persist() {
            info!(migrated = migration.migrated, "migrated stored prompts");
            if let Err(e) = self.save_records(&migration.records) {
                warn!(error = %e, "migrated prompts not persisted, migration will run again");
            }
        }

        migration.records
    }

    pub(crate) fn save_records(&self, records: &[PromptRecord]) -> Result<()> {
        self.store.save(keys::RECORDS, records)
    }

    pub fn load_notes(&self) -> NotesLegacyStore {
        self.store.load(keys::LEGACY_NOTES)
    }

    pub(crate) fn save_notes(&self, notes: &NotesLegacyStore) -> Result<()> {
        self.store.save(keys::LEGACY_NOTES, notes)
    }

    /// All prompts in stored order
    pub fn list(&self) -> Vec<PromptRecord> {
        self.load_records()
    }

    pub fn get(&self, id: &str) -> Result<PromptRecord> {
        self.load_records()
            .into_iter()
            .find(|r| r.id == id)
            .ok_or_else(|| ShelfError::RecordNotFound(id.to_string()))
    }

    pub fn by_category(&self, category: &str) -> Vec<PromptRecord> {
        self.load_records()
            .into_iter()
            .filter(|r| r.category == category)
            .collect()
    }

    /// Case-insensitive substring search over current titles and content.
    pub fn search(&self, query: &str) -> Vec<PromptRecord> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        self.load_records()
            .into_iter()
            .filter(|r| {
                r.title.to_lowercase().contains(&needle)
                    || r.content.to_lowercase().contains(&needle)
            })
            .collect()
    }

    /// Create a prompt with a single version.
    pub fn create(&self, new: NewPrompt) -> Result<PromptRecord> {
        let title = required("Title", &new.title)?;
        let content = required("Content", &new.content)?;
        let model = required("Model name", &new.model)?;
        let category = required("Category", &new.category)?;

        if model.chars().count() > MAX_MODEL_NAME_LEN {
            return Err(ShelfError::validation(format!(
                "Model name cannot exceed {} characters",
                MAX_MODEL_NAME_LEN
            )));
        }
        self.require_category(category)?;

        let now = chrono::Utc::now();
        let metadata = Metadata {
            model: Some(model.to_string()),
            created_at: Some(now),
            updated_at: Some(now),
            token_estimate: Some(self.config.tokens.estimate(content)),
            ..Metadata::default()
        };

        let first = Version {
            number: 1,
            title: title.to_string(),
            content: content.to_string(),
            prompt_type: new.prompt_type,
            metadata: Some(metadata.clone()),
            notes: String::new(),
            created_at: now,
            updated_at: now,
        };

        let record = PromptRecord {
            id: new_prompt_id(),
            category: category.to_string(),
            rating: 0,
            versions: vec![first],
            default_version_number: 1,
            title: title.to_string(),
            content: content.to_string(),
            prompt_type: new.prompt_type,
            metadata: Some(metadata),
            extra: Default::default(),
        };

        let mut records = self.load_records();
        records.push(record.clone());
        self.save_records(&records)?;

        info!(id = %record.id, category = %record.category, "created prompt");
        Ok(record)
    }

    /// Delete a prompt and its legacy note.
    pub fn delete(&self, id: &str) -> Result<()> {
        let mut records = self.load_records();
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Err(ShelfError::RecordNotFound(id.to_string()));
        }
        self.save_records(&records)?;

        let mut notes = self.load_notes();
        if notes.remove(id).is_some() {
            self.save_notes(&notes)?;
        }

        info!(id, "deleted prompt");
        Ok(())
    }

    /// Set the rating in place. Ratings do not create versions.
    pub fn set_rating(&self, id: &str, rating: u8) -> Result<()> {
        if rating > MAX_RATING {
            return Err(ShelfError::validation(format!(
                "Rating must be between 0 and {}",
                MAX_RATING
            )));
        }

        let mut records = self.load_records();
        let record = find_mut(&mut records, id)?;
        record.rating = rating;
        self.save_records(&records)
    }

    /// Move a prompt to another category.
    pub fn transfer(&self, id: &str, target: &str) -> Result<()> {
        self.require_category(target)?;

        let mut records = self.load_records();
        let record = find_mut(&mut records, id)?;
        record.category = target.to_string();
        self.save_records(&records)
    }

    /// Clone a prompt into `target` under a new id.
    ///
    /// The copy keeps the whole history with every timestamp refreshed, starts
    /// unrated, and inherits the legacy note when there is one.
    pub fn copy(&self, id: &str, target: &str) -> Result<PromptRecord> {
        self.require_category(target)?;

        let mut records = self.load_records();
        let original = records
            .iter()
            .find(|r| r.id == id)
            .ok_or_else(|| ShelfError::RecordNotFound(id.to_string()))?;

        let now = chrono::Utc::now();
        let mut copy = original.clone();
        copy.id = new_prompt_id();
        copy.category = target.to_string();
        copy.rating = 0;
        for version in &mut copy.versions {
            version.created_at = now;
            version.updated_at = now;
            if let Some(metadata) = version.metadata.as_mut() {
                metadata.created_at = Some(now);
                metadata.updated_at = Some(now);
            }
        }
        copy.refresh_flat_cache();

        records.push(copy.clone());
        self.save_records(&records)?;

        let mut notes = self.load_notes();
        if let Some(note) = notes.get(id).filter(|n| !n.content.is_empty()).cloned() {
            notes.insert(copy.id.clone(), LegacyNote::new(&note.content));
            self.save_notes(&notes)?;
        }

        info!(from = id, to = %copy.id, category = target, "copied prompt");
        Ok(copy)
    }

    pub fn note(&self, id: &str) -> Option<LegacyNote> {
        self.load_notes().remove(id)
    }

    pub fn save_note(&self, id: &str, content: &str) -> Result<()> {
        let mut notes = self.load_notes();
        notes.insert(id.to_string(), LegacyNote::new(content));
        self.save_notes(&notes)
    }

    pub fn delete_note(&self, id: &str) -> Result<()> {
        let mut notes = self.load_notes();
        notes.remove(id);
        self.save_notes(&notes)
    }

    /// Whether the user still wants to see the tooltip `tooltip_id`.
    pub fn should_show_tooltip(&self, tooltip_id: &str) -> bool {
        let preferences: std::collections::BTreeMap<String, bool> =
            self.store.load(keys::TOOLTIP_PREFERENCES);
        !preferences.get(tooltip_id).copied().unwrap_or(false)
    }

    /// Record "don't show again" for a tooltip.
    pub fn dismiss_tooltip(&self, tooltip_id: &str) -> Result<()> {
        let mut preferences: std::collections::BTreeMap<String, bool> =
            self.store.load(keys::TOOLTIP_PREFERENCES);
        preferences.insert(tooltip_id.to_string(), true);
        self.store.save(keys::TOOLTIP_PREFERENCES, &preferences)
    }

    pub(crate) fn require_category(&self, name: &str) -> Result<()> {
        if self.categories().iter().any(|c| c == name) {
            Ok(())
        } else {
            Err(ShelfError::CategoryNotFound(name.to_string()))
        }
    }
}

pub(crate) fn find_mut<'a>(records: &'a mut [PromptRecord], id: &str) -> Result<&'a mut PromptRecord> {
    records
        .iter_mut()
        .find(|r| r.id == id)
        .ok_or_else(|| ShelfError::RecordNotFound(id.to_string()))
}

/// Trimmed `value`, or a validation error naming `field` when it is blank.
pub(crate) fn required<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ShelfError::validation(format!("{} cannot be empty", field)))
    } else {
        Ok(trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::PromptType;
    use crate::storage::MemoryStore;

    fn new_prompt(title: &str, content: &str) -> NewPrompt {
        NewPrompt {
            title: title.to_string(),
            content: content.to_string(),
            model: "gpt-4".to_string(),
            category: "General".to_string(),
            prompt_type: PromptType::Standard,
        }
    }

    #[test]
    fn test_create_starts_at_version_one() {
        let library = PromptLibrary::new(MemoryStore::new());
        let record = library.create(new_prompt("Foo", "Bar baz")).unwrap();

        assert!(record.id.starts_with("prompt_"));
        assert_eq!(record.versions.len(), 1);
        assert_eq!(record.versions[0].number, 1);
        assert_eq!(record.default_version_number, 1);
        assert_eq!(record.rating, 0);
        let metadata = record.metadata.as_ref().unwrap();
        assert_eq!(metadata.model.as_deref(), Some("gpt-4"));
        assert!(metadata.token_estimate.is_some());

        assert_eq!(library.list(), vec![record]);
    }

    #[test]
    fn test_create_validates_input() {
        let library = PromptLibrary::new(MemoryStore::new());

        let result = library.create(new_prompt("  ", "x"));
        assert!(matches!(result, Err(ShelfError::Validation(_))));

        let mut long_model = new_prompt("t", "c");
        long_model.model = "m".repeat(101);
        assert!(matches!(library.create(long_model), Err(ShelfError::Validation(_))));

        let mut unknown = new_prompt("t", "c");
        unknown.category = "Nope".to_string();
        assert!(matches!(library.create(unknown), Err(ShelfError::CategoryNotFound(_))));

        assert!(library.list().is_empty());
    }

    #[test]
    fn test_delete_removes_note() {
        let library = PromptLibrary::new(MemoryStore::new());
        let record = library.create(new_prompt("Foo", "Bar")).unwrap();
        library.save_note(&record.id, "  hello ").unwrap();
        assert_eq!(library.note(&record.id).unwrap().content, "hello");

        library.delete(&record.id).unwrap();

        assert!(library.list().is_empty());
        assert!(library.note(&record.id).is_none());
        assert!(matches!(library.delete(&record.id), Err(ShelfError::RecordNotFound(_))));
    }

    #[test]
    fn test_rating_bounds() {
        let library = PromptLibrary::new(MemoryStore::new());
        let record = library.create(new_prompt("Foo", "Bar")).unwrap();

        library.set_rating(&record.id, 5).unwrap();
        assert_eq!(library.get(&record.id).unwrap().rating, 5);
        assert_eq!(library.get(&record.id).unwrap().versions.len(), 1);

        assert!(matches!(library.set_rating(&record.id, 6), Err(ShelfError::Validation(_))));
    }

    #[test]
    fn test_transfer_and_copy() {
        let library = PromptLibrary::new(MemoryStore::new());
        let record = library.create(new_prompt("Foo", "Bar")).unwrap();
        library.set_rating(&record.id, 3).unwrap();
        library.save_note(&record.id, "keep").unwrap();

        library.transfer(&record.id, "Toolbox").unwrap();
        assert_eq!(library.get(&record.id).unwrap().category, "Toolbox");

        let copy = library.copy(&record.id, "Web-React").unwrap();
        assert_ne!(copy.id, record.id);
        assert_eq!(copy.category, "Web-React");
        assert_eq!(copy.rating, 0);
        assert_eq!(copy.versions.len(), 1);
        assert_eq!(copy.versions[0].content, "Bar");
        assert_eq!(library.note(&copy.id).unwrap().content, "keep");
        assert_eq!(library.list().len(), 2);

        assert!(matches!(
            library.transfer(&record.id, "Missing"),
            Err(ShelfError::CategoryNotFound(_))
        ));
    }

    #[test]
    fn test_search_matches_title_and_content() {
        let library = PromptLibrary::new(MemoryStore::new());
        library.create(new_prompt("Rust review", "Check ownership")).unwrap();
        library.create(new_prompt("Essay", "Write about RUST")).unwrap();
        library.create(new_prompt("Other", "Nothing")).unwrap();

        assert_eq!(library.search("rust").len(), 2);
        assert_eq!(library.search("ownership").len(), 1);
        assert!(library.search("   ").is_empty());
    }

    #[test]
    fn test_tooltip_preferences() {
        let library = PromptLibrary::new(MemoryStore::new());
        assert!(library.should_show_tooltip("few-shot-tooltip"));

        library.dismiss_tooltip("few-shot-tooltip").unwrap();

        assert!(!library.should_show_tooltip("few-shot-tooltip"));
        assert!(library.should_show_tooltip("standard-tooltip"));
    }

    #[test]
    fn test_load_persists_migration_once() {
        let library = PromptLibrary::new(MemoryStore::new());
        library
            .store()
            .save_raw(keys::RECORDS, r#"[{"id":"p1","title":"T","content":"C"}]"#)
            .unwrap();

        let records = library.load_records();
        assert_eq!(records[0].versions.len(), 1);

        let persisted = library.store().raw(keys::RECORDS).unwrap().unwrap();
        assert!(persisted.contains("\"versions\""));

        let again = library.load_records();
        assert_eq!(records, again);
        assert_eq!(library.store().raw(keys::RECORDS).unwrap().unwrap(), persisted);
    }
}
