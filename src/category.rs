//! Category lifecycle.
//!
//! Renames and deletions cascade over every prompt in the category as one
//! whole-collection write.

use tracing::{error, info, warn};

use crate::entity::{NotesLegacyStore, PromptRecord};
use crate::error::{Result, ShelfError};
use crate::library::{required, PromptLibrary};
use crate::storage::{keys, KeyValueStore};

/// What happens to the prompts of a deleted category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryDisposition {
    /// Delete the prompts and their legacy notes
    Delete,
    /// Reassign the prompts to another existing category
    Move(String),
}

impl<S: KeyValueStore> PromptLibrary<S> {
    /// Category names in stored order, seeding the defaults on first use.
    pub fn categories(&self) -> Vec<String> {
        if let Some(categories) = self.store().load_opt::<Vec<String>>(keys::CATEGORIES) {
            return categories;
        }

        let defaults = self.config().default_categories.clone();
        if let Err(e) = self.store().save(keys::CATEGORIES, &defaults) {
            error!(error = %e, "could not seed default categories");
        }
        defaults
    }

    /// Add a category. Names are unique ignoring case.
    pub fn add_category(&self, name: &str) -> Result<String> {
        let name = required("Category name", name)?;
        let mut categories = self.categories();

        if categories.iter().any(|c| same_name(c, name)) {
            return Err(ShelfError::validation(format!(
                "Category \"{}\" already exists",
                name
            )));
        }

        categories.push(name.to_string());
        self.store().save(keys::CATEGORIES, &categories)?;

        info!(name, "added category");
        Ok(name.to_string())
    }

    /// Rename a category and every prompt that uses it.
    ///
    /// Returns how many prompts moved to the new name.
    pub fn rename_category(&self, old_name: &str, new_name: &str) -> Result<usize> {
        let new_name = required("Category name", new_name)?;
        let mut categories = self.categories();

        let index = categories
            .iter()
            .position(|c| c == old_name)
            .ok_or_else(|| ShelfError::CategoryNotFound(old_name.to_string()))?;

        if categories
            .iter()
            .enumerate()
            .any(|(i, c)| i != index && same_name(c, new_name))
        {
            return Err(ShelfError::validation(format!(
                "Category \"{}\" already exists",
                new_name
            )));
        }

        let original = self.load_records();
        let mut records = original.clone();
        let mut updated = 0;
        for record in records.iter_mut().filter(|r| r.category == old_name) {
            record.category = new_name.to_string();
            updated += 1;
        }

        categories[index] = new_name.to_string();
        self.write_cascade(&original, &records, &categories, None)?;

        info!(from = old_name, to = new_name, prompts = updated, "renamed category");
        Ok(updated)
    }

    /// Delete a category, deleting or moving its prompts.
    ///
    /// Returns how many prompts were deleted or moved.
    pub fn delete_category(&self, name: &str, disposition: CategoryDisposition) -> Result<usize> {
        let mut categories = self.categories();

        if let CategoryDisposition::Move(target) = &disposition {
            if target == name {
                return Err(ShelfError::validation(
                    "Cannot move prompts into the category being deleted",
                ));
            }
            if !categories.iter().any(|c| c == target) {
                return Err(ShelfError::validation(format!(
                    "Target category \"{}\" does not exist",
                    target
                )));
            }
        }

        if !categories.iter().any(|c| c == name) {
            return Err(ShelfError::CategoryNotFound(name.to_string()));
        }

        let original = self.load_records();
        let affected = original.iter().filter(|r| r.category == name).count();

        let (records, notes) = match &disposition {
            CategoryDisposition::Delete => {
                let mut notes = self.load_notes();
                for record in original.iter().filter(|r| r.category == name) {
                    notes.remove(&record.id);
                }
                let kept: Vec<PromptRecord> = original
                    .iter()
                    .filter(|r| r.category != name)
                    .cloned()
                    .collect();
                (kept, Some(notes))
            }
            CategoryDisposition::Move(target) => {
                let moved: Vec<PromptRecord> = original
                    .iter()
                    .cloned()
                    .map(|mut r| {
                        if r.category == name {
                            r.category = target.clone();
                        }
                        r
                    })
                    .collect();
                (moved, None)
            }
        };

        categories.retain(|c| c != name);
        self.write_cascade(&original, &records, &categories, notes.as_ref())?;

        info!(name, prompts = affected, ?disposition, "deleted category");
        Ok(affected)
    }

    /// Persist a cascade, putting prompts and notes back if a later write fails.
    fn write_cascade(
        &self,
        original: &[PromptRecord],
        records: &[PromptRecord],
        categories: &[String],
        notes: Option<&NotesLegacyStore>,
    ) -> Result<()> {
        let original_notes = notes.map(|_| self.load_notes());
        self.save_records(records)?;

        let rest = notes
            .map(|notes| self.save_notes(notes))
            .unwrap_or(Ok(()))
            .and_then(|_| self.store().save(keys::CATEGORIES, categories));

        if let Err(e) = rest {
            warn!(error = %e, "category write failed, reverting cascade");
            if let Err(revert) = self.save_records(original) {
                error!(error = %revert, "could not revert prompts after failed category write");
            }
            if let Some(original_notes) = &original_notes {
                if let Err(revert) = self.save_notes(original_notes) {
                    error!(error = %revert, "could not revert notes after failed category write");
                }
            }
            return Err(e);
        }
        Ok(())
    }
}

fn same_name(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}
