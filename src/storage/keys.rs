//! Names of the documents kept in the store.

/// All prompt records
pub const RECORDS: &str = "promptLibrary";
/// Per-prompt notes from before notes were versioned
pub const LEGACY_NOTES: &str = "promptNotesData";
/// Ordered category names
pub const CATEGORIES: &str = "promptCategories";
/// Tooltip ids the user asked not to see again
pub const TOOLTIP_PREFERENCES: &str = "promptTypeTooltipPreferences";
/// Snapshot of [`RECORDS`] taken before an import
pub const RECORDS_BACKUP: &str = "promptLibrary_backup";
/// Snapshot of [`LEGACY_NOTES`] taken before an import
pub const LEGACY_NOTES_BACKUP: &str = "promptNotesData_backup";
/// Optional [`crate::LibraryConfig`]
pub const CONFIG: &str = "config";
