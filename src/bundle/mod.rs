//! Portable export bundles, and importing them back.
//!
//! An export is a single pretty-printed JSON document holding every prompt,
//! the legacy notes and summary statistics. An import validates such a
//! document and either merges it into the library or replaces the library
//! with it. The store is snapshotted first and restored if anything fails.

mod export;
mod import;
mod stats;
mod validate;

pub use export::{export_filename, ExportBundle};
pub use import::{
    notify_outcome, read_bundle_file, DuplicateResolver, ImportOptions, ImportReport,
    MergeStrategy, NotificationKind, Notifier, Resolution,
};
pub use stats::{compute_statistics, Statistics};
pub use validate::validate_bundle;
