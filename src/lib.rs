pub mod bundle;
pub mod category;
pub mod cli;
pub mod config;
pub mod entity;
pub mod error;
pub mod library;
pub mod migration;
pub mod storage;
pub mod tokens;
pub mod versions;

pub use bundle::{ExportBundle, ImportOptions, ImportReport, MergeStrategy, Resolution};
pub use category::CategoryDisposition;
pub use config::LibraryConfig;
pub use error::{ErrorKind, Result, ShelfError};
pub use library::PromptLibrary;
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use versions::EditRequest;
