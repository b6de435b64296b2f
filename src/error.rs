use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShelfError {
    #[error("Not in a promptshelf library. Run 'promptshelf init' first.")]
    NotInitialized,

    #[error("Already initialized. Remove .promptshelf/ to reinitialize.")]
    AlreadyInitialized,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Prompt not found: {0}")]
    RecordNotFound(String),

    #[error("Version {number} not found for prompt {id}")]
    VersionNotFound { id: String, number: u32 },

    #[error("Prompt {0} has no versions")]
    NoVersions(String),

    #[error("Category not found: {0}")]
    CategoryNotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Export file uses format version {found}, but {expected} is expected")]
    FormatVersionMismatch { found: String, expected: String },

    #[error("Import cancelled")]
    ImportCancelled,

    #[error(
        "Import failed ({original}) and restoring the backup also failed ({restore}). \
         Manual recovery from the backup slots is required."
    )]
    RollbackFailed { original: String, restore: String },

    #[error("Integrity violation in prompt {id}: {reason}")]
    Integrity { id: String, reason: String },

    #[error("Export self-check failed: {0}")]
    Export(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse classification of a [`ShelfError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Storage,
    Integrity,
    Cancelled,
    /// Needs manual intervention; never retried.
    Unrecoverable,
}

impl ShelfError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ShelfError::Validation(_) | ShelfError::FormatVersionMismatch { .. } => {
                ErrorKind::Validation
            }
            ShelfError::RecordNotFound(_)
            | ShelfError::VersionNotFound { .. }
            | ShelfError::NoVersions(_)
            | ShelfError::CategoryNotFound(_)
            | ShelfError::NotInitialized => ErrorKind::NotFound,
            ShelfError::Storage(_)
            | ShelfError::AlreadyInitialized
            | ShelfError::Io(_)
            | ShelfError::Json(_) => ErrorKind::Storage,
            ShelfError::Integrity { .. } | ShelfError::Export(_) => ErrorKind::Integrity,
            ShelfError::ImportCancelled => ErrorKind::Cancelled,
            ShelfError::RollbackFailed { .. } => ErrorKind::Unrecoverable,
        }
    }

    pub(crate) fn validation(reason: impl Into<String>) -> Self {
        ShelfError::Validation(reason.into())
    }
}

pub type Result<T> = std::result::Result<T, ShelfError>;
