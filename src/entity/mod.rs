mod note;
mod prompt;
mod version;

pub use note::{LegacyNote, NotesLegacyStore};
pub use prompt::{Confidence, Metadata, NewPrompt, PromptRecord, PromptType, TokenEstimate};
pub use version::{Version, VersionView};

/// Generate an id for a new prompt.
pub fn new_prompt_id() -> String {
    format!("prompt_{}", uuid::Uuid::new_v4().simple())
}
