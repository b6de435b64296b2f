use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "promptshelf")]
#[command(version, about = "A versioned personal prompt library")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new prompt library in the current directory
    Init,

    /// Add a new prompt
    Add {
        /// Prompt title
        title: String,

        /// Prompt content
        #[arg(long, short = 'c', conflicts_with = "stdin")]
        content: Option<String>,

        /// Read content from stdin
        #[arg(long)]
        stdin: bool,

        /// Start from the template for the prompt type
        #[arg(long, conflicts_with_all = ["content", "stdin"])]
        from_template: bool,

        /// Model the prompt is written for
        #[arg(long, short = 'm')]
        model: String,

        /// Category to file the prompt under
        #[arg(long, default_value = "General")]
        category: String,

        /// Prompt type (standard, zero-shot, one-shot, few-shot)
        #[arg(long = "type", short = 't', default_value = "standard")]
        prompt_type: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List prompts
    List {
        /// Only prompts in this category
        #[arg(long)]
        category: Option<String>,

        /// Only prompts of this type
        #[arg(long = "type", short = 't')]
        prompt_type: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a prompt's current version
    Show {
        /// Prompt ID
        id: String,

        /// Show this version instead of the default
        #[arg(long, short = 'v')]
        version: Option<u32>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Edit a prompt, appending a new version
    Edit {
        /// Prompt ID
        id: String,

        /// New title
        #[arg(long)]
        title: Option<String>,

        /// New content
        #[arg(long, short = 'c', conflicts_with = "stdin")]
        content: Option<String>,

        /// Read new content from stdin
        #[arg(long)]
        stdin: bool,

        /// New prompt type
        #[arg(long = "type", short = 't')]
        prompt_type: Option<String>,

        /// Notes for the new version
        #[arg(long, short = 'n')]
        notes: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List a prompt's versions
    Versions {
        /// Prompt ID
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Make a version the default
    SetDefault {
        /// Prompt ID
        id: String,

        /// Version number
        number: u32,
    },

    /// Rate a prompt from 0 (unrated) to 5
    Rate {
        /// Prompt ID
        id: String,

        /// Rating
        rating: u8,
    },

    /// Delete a prompt
    Delete {
        /// Prompt ID
        id: String,

        /// Skip confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
    },

    /// Move a prompt to another category
    Transfer {
        /// Prompt ID
        id: String,

        /// Target category
        category: String,
    },

    /// Copy a prompt into another category
    Copy {
        /// Prompt ID
        id: String,

        /// Target category
        category: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Search titles and content
    Search {
        /// Search query
        query: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the starter template for a prompt type
    Template {
        /// Prompt type (standard, zero-shot, one-shot, few-shot)
        prompt_type: String,

        /// Stop showing the tip for this prompt type
        #[arg(long)]
        hide_tip: bool,
    },

    /// Manage legacy per-prompt notes
    Note(NoteCommand),

    /// Manage categories
    Category(CategoryCommand),

    /// Export the library to a JSON file
    Export {
        /// Output file (defaults to a timestamped name in the current directory)
        #[arg(long, short = 'o', conflicts_with = "stdout")]
        output: Option<PathBuf>,

        /// Write the export to stdout
        #[arg(long)]
        stdout: bool,
    },

    /// Import an export file
    Import {
        /// Export file to import
        file: PathBuf,

        /// How to combine with the library (merge, replace)
        #[arg(long, short = 's', default_value = "merge")]
        strategy: String,

        /// What to do with prompts that already exist (keep-existing, keep-import, cancel)
        #[arg(long)]
        on_duplicate: Option<String>,

        /// Import even if the file's format version differs
        #[arg(long, short = 'y')]
        yes: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
pub struct NoteCommand {
    #[command(subcommand)]
    pub action: NoteAction,
}

#[derive(Subcommand, Debug)]
pub enum NoteAction {
    /// Save the note for a prompt
    Set {
        /// Prompt ID
        id: String,

        /// Note text
        content: String,
    },

    /// Show the note for a prompt
    Show {
        /// Prompt ID
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete the note for a prompt
    Delete {
        /// Prompt ID
        id: String,
    },
}

#[derive(Args, Debug)]
pub struct CategoryCommand {
    #[command(subcommand)]
    pub action: CategoryAction,
}

#[derive(Subcommand, Debug)]
pub enum CategoryAction {
    /// List categories with prompt counts
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Add a category
    Add {
        /// Category name
        name: String,
    },

    /// Rename a category and move its prompts along
    Rename {
        /// Current name
        old_name: String,

        /// New name
        new_name: String,
    },

    /// Delete a category
    Delete {
        /// Category name
        name: String,

        /// Move the category's prompts here instead of deleting them
        #[arg(long)]
        move_to: Option<String>,

        /// Skip confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
    },
}
