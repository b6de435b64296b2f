mod commands;
mod handlers;

pub use commands::{
    CategoryAction, CategoryCommand, Cli, Commands, NoteAction, NoteCommand,
};
pub use handlers::{
    handle_add, handle_category_add, handle_category_delete, handle_category_list,
    handle_category_rename, handle_copy, handle_delete, handle_edit, handle_export,
    handle_import, handle_init, handle_list, handle_note_delete, handle_note_set,
    handle_note_show, handle_rate, handle_search, handle_set_default, handle_show,
    handle_template, handle_transfer, handle_versions,
};
