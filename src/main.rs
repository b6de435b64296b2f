use clap::Parser;
use promptshelf::cli::{
    handle_add, handle_category_add, handle_category_delete, handle_category_list,
    handle_category_rename, handle_copy, handle_delete, handle_edit, handle_export,
    handle_import, handle_init, handle_list, handle_note_delete, handle_note_set,
    handle_note_show, handle_rate, handle_search, handle_set_default, handle_show,
    handle_template, handle_transfer, handle_versions, CategoryAction, Cli, Commands, NoteAction,
};
use tracing_subscriber::EnvFilter;

fn main() {
    // Logs go to stderr so command output on stdout stays clean
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init => handle_init(),
        Commands::Add {
            title,
            content,
            stdin,
            from_template,
            model,
            category,
            prompt_type,
            json,
        } => handle_add(
            title,
            content,
            stdin,
            from_template,
            model,
            category,
            prompt_type,
            json,
        ),
        Commands::List {
            category,
            prompt_type,
            json,
        } => handle_list(category, prompt_type, json),
        Commands::Show { id, version, json } => handle_show(id, version, json),
        Commands::Edit {
            id,
            title,
            content,
            stdin,
            prompt_type,
            notes,
            json,
        } => handle_edit(id, title, content, stdin, prompt_type, notes, json),
        Commands::Versions { id, json } => handle_versions(id, json),
        Commands::SetDefault { id, number } => handle_set_default(id, number),
        Commands::Rate { id, rating } => handle_rate(id, rating),
        Commands::Delete { id, force } => handle_delete(id, force),
        Commands::Transfer { id, category } => handle_transfer(id, category),
        Commands::Copy { id, category, json } => handle_copy(id, category, json),
        Commands::Search { query, json } => handle_search(query, json),
        Commands::Template {
            prompt_type,
            hide_tip,
        } => handle_template(prompt_type, hide_tip),
        Commands::Note(note_cmd) => match note_cmd.action {
            NoteAction::Set { id, content } => handle_note_set(id, content),
            NoteAction::Show { id, json } => handle_note_show(id, json),
            NoteAction::Delete { id } => handle_note_delete(id),
        },
        Commands::Category(category_cmd) => match category_cmd.action {
            CategoryAction::List { json } => handle_category_list(json),
            CategoryAction::Add { name } => handle_category_add(name),
            CategoryAction::Rename { old_name, new_name } => {
                handle_category_rename(old_name, new_name)
            }
            CategoryAction::Delete {
                name,
                move_to,
                force,
            } => handle_category_delete(name, move_to, force),
        },
        Commands::Export { output, stdout } => handle_export(output, stdout),
        Commands::Import {
            file,
            strategy,
            on_duplicate,
            yes,
            json,
        } => handle_import(file, strategy, on_duplicate, yes, json),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
