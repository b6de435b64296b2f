use std::env;
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::bundle::{
    export_filename, notify_outcome, read_bundle_file, DuplicateResolver, ImportOptions,
    MergeStrategy, NotificationKind, Notifier, Resolution,
};
use crate::category::CategoryDisposition;
use crate::entity::{NewPrompt, PromptRecord, PromptType, VersionView};
use crate::error::{Result, ShelfError};
use crate::library::PromptLibrary;
use crate::storage::{keys, FileStore, SHELF_DIR};
use crate::versions::EditRequest;

/// Find the library root by looking for .promptshelf/
fn find_project_root() -> PathBuf {
    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    let mut current = cwd.as_path();
    loop {
        if current.join(SHELF_DIR).is_dir() {
            return current.to_path_buf();
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return cwd,
        }
    }
}

fn open_library() -> Result<PromptLibrary<FileStore>> {
    let root = find_project_root();
    let store = FileStore::open(&root)?;
    Ok(PromptLibrary::open(store))
}

fn parse_type(value: &str) -> Result<PromptType> {
    value.parse().map_err(ShelfError::Validation)
}

fn read_stdin() -> Result<String> {
    let mut content = String::new();
    io::stdin().read_to_string(&mut content)?;
    Ok(content)
}

/// Ask a yes/no question. Non-interactive stdin always answers no.
fn confirm(question: &str) -> Result<bool> {
    eprint!("{} [y/N] ", question);
    io::stderr().flush()?;

    if !atty::is(atty::Stream::Stdin) {
        eprintln!();
        return Ok(false);
    }

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

fn format_time(at: Option<DateTime<Utc>>) -> String {
    at.map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn rating_label(rating: u8) -> String {
    if rating == 0 {
        "unrated".to_string()
    } else {
        format!("{}/5", rating)
    }
}

fn print_record_line(record: &PromptRecord) {
    println!(
        "  {} [{}|{}] {} (v{}, {})",
        record.id,
        record.category,
        record.prompt_type,
        record.title,
        record.default_version_number,
        rating_label(record.rating)
    );
}

fn print_view(record: &PromptRecord, number: u32, view: &VersionView) {
    println!("Prompt {}", record.id);
    println!("Title: {}", view.title);
    println!("Category: {}", record.category);
    println!("Type: {}", view.prompt_type);
    println!("Rating: {}", rating_label(record.rating));
    println!(
        "Version: {} of {:?} (default {})",
        number,
        record.version_numbers(),
        record.default_version_number
    );
    if let Some(metadata) = &view.metadata {
        if let Some(model) = &metadata.model {
            println!("Model: {}", model);
        }
        println!("Updated: {}", format_time(metadata.updated_at));
        if let Some(tokens) = &metadata.token_estimate {
            println!(
                "Tokens: ~{} ({}-{}, {} confidence)",
                tokens.estimated(),
                tokens.min,
                tokens.max,
                tokens.confidence
            );
        }
    }
    println!("\n{}", view.content);
    if !view.notes.is_empty() {
        println!("\nNotes:\n{}", view.notes);
    }
}

pub fn handle_init() -> Result<()> {
    let root = env::current_dir()?;
    let store = FileStore::init(&root)?;
    let library = PromptLibrary::open(store);

    library.store().save(keys::CONFIG, library.config())?;
    let categories = library.categories();

    println!("Initialized prompt library in {}", library.store().backend().dir().display());
    println!("  Categories: {}", categories.join(", "));

    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn handle_add(
    title: String,
    content: Option<String>,
    stdin: bool,
    from_template: bool,
    model: String,
    category: String,
    prompt_type: String,
    json: bool,
) -> Result<()> {
    let library = open_library()?;
    let prompt_type = parse_type(&prompt_type)?;

    let content = if stdin {
        read_stdin()?
    } else if from_template {
        prompt_type.template().to_string()
    } else {
        content.unwrap_or_default()
    };

    let record = library.create(NewPrompt {
        title,
        content,
        model,
        category,
        prompt_type,
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        println!("Created prompt {} - {}", record.id, record.title);
    }

    Ok(())
}

pub fn handle_list(category: Option<String>, prompt_type: Option<String>, json: bool) -> Result<()> {
    let library = open_library()?;
    let prompt_type = prompt_type.as_deref().map(parse_type).transpose()?;

    let records: Vec<PromptRecord> = match &category {
        Some(category) => library.by_category(category),
        None => library.list(),
    }
    .into_iter()
    .filter(|r| prompt_type.map_or(true, |t| r.prompt_type == t))
    .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else if records.is_empty() {
        println!("No prompts found.");
    } else {
        println!("Prompts:\n");
        for record in &records {
            print_record_line(record);
        }
    }

    Ok(())
}

pub fn handle_show(id: String, version: Option<u32>, json: bool) -> Result<()> {
    let library = open_library()?;
    let record = library.get(&id)?;

    let (number, view) = match version {
        Some(number) => (number, VersionView::from(record.version(number)?)),
        None => {
            let number = record
                .effective_default()
                .map(|v| v.number)
                .unwrap_or(record.default_version_number);
            (number, library.view(&id)?)
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        print_view(&record, number, &view);
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn handle_edit(
    id: String,
    title: Option<String>,
    content: Option<String>,
    stdin: bool,
    prompt_type: Option<String>,
    notes: Option<String>,
    json: bool,
) -> Result<()> {
    let library = open_library()?;
    let current = library.view(&id)?;

    let content = if stdin { Some(read_stdin()?) } else { content };
    let prompt_type = match prompt_type {
        Some(t) => parse_type(&t)?,
        None => current.prompt_type,
    };

    let version = library.append_edit(
        &id,
        EditRequest {
            title: title.unwrap_or(current.title),
            content: content.unwrap_or(current.content),
            prompt_type,
            notes: notes.unwrap_or(current.notes),
        },
    )?;

    if json {
        println!("{}", serde_json::to_string_pretty(&version)?);
    } else {
        println!("Saved version {} of {} - {}", version.number, id, version.title);
    }

    Ok(())
}

pub fn handle_versions(id: String, json: bool) -> Result<()> {
    let library = open_library()?;
    let record = library.get(&id)?;

    let mut versions = record.versions.clone();
    versions.sort_by_key(|v| v.number);

    if json {
        println!("{}", serde_json::to_string_pretty(&versions)?);
        return Ok(());
    }

    println!("Versions of {} - {}:\n", record.id, record.title);
    for version in &versions {
        let marker = if version.number == record.default_version_number {
            "*"
        } else {
            " "
        };
        println!(
            "  {} v{} {} [{}] {}",
            marker,
            version.number,
            version.updated_at.format("%Y-%m-%d %H:%M"),
            version.prompt_type,
            version.title
        );
    }

    Ok(())
}

pub fn handle_set_default(id: String, number: u32) -> Result<()> {
    let library = open_library()?;
    library.set_default(&id, number)?;
    println!("Version {} is now the default for {}", number, id);
    Ok(())
}

pub fn handle_rate(id: String, rating: u8) -> Result<()> {
    let library = open_library()?;
    library.set_rating(&id, rating)?;
    println!("Rated {} {}", id, rating_label(rating));
    Ok(())
}

pub fn handle_delete(id: String, force: bool) -> Result<()> {
    let library = open_library()?;
    let record = library.get(&id)?;

    // Confirm deletion unless --force is used
    if !force {
        if !atty::is(atty::Stream::Stdin) {
            return Err(ShelfError::validation(
                "Use --force to delete in non-interactive mode",
            ));
        }
        if !confirm(&format!("Delete prompt {} - {}?", record.id, record.title))? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    library.delete(&record.id)?;
    println!("Deleted prompt {} - {}", record.id, record.title);

    Ok(())
}

pub fn handle_transfer(id: String, category: String) -> Result<()> {
    let library = open_library()?;
    library.transfer(&id, &category)?;
    println!("Moved {} to {}", id, category);
    Ok(())
}

pub fn handle_copy(id: String, category: String, json: bool) -> Result<()> {
    let library = open_library()?;
    let copy = library.copy(&id, &category)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&copy)?);
    } else {
        println!("Copied {} to {} as {}", id, category, copy.id);
    }

    Ok(())
}

pub fn handle_search(query: String, json: bool) -> Result<()> {
    let library = open_library()?;
    let results = library.search(&query);

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else if results.is_empty() {
        println!("No results found for '{}'.", query);
    } else {
        println!("Search results for '{}':\n", query);
        for record in &results {
            print_record_line(record);
        }
    }

    Ok(())
}

fn type_tip(prompt_type: PromptType) -> &'static str {
    match prompt_type {
        PromptType::Standard => "Standard prompts state the task directly.",
        PromptType::ZeroShot => "Zero shot prompts describe the task without any examples.",
        PromptType::OneShot => "One shot prompts show a single worked example before the task.",
        PromptType::FewShot => "Few shot prompts show several examples so the model can infer the pattern.",
    }
}

pub fn handle_template(prompt_type: String, hide_tip: bool) -> Result<()> {
    let prompt_type = parse_type(&prompt_type)?;
    let tooltip_id = prompt_type.to_string();

    // Tips are remembered per library; outside one they always show
    match open_library() {
        Ok(library) if hide_tip => library.dismiss_tooltip(&tooltip_id)?,
        Ok(library) if !library.should_show_tooltip(&tooltip_id) => {}
        _ => eprintln!("Tip: {} (hide with --hide-tip)", type_tip(prompt_type)),
    }

    println!("{}", prompt_type.template());
    Ok(())
}

pub fn handle_note_set(id: String, content: String) -> Result<()> {
    let library = open_library()?;
    library.get(&id)?;
    library.save_note(&id, &content)?;
    println!("Saved note for {}", id);
    Ok(())
}

pub fn handle_note_show(id: String, json: bool) -> Result<()> {
    let library = open_library()?;
    let note = library.note(&id);

    if json {
        println!("{}", serde_json::to_string_pretty(&note)?);
        return Ok(());
    }

    match note {
        Some(note) => {
            let saved = DateTime::<Utc>::from_timestamp_millis(note.last_saved);
            println!("Note for {} (saved {}):\n", id, format_time(saved));
            println!("{}", note.content);
        }
        None => println!("No note for {}.", id),
    }

    Ok(())
}

pub fn handle_note_delete(id: String) -> Result<()> {
    let library = open_library()?;
    library.delete_note(&id)?;
    println!("Deleted note for {}", id);
    Ok(())
}

pub fn handle_category_list(json: bool) -> Result<()> {
    let library = open_library()?;
    let records = library.list();

    let counts: Vec<(String, usize)> = library
        .categories()
        .into_iter()
        .map(|name| {
            let count = records.iter().filter(|r| r.category == name).count();
            (name, count)
        })
        .collect();

    if json {
        #[derive(serde::Serialize)]
        struct CategoryJson {
            name: String,
            prompts: usize,
        }

        let json_counts: Vec<CategoryJson> = counts
            .into_iter()
            .map(|(name, prompts)| CategoryJson { name, prompts })
            .collect();
        println!("{}", serde_json::to_string_pretty(&json_counts)?);
    } else {
        println!("Categories:\n");
        for (name, count) in counts {
            println!("  {} ({})", name, count);
        }
    }

    Ok(())
}

pub fn handle_category_add(name: String) -> Result<()> {
    let library = open_library()?;
    let name = library.add_category(&name)?;
    println!("Added category {}", name);
    Ok(())
}

pub fn handle_category_rename(old_name: String, new_name: String) -> Result<()> {
    let library = open_library()?;
    let moved = library.rename_category(&old_name, &new_name)?;
    println!(
        "Renamed {} to {} ({} prompt(s) updated)",
        old_name,
        new_name.trim(),
        moved
    );
    Ok(())
}

pub fn handle_category_delete(name: String, move_to: Option<String>, force: bool) -> Result<()> {
    let library = open_library()?;

    let disposition = match move_to {
        Some(target) => CategoryDisposition::Move(target),
        None => {
            let doomed = library.by_category(&name).len();
            if doomed > 0
                && !force
                && !confirm(&format!(
                    "Delete category {} and its {} prompt(s)?",
                    name, doomed
                ))?
            {
                println!("Cancelled.");
                return Ok(());
            }
            CategoryDisposition::Delete
        }
    };

    let affected = library.delete_category(&name, disposition.clone())?;
    match disposition {
        CategoryDisposition::Delete => {
            println!("Deleted category {} and {} prompt(s)", name, affected)
        }
        CategoryDisposition::Move(target) => println!(
            "Deleted category {}, moved {} prompt(s) to {}",
            name, affected, target
        ),
    }

    Ok(())
}

pub fn handle_export(output: Option<PathBuf>, stdout: bool) -> Result<()> {
    let library = open_library()?;
    let bundle = library.export()?;
    let json = bundle.to_json_pretty()?;

    if stdout {
        println!("{}", json);
        return Ok(());
    }

    let path = output.unwrap_or_else(|| PathBuf::from(export_filename(bundle.exported_at)));
    fs::write(&path, json)?;
    println!(
        "Exported {} prompt(s) to {}",
        bundle.statistics.total_prompts,
        path.display()
    );

    Ok(())
}

/// Prints import outcomes to the terminal.
struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, message: &str, kind: NotificationKind) {
        match kind {
            NotificationKind::Success => println!("{}", message),
            NotificationKind::Error => eprintln!("{}", message),
        }
    }
}

/// Asks on the terminal what to do with duplicate prompts.
struct TerminalResolver;

impl DuplicateResolver for TerminalResolver {
    fn resolve(
        &self,
        duplicate_ids: &[String],
        existing: &[PromptRecord],
        _incoming: &[PromptRecord],
    ) -> Resolution {
        eprintln!(
            "{} prompt(s) in the file already exist in your library:",
            duplicate_ids.len()
        );
        for id in duplicate_ids {
            let title = existing
                .iter()
                .find(|r| &r.id == id)
                .map(|r| r.title.as_str())
                .unwrap_or_default();
            eprintln!("  {} {}", id, title);
        }

        if !atty::is(atty::Stream::Stdin) {
            eprintln!("Use --on-duplicate to choose in non-interactive mode.");
            return Resolution::Cancel;
        }

        eprint!("Keep [e]xisting, keep [i]mported, or [c]ancel? ");
        let _ = io::stderr().flush();
        let mut input = String::new();
        if io::stdin().read_line(&mut input).is_err() {
            return Resolution::Cancel;
        }
        match input.trim().to_lowercase().as_str() {
            "e" | "existing" => Resolution::KeepExisting,
            "i" | "imported" | "import" => Resolution::KeepImport,
            _ => Resolution::Cancel,
        }
    }
}

pub fn handle_import(
    file: PathBuf,
    strategy: String,
    on_duplicate: Option<String>,
    yes: bool,
    json: bool,
) -> Result<()> {
    let library = open_library()?;
    let strategy: MergeStrategy = strategy.parse()?;
    let fixed: Option<Resolution> = on_duplicate
        .as_deref()
        .map(|s| s.parse::<Resolution>())
        .transpose()?;

    let runtime = tokio::runtime::Builder::new_current_thread().build()?;
    let bytes = runtime.block_on(read_bundle_file(&file))?;

    let resolver: &dyn DuplicateResolver = match &fixed {
        Some(resolution) => resolution,
        None => &TerminalResolver,
    };
    let mut options = ImportOptions {
        strategy,
        proceed_anyway: yes,
    };

    let mut outcome = library.apply_import(&bytes, &options, resolver);
    if let Err(ShelfError::FormatVersionMismatch { found, expected }) = &outcome {
        let question = format!(
            "Export file uses format version {}, but {} is expected. Import anyway?",
            found, expected
        );
        if confirm(&question)? {
            options.proceed_anyway = true;
            outcome = library.apply_import(&bytes, &options, resolver);
        }
    }

    // Failures reach the user through main's error path
    let report = outcome?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for warning in &report.warnings {
        eprintln!("Warning: {}", warning);
    }
    notify_outcome(&Ok(report), &TerminalNotifier);

    Ok(())
}
