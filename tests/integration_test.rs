use std::path::Path;
use std::process::{Command, Output};

use serde_json::Value;
use tempfile::TempDir;

fn shelf_cmd() -> Command {
    Command::new(env!("CARGO_BIN_EXE_promptshelf"))
}

fn run(dir: &Path, args: &[&str]) -> Output {
    shelf_cmd().current_dir(dir).args(args).output().unwrap()
}

fn run_ok(dir: &Path, args: &[&str]) -> String {
    let output = run(dir, args);
    assert!(
        output.status.success(),
        "{:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn run_json(dir: &Path, args: &[&str]) -> Value {
    serde_json::from_str(&run_ok(dir, args)).unwrap()
}

fn init(dir: &Path) {
    run_ok(dir, &["init"]);
}

fn add(dir: &Path, title: &str, content: &str, category: &str) -> String {
    let record = run_json(
        dir,
        &[
            "add",
            title,
            "--content",
            content,
            "--model",
            "gpt-4",
            "--category",
            category,
            "--json",
        ],
    );
    record["id"].as_str().unwrap().to_string()
}

#[test]
fn test_init_creates_library_directory() {
    let tmp = TempDir::new().unwrap();

    let output = run(tmp.path(), &["init"]);

    assert!(output.status.success());
    assert!(tmp.path().join(".promptshelf").is_dir());
    assert!(tmp.path().join(".promptshelf/config.json").exists());
    assert!(tmp.path().join(".promptshelf/promptCategories.json").exists());
}

#[test]
fn test_init_twice_fails() {
    let tmp = TempDir::new().unwrap();
    init(tmp.path());

    let output = run(tmp.path(), &["init"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Already initialized"));
}

#[test]
fn test_add_without_init_fails() {
    let tmp = TempDir::new().unwrap();

    let output = run(tmp.path(), &["add", "Test", "--content", "x", "--model", "m"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Not in a promptshelf library"));
}

#[test]
fn test_add_rejects_unknown_category() {
    let tmp = TempDir::new().unwrap();
    init(tmp.path());

    let output = run(
        tmp.path(),
        &["add", "T", "--content", "x", "--model", "m", "--category", "Nowhere"],
    );

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Category not found"));
}

#[test]
fn test_version_workflow() {
    let tmp = TempDir::new().unwrap();
    init(tmp.path());
    let id = add(tmp.path(), "Greeting", "Say hello", "General");

    let version = run_json(
        tmp.path(),
        &["edit", &id, "--content", "Say hello warmly", "--notes", "warmer", "--json"],
    );
    assert_eq!(version["number"], 2);

    let versions = run_json(tmp.path(), &["versions", &id, "--json"]);
    assert_eq!(versions.as_array().unwrap().len(), 2);

    let view = run_json(tmp.path(), &["show", &id, "--json"]);
    assert_eq!(view["content"], "Say hello warmly");
    assert_eq!(view["notes"], "warmer");

    run_ok(tmp.path(), &["set-default", &id, "1"]);
    let view = run_json(tmp.path(), &["show", &id, "--json"]);
    assert_eq!(view["content"], "Say hello");

    let old = run_json(tmp.path(), &["show", &id, "--version", "2", "--json"]);
    assert_eq!(old["content"], "Say hello warmly");

    let output = run(tmp.path(), &["set-default", &id, "9"]);
    assert!(!output.status.success());
}

#[test]
fn test_list_filters_and_search() {
    let tmp = TempDir::new().unwrap();
    init(tmp.path());
    add(tmp.path(), "Alpha", "first prompt", "General");
    add(tmp.path(), "Beta", "second prompt", "Toolbox");

    let all = run_json(tmp.path(), &["list", "--json"]);
    assert_eq!(all.as_array().unwrap().len(), 2);

    let toolbox = run_json(tmp.path(), &["list", "--category", "Toolbox", "--json"]);
    assert_eq!(toolbox.as_array().unwrap().len(), 1);
    assert_eq!(toolbox[0]["title"], "Beta");

    let found = run_json(tmp.path(), &["search", "FIRST", "--json"]);
    assert_eq!(found.as_array().unwrap().len(), 1);
    assert_eq!(found[0]["title"], "Alpha");
}

#[test]
fn test_delete_requires_force_when_non_interactive() {
    let tmp = TempDir::new().unwrap();
    init(tmp.path());
    let id = add(tmp.path(), "Doomed", "bye", "General");

    let output = run(tmp.path(), &["delete", &id]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--force"));

    run_ok(tmp.path(), &["delete", &id, "--force"]);
    let all = run_json(tmp.path(), &["list", "--json"]);
    assert!(all.as_array().unwrap().is_empty());
}

#[test]
fn test_category_rename_moves_prompts() {
    let tmp = TempDir::new().unwrap();
    init(tmp.path());
    add(tmp.path(), "A", "a", "General");

    run_ok(tmp.path(), &["category", "rename", "General", "Everyday"]);

    let moved = run_json(tmp.path(), &["list", "--category", "Everyday", "--json"]);
    assert_eq!(moved.as_array().unwrap().len(), 1);

    let categories = run_json(tmp.path(), &["category", "list", "--json"]);
    assert_eq!(categories[0]["name"], "Everyday");
    assert_eq!(categories[0]["prompts"], 1);
}

#[test]
fn test_export_then_replace_import() {
    let source = TempDir::new().unwrap();
    init(source.path());
    add(source.path(), "Shared", "shared content", "General");
    let export_path = source.path().join("library.json");
    run_ok(
        source.path(),
        &["export", "--output", export_path.to_str().unwrap()],
    );

    let target = TempDir::new().unwrap();
    init(target.path());
    add(target.path(), "Local", "local content", "General");

    let report = run_json(
        target.path(),
        &[
            "import",
            export_path.to_str().unwrap(),
            "--strategy",
            "replace",
            "--json",
        ],
    );
    assert_eq!(report["imported"], 1);

    let all = run_json(target.path(), &["list", "--json"]);
    assert_eq!(all.as_array().unwrap().len(), 1);
    assert_eq!(all[0]["title"], "Shared");
}

#[test]
fn test_duplicate_import_cancels_without_terminal() {
    let tmp = TempDir::new().unwrap();
    init(tmp.path());
    add(tmp.path(), "Mine", "original", "General");
    let export_path = tmp.path().join("self.json");
    run_ok(tmp.path(), &["export", "-o", export_path.to_str().unwrap()]);
    let before = run_ok(tmp.path(), &["list", "--json"]);

    let output = run(tmp.path(), &["import", export_path.to_str().unwrap()]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stderr.matches("Error: Import cancelled").count(), 1);
    assert_eq!(run_ok(tmp.path(), &["list", "--json"]), before);

    let report = run_json(
        tmp.path(),
        &[
            "import",
            export_path.to_str().unwrap(),
            "--on-duplicate",
            "keep-existing",
            "--json",
        ],
    );
    assert_eq!(report["duplicates"].as_array().unwrap().len(), 1);
    assert_eq!(run_ok(tmp.path(), &["list", "--json"]), before);
}

#[test]
fn test_invalid_import_leaves_library_unchanged() {
    let tmp = TempDir::new().unwrap();
    init(tmp.path());
    add(tmp.path(), "Keep", "me", "General");
    let before = run_ok(tmp.path(), &["list", "--json"]);

    let bad = tmp.path().join("bad.json");
    std::fs::write(
        &bad,
        r#"{"formatVersion":"1.0.0","exportedAt":"2024-01-01T00:00:00Z","records":[{"id":"x","title":"t"}]}"#,
    )
    .unwrap();

    let output = run(tmp.path(), &["import", bad.to_str().unwrap(), "-s", "replace"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Record at index 0 is missing or has invalid content"));
    assert_eq!(run_ok(tmp.path(), &["list", "--json"]), before);
}

#[test]
fn test_format_version_mismatch_needs_yes() {
    let tmp = TempDir::new().unwrap();
    init(tmp.path());

    let old = tmp.path().join("old.json");
    std::fs::write(
        &old,
        r#"{"version":"0.9.0","exportTimestamp":"2023-01-01T00:00:00Z","prompts":[{"id":"legacy","title":"Old","content":"old text","group":"General"}]}"#,
    )
    .unwrap();

    let output = run(tmp.path(), &["import", old.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("format version"));

    let report = run_json(tmp.path(), &["import", old.to_str().unwrap(), "--yes", "--json"]);
    assert_eq!(report["warnings"].as_array().unwrap().len(), 1);

    let view = run_json(tmp.path(), &["show", "legacy", "--json"]);
    assert_eq!(view["content"], "old text");
}

#[test]
fn test_template_prints_sections() {
    let tmp = TempDir::new().unwrap();
    let stdout = run_ok(tmp.path(), &["template", "few-shot"]);
    assert!(stdout.contains("[Examples]"));
}

#[test]
fn test_template_tip_can_be_hidden() {
    let tmp = TempDir::new().unwrap();
    init(tmp.path());

    let output = run(tmp.path(), &["template", "one-shot"]);
    assert!(String::from_utf8_lossy(&output.stderr).contains("Tip:"));

    run_ok(tmp.path(), &["template", "one-shot", "--hide-tip"]);
    let output = run(tmp.path(), &["template", "one-shot"]);
    assert!(!String::from_utf8_lossy(&output.stderr).contains("Tip:"));

    let output = run(tmp.path(), &["template", "zero-shot"]);
    assert!(String::from_utf8_lossy(&output.stderr).contains("Tip:"));
}
