//! Integration tests for the svgmap-clean binary.
//!
//! These invoke the built binary and check:
//! - Exit codes (0 = ran, 1 = I/O error, 2 = input missing)
//! - dry run leaves the file alone and prints a preview
//! - in-place mode writes a backup and the cleaned document
//! - `--json` output shape

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

// ── Helpers ───────────────────────────────────────────────────────────────

fn bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_svgmap-clean"))
}

fn run_cli(dir: &Path, args: &[&str]) -> Output {
    Command::new(bin())
        .args(args)
        .current_dir(dir)
        .env_remove("SVGMAP_FILE")
        .env_remove("SVGMAP_ISO_TABLE")
        .env_remove("SVGMAP_BARE_CODES")
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to execute svgmap-clean")
}

/// Copy the fixture map and table into a fresh temp dir.
fn workspace() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let fixtures = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures");
    for name in ["worldmap.svg", "ISO3166-1.json"] {
        std::fs::copy(fixtures.join(name), dir.path().join(name)).unwrap();
    }
    dir
}

fn backups(dir: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.to_string_lossy().contains("worldmap.svg.bak."))
        .collect()
}

// ── Exit codes ────────────────────────────────────────────────────────────

#[test]
fn test_missing_input_exits_2() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_cli(dir.path(), &["--file", "nope.svg", "--no-progress"]);
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("SVG not found"), "stderr: {stderr}");
    assert!(stderr.contains("nope.svg"), "stderr: {stderr}");
}

#[test]
fn test_default_path_missing_exits_2() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_cli(dir.path(), &["-q"]);
    assert_eq!(output.status.code(), Some(2));
}

// ── Dry run ───────────────────────────────────────────────────────────────

#[test]
fn test_dry_run_prints_preview_and_leaves_file() {
    let dir = workspace();
    let before = std::fs::read_to_string(dir.path().join("worldmap.svg")).unwrap();

    let output = run_cli(
        dir.path(),
        &["--file", "worldmap.svg", "--no-progress", "--preview-chars", "120"],
    );
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Dry run"), "stdout: {stdout}");
    assert!(stdout.contains("<svg xmlns="), "stdout: {stdout}");
    assert!(!stdout.contains("data-iso=\"FR\""), "preview should be truncated: {stdout}");

    assert_eq!(std::fs::read_to_string(dir.path().join("worldmap.svg")).unwrap(), before);
    assert!(backups(dir.path()).is_empty());
}

// ── In place ──────────────────────────────────────────────────────────────

#[test]
fn test_in_place_writes_backup() {
    let dir = workspace();
    let original = std::fs::read_to_string(dir.path().join("worldmap.svg")).unwrap();

    let output = run_cli(dir.path(), &["--in-place", "--file", "worldmap.svg", "--no-progress"]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Wrote worldmap.svg (backup: "), "stdout: {stdout}");

    let baks = backups(dir.path());
    assert_eq!(baks.len(), 1);
    assert_eq!(std::fs::read_to_string(&baks[0]).unwrap(), original);

    let cleaned = std::fs::read_to_string(dir.path().join("worldmap.svg")).unwrap();
    assert!(cleaned.contains("data-iso=\"FR\""));
    assert!(!cleaned.contains("<defs"));
}

#[test]
fn test_iso_table_override() {
    let dir = workspace();
    std::fs::write(dir.path().join("other.json"), r#"{"AQ": "Atlantis"}"#).unwrap();

    let output = run_cli(
        dir.path(),
        &["--in-place", "--file", "worldmap.svg", "--iso-table", "other.json", "-q"],
    );
    assert!(output.status.success());
    assert!(output.stdout.is_empty());

    let cleaned = std::fs::read_to_string(dir.path().join("worldmap.svg")).unwrap();
    assert!(cleaned.contains("<path id=\"atlantis\" d=\"M0 0z\" data-iso=\"AQ\"/>"));
    assert!(!cleaned.contains("data-iso=\"FR\""));
}

#[test]
fn test_bare_codes_flag() {
    let dir = workspace();
    std::fs::write(dir.path().join("codes.svg"), "<svg><path id=\"fr\"/></svg>").unwrap();

    let plain = run_cli(dir.path(), &["--file", "codes.svg", "--json"]);
    assert!(plain.status.success());
    let json: serde_json::Value = serde_json::from_slice(&plain.stdout).unwrap();
    assert_eq!(json["report"]["coded_elements"], 0);

    let opted = run_cli(dir.path(), &["--file", "codes.svg", "--json", "--bare-codes"]);
    assert!(opted.status.success());
    let json: serde_json::Value = serde_json::from_slice(&opted.stdout).unwrap();
    assert!(json["svg"].as_str().unwrap().contains("<path id=\"fr\" data-iso=\"FR\"/>"));
}

// ── JSON ──────────────────────────────────────────────────────────────────

#[test]
fn test_json_output() {
    let dir = workspace();
    let output = run_cli(dir.path(), &["--file", "worldmap.svg", "--json"]);
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("stdout is JSON");
    assert!(json["svg"].as_str().unwrap().contains("data-iso=\"ST\""));
    assert_eq!(json["report"]["completed_stages"].as_array().unwrap().len(), 11);
    assert!(json["report"]["failure"].is_null());
    assert_eq!(json["report"]["protected_fragments"], 1);
}
