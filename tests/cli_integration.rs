//! CLI Integration Tests
//!
//! Tests the command-line interface end-to-end against a throwaway data
//! directory configured through a local `.canvasflow.toml`.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get the binary to test.
fn canvasflow() -> Command {
    Command::cargo_bin("canvasflow").unwrap()
}

/// Working directory whose config points the store into itself.
fn workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("data");
    fs::write(
        dir.path().join(".canvasflow.toml"),
        format!("[store]\ndata_dir = '{}'\n", data.display()),
    )
    .unwrap();
    dir
}

fn run_in(dir: &Path) -> Command {
    let mut cmd = canvasflow();
    cmd.current_dir(dir)
        .env_remove("OPENAI_API_KEY")
        .env_remove("ANTHROPIC_API_KEY")
        .env_remove("RUST_LOG")
        .env("OLLAMA_HOST", "http://127.0.0.1:9");
    cmd
}

// ============================================================================
// Help & Version Tests
// ============================================================================

#[test]
fn test_help_flag() {
    canvasflow()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("generates and revises code and document artifacts"));
}

#[test]
fn test_version_flag() {
    canvasflow()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_ask_help() {
    canvasflow()
        .args(["ask", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--document"));
}

#[test]
fn test_missing_subcommand_fails() {
    canvasflow().assert().failure();
}

// ============================================================================
// Config Command Tests
// ============================================================================

#[test]
fn test_config_path() {
    canvasflow()
        .args(["config", "--path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_shows_local_file() {
    let dir = workspace();
    run_in(dir.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("[store]"))
        .stdout(predicate::str::contains("similarity_threshold = 0.5"));
}

// ============================================================================
// Store Commands
// ============================================================================

#[test]
fn test_recent_empty() {
    let dir = workspace();
    run_in(dir.path()).arg("recent").assert().success().stdout("No artifacts yet.\n");
}

#[test]
fn test_recent_lists_registry() {
    let dir = workspace();
    let data = dir.path().join("data");
    fs::create_dir_all(&data).unwrap();
    fs::write(
        data.join("registry.json"),
        r#"{"last_identifier": "sales_chart", "recent": ["sales_chart", "invoice_report"]}"#,
    )
    .unwrap();

    run_in(dir.path())
        .arg("recent")
        .assert()
        .success()
        .stdout(predicate::str::contains(" 1. sales_chart"))
        .stdout(predicate::str::contains(" 2. invoice_report"));
}

#[test]
fn test_show_resolves_approximate_identifier() {
    let dir = workspace();
    let content = dir.path().join("data").join("content");
    fs::create_dir_all(&content).unwrap();
    fs::write(
        content.join("invoice_report.json"),
        r##"{"content": "# Invoices", "metadata": {"generator_type": "document", "document_format": "md"}}"##,
    )
    .unwrap();

    run_in(dir.path())
        .args(["show", "invoice-report", "--metadata"])
        .assert()
        .success()
        .stdout(predicate::str::contains("# invoice_report.json"))
        .stdout(predicate::str::contains("\"document_format\": \"md\""))
        .stdout(predicate::str::contains("# Invoices"));
}

#[test]
fn test_show_unknown_identifier_fails() {
    let dir = workspace();
    run_in(dir.path())
        .args(["show", "zzz_unrelated_xyz"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No content found"));
}

// ============================================================================
// Ask Command Tests
// ============================================================================

#[test]
fn test_ask_without_provider_fails() {
    let dir = workspace();
    run_in(dir.path())
        .args(["ask", "hello"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No completion provider available"));
}

// ============================================================================
// Completions
// ============================================================================

#[test]
fn test_completions_bash() {
    canvasflow()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("canvasflow"));
}
