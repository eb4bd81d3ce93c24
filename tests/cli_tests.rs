//! CLI integration tests for legacy-dao.
//!
//! These tests run the binary against a temporary embedded database and
//! check its JSON output and exit codes.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Get a command for the legacy-dao binary.
fn cmd() -> Command {
    let mut cmd = Command::cargo_bin("legacy-dao").unwrap();
    cmd.env_remove("LEGACY_DAO_DB").env_remove("RUST_LOG");
    cmd
}

/// Writes a configuration whose default database lives in `dir`.
fn write_config(dir: &Path) -> PathBuf {
    let db = dir.join("legacy.db");
    let config = dir.join("config.toml");
    fs::write(
        &config,
        format!("[default]\npath = '{}'\n\n[logging]\nlevel = \"warn\"\n", db.display()),
    )
    .unwrap();
    config
}

fn cmd_with_config(config: &Path) -> Command {
    let mut cmd = cmd();
    cmd.arg("--config").arg(config);
    cmd
}

// =============================================================================
// Help and Validation Commands
// =============================================================================

#[test]
fn test_help_shows_all_commands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("init-db"))
        .stdout(predicate::str::contains("search"))
        .stdout(predicate::str::contains("eligible"))
        .stdout(predicate::str::contains("exclude"))
        .stdout(predicate::str::contains("check-cpf"));
}

#[test]
fn test_check_cpf() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    cmd_with_config(&config)
        .args(["check-cpf", "12345678901"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"valid\": true"));

    cmd_with_config(&config)
        .args(["check-cpf", "11111111111"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"valid\": false"));
}

#[test]
fn test_check_date() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    cmd_with_config(&config)
        .args(["check-date", "15/08/2010"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"valid\": true"));

    cmd_with_config(&config)
        .args(["check-date", "2010-08-15"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"valid\": false"));
}

#[test]
fn test_missing_config_file_fails() {
    cmd()
        .args(["--config", "/nonexistent/legacy-dao.toml", "check-cpf", "12345678901"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

// =============================================================================
// Database Commands
// =============================================================================

#[test]
fn test_insert_then_list_by_codes() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    cmd_with_config(&config)
        .arg("init-db")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"missing_tables\": []"));

    cmd_with_config(&config)
        .args([
            "insert",
            "--code",
            "42",
            "--name",
            "MARIA LIMA",
            "--enrollment",
            "MT42",
            "--birth-date",
            "15/03/2012",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"result\": 1"));

    cmd_with_config(&config)
        .args(["codes", "42-43"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"code\": \"42\""))
        .stdout(predicate::str::contains("\"birth_date\": \"15/03/2012\""));

    cmd_with_config(&config)
        .args(["search", "--name", "lima"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[]"));
}

#[test]
fn test_insert_rejects_malformed_birth_date() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    cmd_with_config(&config)
        .args(["insert", "--code", "1", "--name", "ANA", "--birth-date", "2012-03-15"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("dd/mm/yyyy"));
}

#[test]
fn test_queries_without_schema_fail() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    cmd_with_config(&config)
        .args(["eligible", "--school", "1001", "--year", "2024"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("statement preparation"));
}

#[test]
fn test_db_flag_overrides_config_path() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());
    let other = dir.path().join("other.db");

    cmd_with_config(&config)
        .arg("--db")
        .arg(&other)
        .arg("init-db")
        .assert()
        .success();
    assert!(other.exists());

    cmd_with_config(&config)
        .arg("--db")
        .arg(&other)
        .args(["exclude", "1-2", "--school", "1001"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"updated\": 0"));
}
