//! Integration tests for the `pigmea` CLI binary.
//!
//! Argument parsing, help output, completions, config handling and error
//! exit codes, all without a live backend.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a command for the `pigmea` binary with env isolation.
///
/// Clears all `PIGMEA_*` env vars and points config directories at `home`
/// so tests never touch the user's real configuration.
fn pigmea_cmd(home: &std::path::Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("pigmea");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("PIGMEA_PROFILE")
        .env_remove("PIGMEA_BACKEND")
        .env_remove("PIGMEA_TOKEN")
        .env_remove("PIGMEA_OUTPUT")
        .env_remove("PIGMEA_INSECURE")
        .env_remove("PIGMEA_TIMEOUT")
        .env_remove("RUST_LOG");
    cmd
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let home = tempfile::tempdir().unwrap();
    let output = pigmea_cmd(home.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("Usage"));
}

#[test]
fn test_help_lists_commands() {
    let home = tempfile::tempdir().unwrap();
    pigmea_cmd(home.path()).arg("--help").assert().success().stdout(
        predicate::str::contains("clients")
            .and(predicate::str::contains("reps"))
            .and(predicate::str::contains("orders"))
            .and(predicate::str::contains("watch"))
            .and(predicate::str::contains("check")),
    );
}

#[test]
fn test_version_flag() {
    let home = tempfile::tempdir().unwrap();
    pigmea_cmd(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("pigmea"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    let home = tempfile::tempdir().unwrap();
    pigmea_cmd(home.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    let home = tempfile::tempdir().unwrap();
    pigmea_cmd(home.path())
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_init_then_show() {
    let home = tempfile::tempdir().unwrap();
    pigmea_cmd(home.path())
        .args([
            "config",
            "init",
            "--name",
            "taller",
            "--url",
            "http://192.168.1.20:8080",
            "--user-id",
            "u-7",
            "--role",
            "Operador",
        ])
        .assert()
        .success();

    pigmea_cmd(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("taller")
                .and(predicate::str::contains("http://192.168.1.20:8080"))
                .and(predicate::str::contains("Operador")),
        );
}

#[test]
fn test_config_show_json() {
    let home = tempfile::tempdir().unwrap();
    let output = pigmea_cmd(home.path())
        .args(["config", "show", "--output", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(parsed["defaults"]["validation_min_length"], 3);
}

#[test]
fn test_role_requires_user_id() {
    let home = tempfile::tempdir().unwrap();
    pigmea_cmd(home.path())
        .args(["config", "init", "--role", "Operador"])
        .assert()
        .failure()
        .code(2);
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let home = tempfile::tempdir().unwrap();
    let output = pigmea_cmd(home.path()).arg("foobar").output().unwrap();
    assert!(!output.status.success());
    assert!(combined_output(&output).contains("foobar"));
}

#[test]
fn test_list_without_backend_is_usage_error() {
    let home = tempfile::tempdir().unwrap();
    pigmea_cmd(home.path())
        .args(["clients", "list"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("config init"));
}

#[test]
fn test_unknown_profile() {
    let home = tempfile::tempdir().unwrap();
    pigmea_cmd(home.path())
        .args(["--profile", "almacen", "orders", "list"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("almacen"));
}

#[test]
fn test_unreachable_backend_fails_initial_load() {
    let home = tempfile::tempdir().unwrap();
    // Port 9 (discard) on loopback refuses connections.
    pigmea_cmd(home.path())
        .args(["--backend", "http://127.0.0.1:9", "--timeout", "5", "reps", "list"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Initial load"));
}

#[test]
fn test_bad_stage_value() {
    let home = tempfile::tempdir().unwrap();
    pigmea_cmd(home.path())
        .args(["--backend", "http://127.0.0.1:9", "orders", "list", "--stage", "horno"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("horno"));
}
