//! Integration tests for the `jablosync` CLI binary.
//!
//! Argument parsing, help output, completions, and the config
//! subcommands. Nothing here reaches the Jablonet cloud.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

const NO_HOME: &str = "/tmp/jablosync-cli-test-nonexistent";

/// Build a [`Command`] for the binary with its config rooted at `home`.
///
/// Clears every `JABLOSYNC_*` variable so tests never see the user's
/// real profile or secrets.
fn jablosync_at(home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("jablosync");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home)
        .env_remove("JABLOSYNC_PROFILE")
        .env_remove("JABLOSYNC_OUTPUT")
        .env_remove("JABLOSYNC_TIMEOUT")
        .env_remove("JABLOSYNC_USERNAME")
        .env_remove("JABLOSYNC_PASSWORD")
        .env_remove("JABLOSYNC_PIN")
        .env_remove("JABLOSYNC_COMMAND_PIN");
    cmd
}

fn jablosync_cmd() -> assert_cmd::Command {
    jablosync_at(Path::new(NO_HOME))
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = jablosync_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    jablosync_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("Jablotron")
            .and(predicate::str::contains("status"))
            .and(predicate::str::contains("arm"))
            .and(predicate::str::contains("disarm"))
            .and(predicate::str::contains("gate")),
    );
}

#[test]
fn test_version_flag() {
    jablosync_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("jablosync"));
}

#[test]
fn test_arm_help_lists_code_options() {
    jablosync_cmd().args(["arm", "--help"]).assert().success().stdout(
        predicate::str::contains("--pin")
            .and(predicate::str::contains("--ask-pin"))
            .and(predicate::str::contains("--home"))
            .and(predicate::str::contains("--no-bypass")),
    );
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    jablosync_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    jablosync_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("jablosync"));
}

// ── Argument validation ─────────────────────────────────────────────

#[test]
fn test_invalid_output_format() {
    let output = jablosync_cmd()
        .args(["-o", "xml", "status"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("xml"));
}

#[test]
fn test_gate_requires_state() {
    let output = jablosync_cmd().args(["gate", "PG1"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_pin_conflicts_with_ask_pin() {
    let output = jablosync_cmd()
        .args(["disarm", "S1", "--pin", "1234", "--ask-pin"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("cannot be used with"));
}

// ── Missing configuration ───────────────────────────────────────────

#[test]
fn test_status_without_profile_is_not_found() {
    let output = jablosync_cmd().arg("status").output().unwrap();
    assert_eq!(output.status.code(), Some(4));
    assert!(combined_output(&output).contains("default"));
}

#[test]
fn test_arm_with_unknown_profile() {
    let output = jablosync_cmd()
        .args(["-p", "cottage", "arm", "S1"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
    assert!(combined_output(&output).contains("cottage"));
}

// ── Config subcommands ──────────────────────────────────────────────

#[test]
fn test_config_path() {
    let home = tempfile::tempdir().unwrap();
    jablosync_at(home.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_set_then_show() {
    let home = tempfile::tempdir().unwrap();

    jablosync_at(home.path())
        .args(["config", "set", "username", "owner@example.com"])
        .assert()
        .success();
    jablosync_at(home.path())
        .args(["config", "set", "poll_interval_secs", "45"])
        .assert()
        .success();
    jablosync_at(home.path())
        .args(["config", "set", "pin", "1234"])
        .assert()
        .success();

    jablosync_at(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("owner@example.com")
                .and(predicate::str::contains("poll_interval_secs = 45"))
                .and(predicate::str::contains("pin = \"****\""))
                .and(predicate::str::contains("1234").not()),
        );
}

#[test]
fn test_config_set_rejects_short_interval() {
    let home = tempfile::tempdir().unwrap();
    let output = jablosync_at(home.path())
        .args(["config", "set", "poll_interval_secs", "5"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("poll_interval_secs"));

    // Nothing was written.
    jablosync_at(home.path())
        .args(["config", "profiles"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_config_set_unknown_key() {
    let home = tempfile::tempdir().unwrap();
    let output = jablosync_at(home.path())
        .args(["config", "set", "color_scheme", "dark"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("unknown config key"));
}

#[test]
fn test_config_use_switches_default() {
    let home = tempfile::tempdir().unwrap();

    jablosync_at(home.path())
        .args(["-p", "cottage", "config", "set", "username", "a@example.com"])
        .assert()
        .success();
    jablosync_at(home.path())
        .args(["-p", "flat", "config", "set", "username", "b@example.com"])
        .assert()
        .success();

    jablosync_at(home.path())
        .args(["config", "use", "flat"])
        .assert()
        .success();
    jablosync_at(home.path())
        .args(["config", "profiles"])
        .assert()
        .success()
        .stdout(predicate::str::contains("flat *").and(predicate::str::contains("cottage")));
}

#[test]
fn test_config_use_unknown_profile() {
    let home = tempfile::tempdir().unwrap();
    let output = jablosync_at(home.path())
        .args(["config", "use", "nowhere"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
}
