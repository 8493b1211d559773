//! CLI E2E tests.
//!
//! Each test runs the built binary against its own temporary data directory.

use std::process::Command;

use serde_json::Value;
use tempfile::TempDir;

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(dir: &TempDir, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_studyflow"))
        .args(args)
        .env("STUDYFLOW_DATA_DIR", dir.path())
        .env_remove("STUDYFLOW_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn run_cli_success(dir: &TempDir, args: &[&str]) -> String {
    let (stdout, stderr, code) = run_cli(dir, args);
    assert_eq!(code, 0, "CLI command failed: {args:?}\n{stderr}");
    stdout
}

fn parse_json(stdout: &str) -> Value {
    serde_json::from_str(stdout).expect("Failed to parse JSON output")
}

#[test]
fn test_state_show_on_fresh_dir() {
    let dir = tempfile::tempdir().unwrap();
    let doc = parse_json(&run_cli_success(&dir, &["state", "show"]));

    assert_eq!(doc["schemaVersion"], 1);
    assert_eq!(doc["settings"]["quietHours"], true);
    assert!(dir.path().join("studyflow.db").exists());
    assert!(dir.path().join("config.toml").exists());
}

#[test]
fn test_state_set_and_get() {
    let dir = tempfile::tempdir().unwrap();
    run_cli_success(&dir, &["state", "set", "settings.sound", "false"]);
    let out = run_cli_success(&dir, &["state", "get", "settings.sound"]);
    assert_eq!(out.trim(), "false");

    run_cli_success(&dir, &["state", "set", "settings.theme", "light"]);
    let out = run_cli_success(&dir, &["state", "get", "settings.theme"]);
    assert_eq!(out.trim(), "\"light\"");
}

#[test]
fn test_state_get_missing_path_fails() {
    let dir = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(&dir, &["state", "get", "settings.nope.deeper"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));
}

#[test]
fn test_state_set_rejects_wrong_type() {
    let dir = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(&dir, &["state", "set", "settings.sound", "\"loud\""]);
    assert_eq!(code, 1, "{stderr}");

    let out = run_cli_success(&dir, &["state", "get", "settings.sound"]);
    assert_eq!(out.trim(), "true");
}

#[test]
fn test_slot_add_list_remove() {
    let dir = tempfile::tempdir().unwrap();
    run_cli_success(&dir, &["slot", "add", "Tue", "10", "revision"]);
    run_cli_success(&dir, &["slot", "add", "mon", "9", "class"]);
    run_cli_success(&dir, &["slot", "add", "Lun", "14", "repos"]);

    let rows = parse_json(&run_cli_success(&dir, &["slot", "list", "--json"]));
    let keys: Vec<&str> = rows
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["key"].as_str().unwrap())
        .collect();
    assert_eq!(keys, vec!["Mon-9", "Mon-14", "Tue-10"]);
    assert_eq!(rows[1]["type"], "rest");

    run_cli_success(&dir, &["slot", "remove", "Mon", "9"]);
    let rows = parse_json(&run_cli_success(&dir, &["slot", "list", "--json"]));
    assert_eq!(rows.as_array().unwrap().len(), 2);

    let (_, _, code) = run_cli(&dir, &["slot", "remove", "Mon", "9"]);
    assert_eq!(code, 1);
}

#[test]
fn test_slot_add_rejects_bad_input() {
    let dir = tempfile::tempdir().unwrap();
    let (_, _, code) = run_cli(&dir, &["slot", "add", "Mon", "3", "class"]);
    assert_eq!(code, 1, "hour outside the planning grid");

    let (_, _, code) = run_cli(&dir, &["slot", "add", "Mon", "9", "party"]);
    assert_ne!(code, 0, "unknown slot type");

    let (_, _, code) = run_cli(&dir, &["slot", "add", "Someday", "9", "class"]);
    assert_ne!(code, 0, "unknown day");
}

#[test]
fn test_log_and_stats() {
    let dir = tempfile::tempdir().unwrap();
    run_cli_success(
        &dir,
        &["log", "add", "--stress", "4", "--sleep", "6", "--date", "2024-03-01"],
    );
    run_cli_success(
        &dir,
        &["log", "add", "--stress", "8", "--sleep", "5", "--date", "2024-03-02"],
    );
    run_cli_success(&dir, &["slot", "add", "Wed", "9", "class"]);
    run_cli_success(&dir, &["slot", "add", "Wed", "12", "rest"]);

    let logs = parse_json(&run_cli_success(&dir, &["log", "list", "--last", "1", "--json"]));
    assert_eq!(logs.as_array().unwrap().len(), 1);
    assert_eq!(logs[0]["date"], "2024-03-02");

    let stats = parse_json(&run_cli_success(&dir, &["stats", "--json"]));
    assert_eq!(stats["weekly_load"], 1);
    assert_eq!(stats["rest_ratio"], 0.5);
    assert_eq!(stats["recent"]["avg_stress"], 6.0);
    assert_eq!(stats["recent"]["avg_sleep"], 5.5);
    assert_eq!(stats["recent"]["count"], 2);
    assert_eq!(stats["streak"], 2);
}

#[test]
fn test_log_add_rejects_out_of_range() {
    let dir = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(&dir, &["log", "add", "--stress", "12", "--sleep", "6"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("stress"));
}

#[test]
fn test_safe_mode_check_and_dismiss() {
    let dir = tempfile::tempdir().unwrap();
    let check = parse_json(&run_cli_success(&dir, &["safe-mode", "check", "--json"]));
    assert_eq!(check["active"], false);
    assert_eq!(check["tier"], Value::Null);

    run_cli_success(&dir, &["safe-mode", "dismiss"]);
    let dismissed = run_cli_success(&dir, &["state", "get", "safeMode.dismissedAt"]);
    assert_ne!(dismissed.trim(), "null");
}

#[test]
fn test_quiet_hours_default_window() {
    let dir = tempfile::tempdir().unwrap();
    let out = run_cli_success(&dir, &["quiet-hours", "--hour", "23"]);
    assert!(out.contains("is quiet"), "{out}");
    let out = run_cli_success(&dir, &["quiet-hours", "--hour", "12"]);
    assert!(out.contains("is active"), "{out}");

    run_cli_success(&dir, &["state", "set", "settings.quietHours", "false"]);
    let out = run_cli_success(&dir, &["quiet-hours", "--hour", "2"]);
    assert!(out.contains("is active"), "{out}");
}

#[test]
fn test_quiet_hours_current_hour() {
    let dir = tempfile::tempdir().unwrap();
    let out = run_cli_success(&dir, &["quiet-hours"]);
    assert!(out.contains(":00 is "), "{out}");
    assert!(out.contains("window 23:00-07:00"), "{out}");
}

#[test]
fn test_config_get_set_reset() {
    let dir = tempfile::tempdir().unwrap();
    let out = run_cli_success(&dir, &["config", "get", "quiet_hours.start"]);
    assert_eq!(out.trim(), "23");

    run_cli_success(&dir, &["config", "set", "quiet_hours.start", "22"]);
    let out = run_cli_success(&dir, &["config", "get", "quiet_hours.start"]);
    assert_eq!(out.trim(), "22");
    let out = run_cli_success(&dir, &["quiet-hours", "--hour", "22"]);
    assert!(out.contains("is quiet"), "{out}");

    let (_, _, code) = run_cli(&dir, &["config", "set", "quiet_hours.start", "30"]);
    assert_eq!(code, 1);

    let (_, _, code) = run_cli(&dir, &["config", "get", "no.such.key"]);
    assert_eq!(code, 1);

    run_cli_success(&dir, &["config", "reset"]);
    let out = run_cli_success(&dir, &["config", "get", "quiet_hours.start"]);
    assert_eq!(out.trim(), "23");
}

#[test]
fn test_state_merge() {
    let dir = tempfile::tempdir().unwrap();
    run_cli_success(&dir, &["state", "merge", r#"{"templates": {"exam": ["Mon-9"]}}"#]);
    let out = run_cli_success(&dir, &["state", "get", "templates.exam.0"]);
    assert_eq!(out.trim(), "\"Mon-9\"");

    let (_, _, code) = run_cli(&dir, &["state", "merge", "[1, 2]"]);
    assert_eq!(code, 1);
}
