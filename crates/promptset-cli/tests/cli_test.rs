//! Integration tests for the `promptset` binary.
//!
//! Each test runs the real binary against its own temporary data
//! directory, so state carries across invocations exactly as it would for
//! a user.

use std::process::{Command, Output};

use serde_json::Value;

use promptset_test_utils::{TestDataDir, raw_preset};

// -----------------------------------------------------------------------
// Helpers
// -----------------------------------------------------------------------

fn promptset(dir: &TestDataDir, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_promptset"))
        .arg("--data-dir")
        .arg(dir.path())
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run promptset")
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn json(dir: &TestDataDir, args: &[&str]) -> (bool, Value) {
    let mut full = vec!["--json"];
    full.extend_from_slice(args);
    let out = promptset(dir, &full);
    let value = serde_json::from_slice(&out.stdout).expect("stdout should be JSON");
    (out.status.success(), value)
}

fn seeded_dir() -> TestDataDir {
    let dir = TestDataDir::new();
    dir.write_raw_preset(
        "rp",
        &raw_preset(&[("A", "alpha"), ("B", "beta"), ("C", "gamma")], Some("SYS")),
    );
    let out = promptset(&dir, &["refresh"]);
    assert!(out.status.success(), "refresh failed: {out:?}");
    dir
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------

#[test]
fn refresh_then_list() {
    let dir = seeded_dir();
    let out = promptset(&dir, &["list"]);
    assert!(out.status.success());
    let text = stdout(&out);
    assert!(text.contains("Preset: rp"));
    assert!(text.contains("  0. A"));
    assert!(text.contains("No prompts are active."));
}

#[test]
fn activation_persists_between_invocations() {
    let dir = seeded_dir();
    assert!(promptset(&dir, &["activate", "2,0"]).status.success());

    let out = promptset(&dir, &["render", "--system", "orig"]);
    assert!(out.status.success());
    assert_eq!(stdout(&out).trim_end(), "SYS\n\ngamma\n\nalpha\n\norig");

    let (ok, value) = json(&dir, &["deactivate", "all"]);
    assert!(ok);
    assert_eq!(value["payload"], 2);
}

#[test]
fn failed_operation_exits_nonzero() {
    let dir = seeded_dir();
    let out = promptset(&dir, &["activate", "9"]);
    assert_eq!(out.status.code(), Some(2));
    let err = String::from_utf8_lossy(&out.stderr);
    assert!(err.contains("invalid prompt indices: 9"), "stderr: {err}");

    let (ok, value) = json(&dir, &["activate", "@missing"]);
    assert!(!ok);
    assert_eq!(value["success"], false);
    assert_eq!(value["error"], "not_found");
    assert_eq!(promptset(&dir, &["activate", "@missing"]).status.code(), Some(3));
}

#[test]
fn groups_and_user_prompts() {
    let dir = seeded_dir();
    assert!(promptset(&dir, &["add", "mine", "custom text"]).status.success());
    assert!(promptset(&dir, &["group", "create", "focus", "3,1"]).status.success());

    let (ok, value) = json(&dir, &["activate", "@focus"]);
    assert!(ok);
    let names: Vec<&str> = value["payload"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["mine", "B"]);

    let out = promptset(&dir, &["edit", "0", "A", "nope"]);
    assert!(!out.status.success());
    assert!(promptset(&dir, &["delete", "3"]).status.success());

    let out = promptset(&dir, &["group", "list"]);
    assert!(stdout(&out).contains("@focus: 3.(invalid), 1.B"));
}

#[test]
fn create_preset_switches_to_it() {
    let dir = seeded_dir();
    assert!(promptset(&dir, &["create-preset", "notes"]).status.success());
    let (_, value) = json(&dir, &["presets"]);
    assert_eq!(value["current"], "notes");
    assert_eq!(value["presets"], serde_json::json!(["notes", "rp"]));

    assert!(!promptset(&dir, &["use", "5"]).status.success());
    assert!(promptset(&dir, &["use", "1"]).status.success());
    let (_, value) = json(&dir, &["presets"]);
    assert_eq!(value["current"], "rp");
}
