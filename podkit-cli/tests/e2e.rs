//! End-to-end tests for the podkit binary
//!
//! Each test runs the binary against a scratch prefix, data directory and
//! settings file so nothing on the host system is touched.

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn podkit(home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_podkit"))
        .args(args)
        .arg("--config")
        .arg(home.join("settings.toml"))
        .env("PODKIT_PREFIX", home)
        .env("XDG_DATA_HOME", home)
        .env("XDG_CONFIG_HOME", home)
        .env_remove("PODKIT_EXTENSIONS")
        .env_remove("PODKIT_DISABLE_EXTENSIONS")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to run podkit")
}

#[test]
fn podkit_help_works() {
    let home = TempDir::new().unwrap();
    let output = podkit(home.path(), &["--help"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Manage podkit extensions"));
    assert!(stdout.contains("extension"));
}

#[test]
fn podkit_extension_hooks_lists_catalog() {
    let home = TempDir::new().unwrap();
    let output = podkit(home.path(), &["extension", "hooks"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("on_episode_synced(device, episode)"));
    assert!(stdout.contains("+ on_create_menu()"));
    let hooks = stdout
        .lines()
        .filter(|line| line.get(2..).is_some_and(|name| name.starts_with("on_")))
        .count();
    assert_eq!(hooks, 24);
}

#[test]
fn podkit_extension_list_json_is_empty_without_extensions() {
    let home = TempDir::new().unwrap();
    let output = podkit(home.path(), &["extension", "list", "--all", "--json"]);

    assert!(output.status.success());
    let listed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(listed, serde_json::json!([]));
}

#[test]
fn podkit_extension_enable_unknown_fails() {
    let home = TempDir::new().unwrap();
    let output = podkit(home.path(), &["extension", "enable", "ghost"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Extension not found: ghost"));
    assert!(!home.path().join("settings.toml").exists());
}

#[test]
fn podkit_extension_info_unknown_explains() {
    let home = TempDir::new().unwrap();
    let output = podkit(home.path(), &["extension", "info", "ghost"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Extension 'ghost' not found"));
}
