//! End-to-end tests for the space binary that need no storage service
//!
//! Each test runs against its own config directory. The configured endpoint
//! points at a closed local port, so anything that would reach the network
//! fails instead of touching a real bucket.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

const UNREACHABLE_ENDPOINT: &str = "http://127.0.0.1:1";

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("Failed to create temp dir"),
        }
    }

    /// Workspace with a connection and a bucket for `dev`
    fn configured() -> Self {
        let ws = Self::new();
        let output = ws.run(&["config", "connection", UNREACHABLE_ENDPOINT, "key", "secret"]);
        assert!(output.status.success(), "{}", stderr(&output));
        let output = ws.run(&["config", "env", "dev", "artifacts-dev"]);
        assert!(output.status.success(), "{}", stderr(&output));
        ws
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn config_dir(&self) -> PathBuf {
        self.root().join("config")
    }

    fn file(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, content).unwrap();
        path
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_space"))
            .args(args)
            .current_dir(self.root())
            .env("SPACE_CONFIG_DIR", self.config_dir())
            .env_remove("SPACE_ENV")
            .env_remove("SPACE_ENDPOINT")
            .env_remove("SPACE_ACCESS_KEY")
            .env_remove("SPACE_SECRET_KEY")
            .env_remove("RUST_LOG")
            .output()
            .expect("Failed to execute space")
    }
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

#[test]
fn test_unknown_environment_is_usage_error() {
    let ws = Workspace::configured();
    let file = ws.file("app.zip", "zip");

    let output = ws.run(&["--env", "prod", "push", file.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("Unknown environment"));
}

#[test]
fn test_unconfigured_environment_is_usage_error() {
    let ws = Workspace::configured();
    let output = ws.run(&["--env", "live", "ls"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("live"));
}

#[test]
fn test_env_var_selects_environment() {
    let ws = Workspace::configured();
    let output = Command::new(env!("CARGO_BIN_EXE_space"))
        .args(["ls"])
        .env("SPACE_CONFIG_DIR", ws.config_dir())
        .env("SPACE_ENV", "staging")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("staging"));
}

#[test]
fn test_malformed_tags_are_rejected() {
    let ws = Workspace::configured();
    let file = ws.file("app.zip", "zip");

    let output = ws.run(&["push", "-t", "version", file.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("Invalid tags"));
}

#[test]
fn test_push_directory_without_recursive() {
    let ws = Workspace::configured();
    ws.file("dist/index.html", "<html>");

    let output = ws.run(&["push", "dist"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("--recursive"));
}

#[test]
fn test_push_missing_file() {
    let ws = Workspace::configured();
    let output = ws.run(&["push", "missing.zip"]);
    assert_eq!(output.status.code(), Some(5));
}

#[test]
fn test_unreachable_endpoint_is_network_error() {
    let ws = Workspace::configured();
    let file = ws.file("app.zip", "zip");

    let output = ws.run(&["--timeout", "5", "push", file.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(3), "{}", stderr(&output));
}

#[test]
fn test_missing_connection() {
    let ws = Workspace::new();
    let output = ws.run(&["config", "env", "dev", "artifacts-dev"]);
    assert!(output.status.success());

    let output = ws.run(&["ls"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("No connection configured"));
}

#[test]
fn test_config_env_rejects_unknown_name() {
    let ws = Workspace::new();
    let output = ws.run(&["config", "env", "staging", "artifacts-staging"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_config_show_json_hides_secret() {
    let ws = Workspace::configured();
    let output = ws.run(&["--json", "config", "show"]);
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(json["environments"]["dev"], "artifacts-dev");
    assert_eq!(json["connection"]["endpoint"], UNREACHABLE_ENDPOINT);
    assert!(json["connection"].get("secret_key").is_none());
    assert_eq!(json["defaults"]["timeout_secs"], 180);
}

#[test]
fn test_config_defaults_change_environment() {
    let ws = Workspace::configured();
    let output = ws.run(&["config", "defaults", "--environment", "live"]);
    assert!(output.status.success(), "{}", stderr(&output));

    // live has no bucket yet, so the new default fails closed
    let output = ws.run(&["ls"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("live"));
}

#[test]
fn test_config_defaults_output_json() {
    let ws = Workspace::configured();
    let output = ws.run(&["config", "defaults", "--output", "json"]);
    assert!(output.status.success(), "{}", stderr(&output));

    let output = ws.run(&["config", "show"]);
    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(json["defaults"]["output"], "json");
}

#[test]
fn test_remove_requires_keys() {
    let ws = Workspace::configured();
    let output = ws.run(&["rm"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_remove_recursive_refuses_whole_bucket() {
    let ws = Workspace::configured();
    let output = ws.run(&["rm", "--recursive", "/"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_completions() {
    let ws = Workspace::new();
    let output = ws.run(&["completions", "bash"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("space"));
}
