//! Integration tests for the `powerlink` CLI binary.
//!
//! Argument parsing, help, completions and error exits run without any
//! gateway. The end-to-end cases point a temporary profile at a wiremock
//! server.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `powerlink` binary with env isolation.
///
/// Clears all `POWERLINK_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn powerlink_cmd() -> assert_cmd::Command {
    isolated_cmd(Path::new("/tmp/powerlink-cli-test-nonexistent"))
}

fn isolated_cmd(config_home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("powerlink");
    cmd.env("HOME", config_home)
        .env("XDG_CONFIG_HOME", config_home)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("POWERLINK_PROFILE")
        .env_remove("POWERLINK_HOST")
        .env_remove("POWERLINK_OUTPUT")
        .env_remove("POWERLINK_INSECURE")
        .env_remove("POWERLINK_TIMEOUT")
        .env_remove("POWERLINK_USER_CODE")
        .env_remove("POWERLINK_PASSWORD");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

/// Write a single v3 profile pointing at `host` and return its config home.
fn write_profile(host: &str) -> tempfile::TempDir {
    let home = tempfile::tempdir().unwrap();
    let dir = home.path().join("powerlink");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("config.toml"),
        format!(
            r#"
default_profile = "home"

[profiles.home]
host = "{host}"
user_id = "2d978962-daa6-4e18-a5e5-b4a99100bd3b"
panel_web_name = "123456"
"#
        ),
    )
    .unwrap();
    home
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = powerlink_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    powerlink_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("Visonic")
            .and(predicate::str::contains("status"))
            .and(predicate::str::contains("arm"))
            .and(predicate::str::contains("disarm")),
    );
}

#[test]
fn test_version_flag() {
    powerlink_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("powerlink"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    powerlink_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    powerlink_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_status_without_config() {
    powerlink_cmd()
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration file not found"));
}

#[test]
fn test_set_observation_only_status_is_usage_error() {
    // Fails before config is even read.
    powerlink_cmd()
        .args(["set", "exit-delay"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Cannot set status"));
}

#[test]
fn test_set_unknown_word_is_usage_error() {
    powerlink_cmd()
        .args(["set", "banana"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("banana"));
}

#[test]
fn test_arm_requires_valid_mode() {
    let output = powerlink_cmd().args(["arm", "night"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(text.contains("possible values"), "{text}");
}

#[test]
fn test_invalid_output_format() {
    let output = powerlink_cmd()
        .args(["--output", "xml", "status"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.contains("invalid") || text.contains("possible values"),
        "Expected error about valid output formats:\n{text}"
    );
}

#[test]
fn test_unknown_profile_lists_available() {
    let home = write_profile("gateway.invalid");
    isolated_cmd(home.path())
        .args(["--profile", "cabin", "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cabin").and(predicate::str::contains("home")));
}

#[test]
fn test_config_show_masks_user_code() {
    let home = write_profile("gateway.invalid");
    let cfg = home.path().join("powerlink").join("config.toml");
    let mut text = std::fs::read_to_string(&cfg).unwrap();
    text.push_str("user_code = \"9876\"\n");
    std::fs::write(&cfg, text).unwrap();

    isolated_cmd(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("[profiles.home]")
                .and(predicate::str::contains("****"))
                .and(predicate::str::contains("9876").not()),
        );
}

#[test]
fn test_config_show_reports_malformed_file() {
    let home = write_profile("gateway.invalid");
    let cfg = home.path().join("powerlink").join("config.toml");
    let mut text = std::fs::read_to_string(&cfg).unwrap();
    text.push_str("\n[defaults]\ntimeout_ms = \"soon\"\n");
    std::fs::write(&cfg, text).unwrap();

    isolated_cmd(home.path())
        .args(["config", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("timeout_ms"))
        .stdout(predicate::str::contains("[profiles.home]").not());
}

// ── Against a mock gateway ──────────────────────────────────────────

async fn mock_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/rest_api/3.0/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "session_token": "tok-1"
        })))
        .mount(server)
        .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_status_prints_canonical_state() {
    let server = MockServer::start().await;
    mock_login(&server).await;
    Mock::given(method("GET"))
        .and(path("/rest_api/3.0/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "is_connected": true,
            "partitions": [{"state": "AWAY"}]
        })))
        .mount(&server)
        .await;

    let home = write_profile(&server.uri());
    isolated_cmd(home.path())
        .env("POWERLINK_USER_CODE", "1234")
        .args(["--output", "json-compact", "status"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains(r#""status":"armed_away""#)
                .and(predicate::str::contains(r#""protocol":"v3""#)),
        );

    isolated_cmd(home.path())
        .env("POWERLINK_USER_CODE", "1234")
        .args(["-o", "plain", "status"])
        .assert()
        .success()
        .stdout("away\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_arm_away_posts_command() {
    let server = MockServer::start().await;
    mock_login(&server).await;
    Mock::given(method("POST"))
        .and(path("/web/ajax/security.main.status.ajax.php"))
        .and(body_string_contains("set=ArmAway"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .expect(1)
        .mount(&server)
        .await;

    let home = write_profile(&server.uri());
    isolated_cmd(home.path())
        .env("POWERLINK_USER_CODE", "1234")
        .args(["arm", "away"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Panel set to away"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rejected_login_exits_with_auth_code() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest_api/3.0/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": 10001,
            "error_message": "Wrong user code"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let home = write_profile(&server.uri());
    isolated_cmd(home.path())
        .env("POWERLINK_USER_CODE", "0000")
        .arg("status")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Wrong user code"));
}
