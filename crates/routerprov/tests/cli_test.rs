//! Integration tests for the `routerprov` CLI binary.
//!
//! Argument parsing, help output, completions, config handling and the
//! envelope-to-exit-code mapping. Every workflow exercised here stops at
//! request validation, so no router or vCenter is needed.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

// ── Helpers ─────────────────────────────────────────────────────────

/// `routerprov` with env isolation: no `ROUTERPROV_*` variables and config
/// directories pointed at a nonexistent path.
fn routerprov_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("routerprov");
    cmd.env("HOME", "/tmp/routerprov-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/routerprov-cli-test-nonexistent")
        .env("XDG_DATA_HOME", "/tmp/routerprov-cli-test-nonexistent")
        .env_remove("ROUTERPROV_CONFIG")
        .env_remove("ROUTERPROV_OUTPUT")
        .env_remove("ROUTERPROV_PASSWORD")
        .env_remove("ROUTERPROV_COMPUTE_PASSWORD")
        .env_remove("ROUTERPROV_DEVICE__SCHEME")
        .env_remove("ROUTERPROV_CERTIFICATES__STRATEGY")
        .env_remove("RUST_LOG");
    cmd
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

fn write_request(dir: &Path, name: &str, body: &Value) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body.to_string()).unwrap();
    path
}

fn side(reach: Value) -> Value {
    let mut side = reach;
    side["username"] = json!("admin");
    side["password"] = json!("secret");
    side
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = routerprov_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    routerprov_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("tunnel")
            .and(predicate::str::contains("vpn"))
            .and(predicate::str::contains("compute"))
            .and(predicate::str::contains("serve")),
    );
}

#[test]
fn test_version_flag() {
    routerprov_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("routerprov"));
}

#[test]
fn test_unknown_subcommand_fails() {
    routerprov_cmd()
        .arg("frobnicate")
        .assert()
        .failure()
        .code(2);
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    routerprov_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("routerprov"));
}

#[test]
fn test_completions_zsh() {
    routerprov_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path_honors_flag() {
    routerprov_cmd()
        .args(["config", "path", "--config", "/tmp/elsewhere/routerprov.toml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/tmp/elsewhere/routerprov.toml"));
}

#[test]
fn test_config_init_then_show() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    let path_str = path.to_str().unwrap();

    routerprov_cmd()
        .args(["config", "init", "--config", path_str])
        .assert()
        .success();
    assert!(path.exists());

    let output = routerprov_cmd()
        .args(["config", "show", "--config", path_str, "-o", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let shown: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(shown["server"]["bind"], "127.0.0.1:3000");
    assert_eq!(shown["certificates"]["strategy"], "local");
}

#[test]
fn test_config_init_refuses_to_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[server]\nbind = \"0.0.0.0:8080\"\n").unwrap();

    routerprov_cmd()
        .args(["config", "init", "--config", path.to_str().unwrap()])
        .assert()
        .failure()
        .code(2);
    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.contains("0.0.0.0:8080"));
}

#[test]
fn test_config_show_rejects_unknown_strategy() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[certificates]\nstrategy = \"hsm\"\n").unwrap();

    let output = routerprov_cmd()
        .args(["config", "show", "--config", path.to_str().unwrap()])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("certificates.strategy"));
}

// ── Request files ───────────────────────────────────────────────────

#[test]
fn test_malformed_request_file_is_a_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tunnel.json");
    std::fs::write(&path, "{ \"tunnelType\": ").unwrap();

    let output = routerprov_cmd()
        .args(["tunnel", "create", "-f", path.to_str().unwrap()])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("invalid request"));
}

#[test]
fn test_missing_request_file_fails() {
    routerprov_cmd()
        .args(["vpn", "create", "-f", "/tmp/routerprov-no-such-request.json"])
        .assert()
        .failure()
        .code(1);
}

// ── Envelope status → exit code ─────────────────────────────────────

#[test]
fn test_missing_destination_address_exits_with_usage_code() {
    let dir = tempfile::tempdir().unwrap();
    let request = json!({
        "tunnelType": "gre",
        "source": side(json!({"local": {"address": "10.0.0.1", "port": 443}})),
        "destination": side(json!({})),
    });
    let path = write_request(dir.path(), "tunnel.json", &request);

    let output = routerprov_cmd()
        .args(["--color", "never", "tunnel", "create", "-f", path.to_str().unwrap()])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("[406] You should provide one of local or public IP for destination"),
        "unexpected output:\n{stdout}"
    );
}

#[test]
fn test_unknown_tunnel_type_exits_cleanly_with_204_envelope() {
    let dir = tempfile::tempdir().unwrap();
    let request = json!({
        "tunnelType": "wireguard",
        "source": side(json!({"local": {"address": "10.0.0.1", "port": 443}})),
        "destination": side(json!({"public": {"address": "203.0.113.5", "port": 443}})),
    });
    let path = write_request(dir.path(), "tunnel.json", &request);

    let output = routerprov_cmd()
        .args(["-o", "json", "tunnel", "create", "-f", path.to_str().unwrap()])
        .output()
        .unwrap();
    assert!(output.status.success());
    let envelope: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(envelope["status"], 204);
    assert!(envelope["data"].is_null());
}

#[test]
fn test_vpn_placeholder_reads_request_from_stdin() {
    let request = json!({
        "vpnType": "pptp",
        "router": {"local": {"address": "192.168.88.1", "port": 443}},
        "credential": {"username": "admin", "password": "secret"},
    });

    let output = routerprov_cmd()
        .args(["-o", "plain", "vpn", "create", "-f", "-"])
        .write_stdin(request.to_string())
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("pptp"));
}

#[test]
fn test_device_validate_rejects_bad_address() {
    routerprov_cmd()
        .args([
            "--color",
            "never",
            "device",
            "validate",
            "--address",
            "not an address!",
            "--password",
            "secret",
        ])
        .assert()
        .failure()
        .code(2)
        .stdout(predicate::str::contains("[406]"));
}

#[test]
fn test_device_command_without_password_and_no_tty_fails() {
    routerprov_cmd()
        .args(["device", "addresses", "--address", "10.0.0.1"])
        .write_stdin("")
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("password"));
}
