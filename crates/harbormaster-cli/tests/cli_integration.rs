//! CLI subprocess integration tests.
//!
//! These tests invoke the `harbormaster` binary with an isolated `HOME` and the
//! mock engine, and verify exit codes, stdout content, and JSON output shape.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tiny_http::{Header, Response, Server, StatusCode};

const PINNED: &str = "sha256:2222222222222222222222222222222222222222222222222222222222222222";
const NEW: &str = "sha256:1111111111111111111111111111111111111111111111111111111111111111";

fn harbormaster(home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_harbormaster"));
    cmd.env("HOME", home)
        .env_remove("GHCR_TOKEN")
        .env_remove("GITHUB_TOKEN")
        .env_remove("HARBORMASTER_LOG");
    cmd
}

fn write_manifest(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("compose.yaml");
    std::fs::write(&path, content).unwrap();
    path
}

fn stdout_json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "invalid JSON ({e}): {}",
            String::from_utf8_lossy(&output.stdout)
        )
    })
}

/// Registry answering digests for `library/nginx` and 429 for everything else,
/// wired in through `~/.config/harbormaster/registry.json`.
fn start_registry(home: &Path) {
    let server = Server::http("127.0.0.1:0").unwrap();
    let port = server.server_addr().to_ip().unwrap().port();
    std::thread::spawn(move || {
        for request in server.incoming_requests() {
            let url = request.url().to_owned();
            let response = if url.starts_with("/token") {
                Response::from_string(r#"{"token":"anonymous"}"#)
            } else if url.contains("/library/nginx/") {
                Response::from_string("").with_header(
                    Header::from_bytes("Docker-Content-Digest", NEW.as_bytes()).unwrap(),
                )
            } else {
                Response::from_string("").with_status_code(StatusCode(429))
            };
            let _ = request.respond(response);
        }
    });

    let base = format!("http://127.0.0.1:{port}");
    let config = serde_json::json!({
        "docker_hub_auth_url": format!("{base}/token"),
        "endpoints": { "docker.io": base },
    });
    let dir = home.join(".config/harbormaster");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("registry.json"), config.to_string()).unwrap();
}

#[test]
fn cli_version_exits_zero() {
    let home = tempfile::tempdir().unwrap();
    let output = harbormaster(home.path()).arg("--version").output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("harbormaster"));
}

#[test]
fn cli_help_lists_commands() {
    let home = tempfile::tempdir().unwrap();
    let output = harbormaster(home.path()).arg("--help").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["check", "upgrade", "scan", "doctor", "completions"] {
        assert!(stdout.contains(command), "help is missing {command}");
    }
}

#[test]
fn check_digest_pinned_service_offline() {
    let home = tempfile::tempdir().unwrap();
    let project = tempfile::tempdir().unwrap();
    write_manifest(
        project.path(),
        &format!("services:\n  web:\n    image: nginx@{PINNED}\n"),
    );

    let output = harbormaster(home.path())
        .args(["check", "--engine", "mock", "--json"])
        .arg(project.path())
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0));
    let json = stdout_json(&output);
    assert_eq!(json["services"][0]["service_name"], "web");
    assert_eq!(json["services"][0]["status"], "PINNED");
    assert_eq!(json["services"][0]["remote_digest"], PINNED);
    assert_eq!(json["summary"]["pinned"], 1);
}

#[test]
fn check_reports_registry_results() {
    let home = tempfile::tempdir().unwrap();
    start_registry(home.path());
    let project = tempfile::tempdir().unwrap();
    let manifest = write_manifest(
        project.path(),
        "services:\n  web:\n    image: nginx\n  cache:\n    image: redis:7\n",
    );

    let output = harbormaster(home.path())
        .args(["check", "--engine", "mock", "--json"])
        .arg(&manifest)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1), "errors give exit 1");
    let json = stdout_json(&output);
    let services = json["services"].as_array().unwrap();
    assert_eq!(services.len(), 2);
    assert_eq!(services[0]["status"], "NOT_PULLED");
    assert_eq!(services[0]["remote_digest"], NEW);
    assert_eq!(services[1]["status"], "ERROR");
    assert_eq!(services[1]["error"], "rate_limited");
}

#[test]
fn check_missing_manifest_exits_two() {
    let home = tempfile::tempdir().unwrap();
    let project = tempfile::tempdir().unwrap();

    let output = harbormaster(home.path())
        .args(["check", "--engine", "mock"])
        .arg(project.path())
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("manifest error"));
}

#[test]
fn check_build_only_manifest_exits_two() {
    let home = tempfile::tempdir().unwrap();
    let project = tempfile::tempdir().unwrap();
    let manifest = write_manifest(project.path(), "services:\n  app:\n    build: .\n");

    let output = harbormaster(home.path())
        .args(["check", "--engine", "mock"])
        .arg(&manifest)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn check_rejects_zero_timeout() {
    let home = tempfile::tempdir().unwrap();
    let project = tempfile::tempdir().unwrap();
    let manifest = write_manifest(
        project.path(),
        &format!("services:\n  web:\n    image: nginx@{PINNED}\n"),
    );

    let output = harbormaster(home.path())
        .args(["check", "--engine", "mock", "--timeout", "0"])
        .arg(&manifest)
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--timeout"));

    let output = harbormaster(home.path())
        .args(["check", "--engine", "mock", "--timeout", "1", "--json"])
        .arg(&manifest)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn check_unknown_engine_exits_one() {
    let home = tempfile::tempdir().unwrap();
    let project = tempfile::tempdir().unwrap();
    let manifest = write_manifest(
        project.path(),
        &format!("services:\n  web:\n    image: nginx@{PINNED}\n"),
    );

    let output = harbormaster(home.path())
        .args(["check", "--engine", "containerd"])
        .arg(&manifest)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn upgrade_dry_run_reports_plan() {
    let home = tempfile::tempdir().unwrap();
    let project = tempfile::tempdir().unwrap();
    let manifest = write_manifest(
        project.path(),
        "services:\n  web:\n    image: nginx:latest\n  db:\n    image: postgres:15.3.1\n",
    );

    let output = harbormaster(home.path())
        .args(["upgrade", "--dry-run", "--engine", "mock", "--json"])
        .arg(&manifest)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0));
    let json = stdout_json(&output);
    assert_eq!(json["final_state"], "DONE");
    assert_eq!(json["plan"]["selected_services"], serde_json::json!(["web"]));
    assert_eq!(json["plan"]["skipped_services"], serde_json::json!(["db"]));
    assert_eq!(
        json["transitions"],
        serde_json::json!(["SCAN", "PLAN", "REPORT", "DONE"])
    );
}

#[test]
fn upgrade_unattended_runs_every_phase() {
    let home = tempfile::tempdir().unwrap();
    let project = tempfile::tempdir().unwrap();
    let manifest = write_manifest(project.path(), "services:\n  web:\n    image: nginx\n");

    let output = harbormaster(home.path())
        .args(["upgrade", "--yes", "--engine", "mock", "--json"])
        .arg(&manifest)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0));
    let json = stdout_json(&output);
    assert_eq!(
        json["transitions"],
        serde_json::json!(["SCAN", "PLAN", "CONFIRM", "PULL", "STOP", "START", "PRUNE", "DONE"])
    );
}

#[test]
fn upgrade_with_only_pinned_tags_does_nothing() {
    let home = tempfile::tempdir().unwrap();
    let project = tempfile::tempdir().unwrap();
    let manifest = write_manifest(project.path(), "services:\n  db:\n    image: postgres:16.2.1\n");

    let output = harbormaster(home.path())
        .args(["upgrade", "--yes", "--engine", "mock"])
        .arg(&manifest)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stdout).contains("nothing to upgrade"));
}

#[test]
fn scan_lists_manifests() {
    let home = tempfile::tempdir().unwrap();
    let root = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(root.path().join("media")).unwrap();
    write_manifest(
        &root.path().join("media"),
        "services:\n  jellyfin:\n    image: jellyfin/jellyfin\n",
    );

    let output = harbormaster(home.path())
        .args(["scan", "--json"])
        .arg(root.path())
        .output()
        .unwrap();

    assert!(output.status.success());
    let json = stdout_json(&output);
    let found = json.as_array().unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["services"], serde_json::json!(["jellyfin"]));
}

#[test]
fn doctor_json_with_mock_engine() {
    let home = tempfile::tempdir().unwrap();
    let output = harbormaster(home.path())
        .args(["doctor", "--engine", "mock", "--json"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0));
    let json = stdout_json(&output);
    assert_eq!(json["healthy"], true);
    assert!(json["checks"].as_array().unwrap().len() >= 2);
}

#[test]
fn completions_bash_mentions_binary() {
    let home = tempfile::tempdir().unwrap();
    let output = harbormaster(home.path())
        .args(["completions", "bash"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("harbormaster"));
}
