//! Binary tests for `dfp`

mod common;

use assert_cmd::Command;
use common::fixtures::write_upload;
use predicates::prelude::*;
use serde_json::json;

fn dfp() -> Command {
    let mut cmd = Command::cargo_bin("dfp").unwrap();
    cmd.env_remove("DFP_SERVER_URL")
        .env_remove("DFP_TOKEN")
        .env_remove("DFP_POLL_MAX_ATTEMPTS")
        .env_remove("DFP_POLL_INTERVAL_MS")
        .env("NO_COLOR", "1");
    cmd
}

#[test]
fn test_help_lists_commands() {
    dfp()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("submit"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("history"));
}

#[test]
fn test_missing_server_url_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    std::fs::write(&config, "").unwrap();

    dfp()
        .args(["--config", config.to_str().unwrap(), "status", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no server URL configured"));
}

#[test]
fn test_bad_slot_argument_is_rejected() {
    dfp()
        .args([
            "submit", "--year", "2021", "--quarter", "Q1", "--program", "tanf", "--org", "1",
            "--file", "report.csv",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("SLOT=PATH"));
}

#[test]
fn test_invalid_extension_never_reaches_server() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_upload(dir.path(), "report.pdf");

    dfp()
        .args([
            "--server",
            "http://127.0.0.1:9",
            "submit",
            "--year",
            "2021",
            "--quarter",
            "Q1",
            "--program",
            "tanf",
            "--org",
            "1",
            "--file",
        ])
        .arg(format!("active={}", path.display()))
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported extension"));
}

#[test]
fn test_submit_waits_for_final_status() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_upload(dir.path(), "report.txt");

    let mut server = mockito::Server::new();
    let create = server
        .mock("POST", "/v1/data_files/")
        .with_status(201)
        .with_body(r#"{"id": 1}"#)
        .create();
    let status = server
        .mock("GET", "/v1/data_files/1/summary/")
        .with_status(200)
        .with_body(r#"{"status": "Accepted", "error_count": 0}"#)
        .create();

    dfp()
        .env("DFP_SERVER_URL", server.url())
        .env("DFP_POLL_INTERVAL_MS", "10")
        .args([
            "submit", "--year", "2021", "--quarter", "Q1", "--program", "tanf", "--org", "1",
            "--file",
        ])
        .arg(format!("active={}", path.display()))
        .assert()
        .success()
        .stdout(predicate::str::contains("Created record #1"))
        .stdout(predicate::str::contains(
            "Successfully submitted section(s): Active Case Data",
        ))
        .stdout(predicate::str::contains("Accepted"));

    create.assert();
    status.assert();
}

#[test]
fn test_status_command() {
    let mut server = mockito::Server::new();
    server
        .mock("GET", "/v1/data_files/12/summary/")
        .with_status(200)
        .with_body(r#"{"status": "Rejected", "error_count": 4}"#)
        .create();

    dfp()
        .args(["--server", &server.url(), "status", "12"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Record #12: Rejected (4 errors)"));
}

#[test]
fn test_history_json_paginates_buckets() {
    let records: Vec<_> = (1..=7)
        .map(|id| {
            json!({
                "id": id,
                "section": "Active Case Data",
                "quarter": "Q1",
                "year": 2021,
                "created_at": "2021-01-15T09:30:00Z",
                "submitted_by": "analyst@example.org",
                "original_filename": format!("report{id}.txt"),
                "status": "Accepted",
                "error_count": 0
            })
        })
        .collect();

    let mut server = mockito::Server::new();
    server
        .mock("GET", "/v1/data_files/")
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_body(serde_json::Value::Array(records).to_string())
        .create();

    let output = dfp()
        .args([
            "--server",
            &server.url(),
            "history",
            "--year",
            "2021",
            "--program",
            "tanf",
            "--org",
            "1",
            "--page",
            "active=2",
            "--json",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let buckets: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let active = &buckets[0];
    assert_eq!(active["bucket"], "Active Case Data");
    assert_eq!(active["kind"], "page");
    assert_eq!(active["current"], 2);
    assert_eq!(active["total"], 2);
    assert_eq!(active["records"].as_array().unwrap().len(), 2);
    assert_eq!(buckets[1]["kind"], "no_data");
}
