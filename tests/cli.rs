use std::fs;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

// `kvs-client` with no args should exit with a non-zero code.
#[test]
fn client_cli_no_args() {
    Command::cargo_bin("kvs-client").unwrap().assert().failure();
}

// `kvs-client get` without a key should fail
#[test]
fn client_cli_get_without_key() {
    Command::cargo_bin("kvs-client")
        .unwrap()
        .args(&["get"])
        .assert()
        .failure();
}

// `kvs-client list` with a limit that is not a number should fail
#[test]
fn client_cli_invalid_limit() {
    Command::cargo_bin("kvs-client")
        .unwrap()
        .args(&["list", "--limit", "many"])
        .assert()
        .failure()
        .stderr(contains("could not parse many"));
}

// `kvs-client` with an invalid url should fail
#[test]
fn client_cli_invalid_url() {
    Command::cargo_bin("kvs-client")
        .unwrap()
        .args(&["get", "key1", "--url", "not a url"])
        .assert()
        .failure()
        .stderr(contains("invalid server url"));
}

#[test]
fn client_cli_version() {
    Command::cargo_bin("kvs-client")
        .unwrap()
        .args(&["-V"])
        .assert()
        .stdout(contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn server_cli_version() {
    Command::cargo_bin("kvs-server")
        .unwrap()
        .args(&["-V"])
        .assert()
        .stdout(contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn server_cli_invalid_port() {
    Command::cargo_bin("kvs-server")
        .unwrap()
        .args(&["--port", "eighty"])
        .assert()
        .failure()
        .stderr(contains("could not parse eighty"));
}

// the server can not start without its page
#[test]
fn server_cli_missing_templates() {
    let temp_dir = TempDir::new().unwrap();
    Command::cargo_bin("kvs-server")
        .unwrap()
        .args(&["--port", "0", "--templates"])
        .arg(temp_dir.path().join("no-such-dir"))
        .arg("--db-path")
        .arg(temp_dir.path().join("db"))
        .assert()
        .failure()
        .stderr(contains("Failed to load templates"));
}

// the server can not start if the database can not be opened
#[test]
fn server_cli_unusable_db_path() {
    let temp_dir = TempDir::new().unwrap();
    let blocker = temp_dir.path().join("file");
    fs::write(&blocker, "not a directory").unwrap();

    Command::cargo_bin("kvs-server")
        .unwrap()
        .args(&["--port", "0", "--db-path"])
        .arg(blocker.join("db"))
        .assert()
        .failure()
        .stderr(contains("Failed to open database"));
}
