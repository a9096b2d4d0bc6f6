// Exit codes of the `ego-upload` binary for failures caught before any
// request is made.

use assert_cmd::Command;
use predicates::prelude::*;

fn ego_upload(dir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("ego-upload").unwrap();
    cmd.current_dir(dir)
        .env_remove("EGO_USERNAME")
        .env_remove("EGO_PASSWORD")
        .env("EGO_URL", "http://127.0.0.1:9");
    cmd
}

#[test]
fn missing_artifact_is_a_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    ego_upload(dir.path())
        .args(["upload", "missing.zip", "--no-interaction"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("failed to read artifact missing.zip"));
}

#[test]
fn missing_username_without_interaction_exits_with_configuration_code() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("ext.zip"), b"zip").unwrap();
    ego_upload(dir.path())
        .args(["upload", "ext.zip", "--no-interaction"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains(
            "Missing username; pass --username or set $EGO_USERNAME",
        ));
}

#[test]
fn missing_password_without_interaction_exits_with_configuration_code() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("ext.zip"), b"zip").unwrap();
    ego_upload(dir.path())
        .args(["upload", "ext.zip", "--no-interaction", "--username", "alice"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Missing password; set $EGO_PASSWORD"));
}

#[test]
fn unreachable_registry_is_a_registry_error() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("ext.zip"), b"zip").unwrap();
    ego_upload(dir.path())
        .env("EGO_USERNAME", "alice")
        .env("EGO_PASSWORD", "secret")
        .args(["upload", "ext.zip", "--no-interaction"])
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Login failed"));
}
