#![allow(deprecated)] // TODO: cargo_bin → cargo_bin_cmd! へ移行

use assert_cmd::Command;
use predicates::prelude::*;

/// CLIヘルプにサブコマンドが並ぶ
#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("vddkflow").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("clone"))
        .stdout(predicate::str::contains("version"));
}

#[test]
fn test_cli_version() {
    let mut cmd = Command::cargo_bin("vddkflow").unwrap();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("vddkflow"));
}

/// serve のフラグがヘルプに出る
#[test]
fn test_serve_help() {
    let mut cmd = Command::cargo_bin("vddkflow").unwrap();
    cmd.arg("serve")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--listen"))
        .stdout(predicate::str::contains("--upload-dir"))
        .stdout(predicate::str::contains("--lease-seconds"));
}

#[test]
fn test_invalid_command() {
    let mut cmd = Command::cargo_bin("vddkflow").unwrap();
    cmd.arg("invalid-command").assert().failure();
}

/// 存在しない設定ファイルを明示するとエラー
#[test]
fn test_serve_with_missing_config() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = Command::cargo_bin("vddkflow").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("VDDKFLOW_CONFIG_PATH")
        .arg("serve")
        .arg("--config")
        .arg(dir.path().join("missing.yaml"))
        .assert()
        .failure();
}

/// 不正な設定値は起動前に弾く
#[test]
fn test_serve_rejects_zero_lease() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = Command::cargo_bin("vddkflow").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("VDDKFLOW_CONFIG_PATH")
        .args(["serve", "--lease-seconds", "0", "--listen", "127.0.0.1:0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("lease_seconds"));
}

/// clone の必須引数
#[test]
fn test_clone_requires_source_and_target() {
    let mut cmd = Command::cargo_bin("vddkflow").unwrap();
    cmd.args(["clone", "--source", "/vmfs/disk.vmdk"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--target"));
}

/// スクリプト実行に失敗すると JSON のエラーを出して終了コード 1
#[test]
fn test_clone_missing_script_prints_json_error() {
    let mut cmd = Command::cargo_bin("vddkflow").unwrap();
    cmd.args([
        "clone",
        "--source",
        "/vmfs/disk.vmdk",
        "--target",
        "/dev/sdb",
        "--script",
        "/nonexistent/clone.sh",
    ])
    .assert()
    .code(1)
    .stdout(predicate::str::starts_with(r#"{"status":"error","message":"failed to run"#));
}

#[cfg(unix)]
#[test]
fn test_clone_runs_script() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("clone.sh");
    std::fs::write(&script, "#!/bin/sh\necho \"cloned $1 to $2\"\n").unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

    let mut cmd = Command::cargo_bin("vddkflow").unwrap();
    cmd.args(["clone", "--source", "/vmfs/a.vmdk", "--target", "/dev/sdc", "--script"])
        .arg(&script)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            r#"{"status":"success","message":"cloned /vmfs/a.vmdk to /dev/sdc"}"#,
        ));
}
