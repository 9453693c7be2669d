mod common;

use assert_cmd::Command;
use common::entries;
use predicates::prelude::*;
use tempfile::TempDir;

fn etcd_backup() -> Command {
    let mut cmd = Command::cargo_bin("etcd-backup").unwrap();
    cmd.env_remove("RUST_LOG")
        .env_remove("AWS_ACCESS_KEY_ID")
        .env_remove("AWS_SECRET_ACCESS_KEY");
    cmd
}

#[test]
fn missing_source_fails_without_touching_disk() {
    let tmp = TempDir::new().unwrap();

    etcd_backup()
        .args([
            "--aws_access_key",
            "AKIA",
            "--aws_secret_key",
            "secret",
            "--aws_s3_bucket",
            "my-bucket",
        ])
        .arg("--tmp_dir")
        .arg(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "--etcd_v2_datadir or --etcd_v3_endpoints must be set",
        ));

    assert!(entries(tmp.path()).is_empty());
}

#[test]
fn both_sources_are_rejected() {
    let tmp = TempDir::new().unwrap();
    let data = TempDir::new().unwrap();

    etcd_backup()
        .args([
            "--aws_access_key",
            "AKIA",
            "--aws_secret_key",
            "secret",
            "--aws_s3_bucket",
            "my-bucket",
            "--etcd_v3_endpoints",
            "http://127.0.0.1:2379",
        ])
        .arg("--etcd_v2_datadir")
        .arg(data.path())
        .arg("--tmp_dir")
        .arg(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("mutually exclusive"));

    assert!(entries(tmp.path()).is_empty());
}

#[test]
fn invalid_config_is_recorded_in_metrics_textfile() {
    let tmp = TempDir::new().unwrap();
    let metrics_dir = TempDir::new().unwrap();
    let metrics_path = metrics_dir.path().join("etcd_backup.prom");
    std::fs::write(&metrics_path, "etcd_backup_success 1\n").unwrap();

    etcd_backup()
        .args(["--aws_access_key", "AKIA", "--aws_secret_key", "secret"])
        .arg("--tmp_dir")
        .arg(tmp.path())
        .arg("--metrics_textfile")
        .arg(&metrics_path)
        .assert()
        .failure();

    let text = std::fs::read_to_string(&metrics_path).unwrap();
    assert!(text.contains("etcd_backup_success 0"));
    assert!(text.contains(r#"etcd_backup_failed_stage{stage="validated"} 1"#));
    assert!(entries(tmp.path()).is_empty());
}

#[test]
fn missing_bucket_is_reported() {
    let data = TempDir::new().unwrap();

    etcd_backup()
        .args(["--aws_access_key", "AKIA", "--aws_secret_key", "secret"])
        .arg("--etcd_v2_datadir")
        .arg(data.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("--aws_s3_bucket"));
}

#[test]
fn broken_settings_file_fails() {
    etcd_backup()
        .args(["--config", "/nonexistent/etcd-backup.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
}

#[test]
fn help_lists_underscore_flags() {
    etcd_backup()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--etcd_v2_datadir"))
        .stdout(predicate::str::contains("--aws_s3_bucket"));
}

#[cfg(unix)]
#[test]
fn unreachable_endpoint_keeps_archive_and_fails() {
    let bin = TempDir::new().unwrap();
    let data = TempDir::new().unwrap();
    let tmp = TempDir::new().unwrap();
    let etcdctl = common::install_script(bin.path(), common::FAKE_ETCDCTL);

    etcd_backup()
        .args([
            "--aws_access_key",
            "AKIA",
            "--aws_secret_key",
            "secret",
            "--aws_s3_bucket",
            "my-bucket",
            "--aws_s3_region",
            "us-east-1",
            "--aws_s3_endpoint",
            "http://127.0.0.1:9",
            "--aws_s3_path_style",
            "--prefix",
            "prod",
        ])
        .arg("--etcd_v2_datadir")
        .arg(data.path())
        .arg("--etcdctl_path")
        .arg(&etcdctl)
        .arg("--tmp_dir")
        .arg(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("archive retained"));

    let archives: Vec<_> = entries(tmp.path())
        .into_iter()
        .filter(|p| p.extension().is_some_and(|e| e == "zip"))
        .collect();
    assert_eq!(archives.len(), 1);
}
