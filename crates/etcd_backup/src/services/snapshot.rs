//! Point-in-time snapshots through the store's native tooling

use crate::error::SnapshotError;
use crate::models::types::{EtcdTls, SnapshotOutput, SourceMode};
use crate::utils::workspace::directory_usage;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, error, info, instrument, warn};

/// File name used for v3 snapshots inside the job directory.
pub const V3_SNAPSHOT_FILE: &str = "snapshot.db";

/// Produces a self-contained directory of files representing a consistent
/// point-in-time copy of the store.
#[async_trait]
pub trait SnapshotTaker: Send + Sync {
    async fn snapshot(
        &self,
        source: &SourceMode,
        dest: &Path,
    ) -> Result<SnapshotOutput, SnapshotError>;
}

pub struct EtcdctlSnapshotter {
    etcdctl: PathBuf,
    timeout: Option<Duration>,
}

impl EtcdctlSnapshotter {
    pub fn new(etcdctl: PathBuf, timeout: Option<Duration>) -> Self {
        Self { etcdctl, timeout }
    }

    fn v2_command(&self, data_dir: &Path, dest: &Path) -> Command {
        let mut cmd = Command::new(&self.etcdctl);
        cmd.arg("backup")
            .arg("--data-dir")
            .arg(data_dir)
            .arg("--backup-dir")
            .arg(dest)
            .env("ETCDCTL_API", "2");
        cmd
    }

    fn v3_command(&self, endpoint: &str, tls: Option<&EtcdTls>, dest: &Path) -> Command {
        let mut cmd = Command::new(&self.etcdctl);
        cmd.arg("--endpoints").arg(endpoint);

        if let Some(tls) = tls {
            if let Some(cacert) = &tls.cacert {
                cmd.arg("--cacert").arg(cacert);
            }
            if let Some(cert) = &tls.cert {
                cmd.arg("--cert").arg(cert);
            }
            if let Some(key) = &tls.key {
                cmd.arg("--key").arg(key);
            }
        }

        cmd.arg("snapshot")
            .arg("save")
            .arg(dest.join(V3_SNAPSHOT_FILE))
            .env("ETCDCTL_API", "3");
        cmd
    }

    async fn run(&self, mut cmd: Command) -> Result<Output, SnapshotError> {
        let command = describe(&cmd);
        info!("Running \"{}\" command...", command);

        cmd.kill_on_drop(true);
        let output = match self.timeout {
            Some(limit) => match timeout(limit, cmd.output()).await {
                Ok(output) => output?,
                Err(_) => return Err(SnapshotError::Timeout(limit)),
            },
            None => cmd.output().await?,
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        debug!(stdout = %stdout, stderr = %stderr, "etcdctl output");

        if !output.status.success() {
            error!(command = %command, status = %output.status, stderr = %stderr, "etcdctl failed");
            return Err(SnapshotError::CommandFailed {
                command,
                status: output.status.to_string(),
                stdout,
                stderr,
            });
        }

        Ok(output)
    }

    /// `etcdctl snapshot save` only talks to a single member, so endpoints are
    /// tried in order until one of them answers.
    async fn snapshot_v3(
        &self,
        endpoints: &[String],
        tls: Option<&EtcdTls>,
        dest: &Path,
    ) -> Result<Output, SnapshotError> {
        let mut last_error = None;

        for endpoint in endpoints {
            match self.run(self.v3_command(endpoint, tls, dest)).await {
                Ok(output) => return Ok(output),
                Err(e) => {
                    warn!(endpoint = %endpoint, error = %e, "Snapshot from endpoint failed");
                    let partial = dest.join(V3_SNAPSHOT_FILE);
                    if partial.exists() {
                        if let Err(e) = tokio::fs::remove_file(&partial).await {
                            warn!(path = %partial.display(), error = %e, "Failed to remove partial snapshot");
                        }
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| SnapshotError::MissingOutput(dest.to_path_buf())))
    }
}

#[async_trait]
impl SnapshotTaker for EtcdctlSnapshotter {
    #[instrument(skip(self, source), fields(source = %source))]
    async fn snapshot(
        &self,
        source: &SourceMode,
        dest: &Path,
    ) -> Result<SnapshotOutput, SnapshotError> {
        let output = match source {
            SourceMode::V2 { data_dir } => {
                info!("Starting to backup up etcd v2 key data...");
                self.run(self.v2_command(data_dir, dest)).await?
            }
            SourceMode::V3 { endpoints, tls } => {
                info!("Starting etcd v3 snapshot...");
                self.snapshot_v3(endpoints, tls.as_ref(), dest).await?
            }
        };

        let mut snapshot = verify_output(dest).await?;
        snapshot.stdout = String::from_utf8_lossy(&output.stdout).to_string();
        snapshot.stderr = String::from_utf8_lossy(&output.stderr).to_string();
        Ok(snapshot)
    }
}

/// Checks that the snapshot directory exists and holds at least one file.
pub async fn verify_output(dest: &Path) -> Result<SnapshotOutput, SnapshotError> {
    if !dest.is_dir() {
        return Err(SnapshotError::MissingOutput(dest.to_path_buf()));
    }

    let (files, bytes) = directory_usage(dest).await?;
    if files == 0 {
        return Err(SnapshotError::EmptyOutput(dest.to_path_buf()));
    }

    info!(files = files, bytes = bytes, "Snapshot written to {}", dest.display());
    Ok(SnapshotOutput {
        dir: dest.to_path_buf(),
        files,
        bytes,
        ..Default::default()
    })
}

fn describe(cmd: &Command) -> String {
    let cmd = cmd.as_std();
    let mut parts = vec![cmd.get_program().to_string_lossy().to_string()];
    parts.extend(cmd.get_args().map(|a| a.to_string_lossy().to_string()));
    parts.join(" ")
}
