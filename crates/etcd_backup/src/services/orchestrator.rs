//! Backup pipeline: snapshot, archive, upload, cleanup
//!
//! Stages run strictly in order and each one is gated on the previous one.
//! Local artifacts are removed on success and on snapshot or archive failure.
//! On upload failure they are kept, since the archive is then the only good
//! copy of the data.

use crate::error::BackupError;
use crate::models::types::{ArchiveInfo, BackupJob, JobReport, JobState, SnapshotOutput, UploadReceipt};
use crate::services::archiver::{Archiver, SnapshotArchiver};
use crate::services::snapshot::SnapshotTaker;
use crate::stores::object_store::{object_key, ObjectStore};
use chrono::Local;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

pub struct BackupOrchestrator {
    snapshotter: Arc<dyn SnapshotTaker>,
    archiver: Arc<dyn Archiver>,
    store: Arc<dyn ObjectStore>,
}

impl BackupOrchestrator {
    pub fn new(snapshotter: Arc<dyn SnapshotTaker>, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            snapshotter,
            archiver: Arc::new(SnapshotArchiver),
            store,
        }
    }

    pub fn with_archiver(mut self, archiver: Arc<dyn Archiver>) -> Self {
        self.archiver = archiver;
        self
    }

    #[instrument(skip(self, job), fields(job_id = %job.id))]
    pub async fn run(&self, job: &mut BackupJob) -> Result<JobReport, BackupError> {
        info!(source = %job.source, bucket = %job.destination.bucket, "Starting backup job");

        job.advance(JobState::Snapshotting)?;
        if let Err(e) = self.snapshot(job).await {
            job.workspace.remove_snapshot_dir().await;
            return Self::fail(job, e);
        }

        job.advance(JobState::Archiving)?;
        let archive = match self.archive(job).await {
            Ok(archive) => archive,
            Err(e) => {
                job.workspace.remove_all().await;
                return Self::fail(job, e);
            }
        };

        job.advance(JobState::Uploading)?;
        let receipt = match self.upload(job).await {
            Ok(receipt) => receipt,
            Err(e) => {
                error!(
                    archive = %job.workspace.archive_path().display(),
                    snapshot_dir = %job.workspace.snapshot_dir().display(),
                    "Upload failed; local backup retained for manual upload"
                );
                return Self::fail(job, e);
            }
        };

        job.advance(JobState::CleaningUp)?;
        self.cleanup(job).await;

        job.advance(JobState::Done)?;
        let report = job.report(Some(receipt.key), Some(archive.size));
        if let Ok(json) = serde_json::to_string(&report) {
            debug!(report = %json, "Job report");
        }
        info!(key = ?report.key, "Backup job finished");
        Ok(report)
    }

    fn fail(job: &mut BackupJob, err: BackupError) -> Result<JobReport, BackupError> {
        error!(error = %err, "Backup job failed");
        job.advance(JobState::Failed)?;
        Err(err)
    }

    async fn snapshot(&self, job: &BackupJob) -> Result<SnapshotOutput, BackupError> {
        let dest = job.workspace.create().await.map_err(BackupError::Workspace)?;

        let output = self.snapshotter.snapshot(&job.source, &dest).await?;
        debug!(stdout = %output.stdout, stderr = %output.stderr, "Snapshot output");
        Ok(output)
    }

    async fn archive(&self, job: &BackupJob) -> Result<ArchiveInfo, BackupError> {
        let archive = self
            .archiver
            .create_archive(&job.workspace.snapshot_dir(), &job.workspace.archive_path())
            .await?;
        Ok(archive)
    }

    async fn upload(&self, job: &BackupJob) -> Result<UploadReceipt, BackupError> {
        let archive = job.workspace.archive_path();
        let key = object_key(job.destination.prefix.as_deref(), &Local::now());

        info!(backend = self.store.name(), key = %key, "Uploading {}", archive.display());
        self.store
            .put_file(&key, &archive)
            .await
            .map_err(|source| BackupError::Upload { archive, source })
    }

    async fn cleanup(&self, job: &BackupJob) {
        if !job.workspace.remove_all().await {
            warn!("Cleanup incomplete; leftover files under {}", job.workspace.root().display());
        }
    }
}
