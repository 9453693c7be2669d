use crate::error::BackupError;
use crate::utils::workspace::JobWorkspace;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use tracing::debug;
use uuid::Uuid;

/// Where the data to back up comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum SourceMode {
    /// Direct access to a v2 data directory on this host.
    V2 { data_dir: PathBuf },
    /// Network access to a v3 cluster.
    V3 {
        endpoints: Vec<String>,
        #[serde(default)]
        tls: Option<EtcdTls>,
    },
}

impl fmt::Display for SourceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceMode::V2 { data_dir } => write!(f, "v2 ({})", data_dir.display()),
            SourceMode::V3 { endpoints, .. } => write!(f, "v3 ({})", endpoints.join(",")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EtcdTls {
    pub cacert: Option<PathBuf>,
    pub cert: Option<PathBuf>,
    pub key: Option<PathBuf>,
}

impl EtcdTls {
    pub fn is_empty(&self) -> bool {
        self.cacert.is_none() && self.cert.is_none() && self.key.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    pub bucket: String,
    pub prefix: Option<String>,
    pub region: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    Init,
    Validated,
    Snapshotting,
    Archiving,
    Uploading,
    CleaningUp,
    Done,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Done | JobState::Failed)
    }

    pub fn can_transition_to(self, next: JobState) -> bool {
        use JobState::*;
        matches!(
            (self, next),
            (Init, Validated)
                | (Validated, Snapshotting)
                | (Snapshotting, Archiving)
                | (Archiving, Uploading)
                | (Uploading, CleaningUp)
                | (CleaningUp, Done)
                | (Validated, Failed)
                | (Snapshotting, Failed)
                | (Archiving, Failed)
                | (Uploading, Failed)
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobState::Init => "init",
            JobState::Validated => "validated",
            JobState::Snapshotting => "snapshotting",
            JobState::Archiving => "archiving",
            JobState::Uploading => "uploading",
            JobState::CleaningUp => "cleaning_up",
            JobState::Done => "done",
            JobState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// A single backup run. Lives for one invocation and is never persisted.
#[derive(Debug, Clone)]
pub struct BackupJob {
    pub id: Uuid,
    pub source: SourceMode,
    pub destination: Destination,
    pub workspace: JobWorkspace,
    pub started_at: DateTime<Utc>,
    state: JobState,
    failed_stage: Option<JobState>,
}

impl BackupJob {
    /// Creates a job with a fresh random id. The job starts in `Validated`
    /// since it can only be built from an already validated config.
    pub fn new(source: SourceMode, destination: Destination, tmp_root: PathBuf) -> Self {
        Self::with_id(Uuid::new_v4(), source, destination, tmp_root)
    }

    pub fn with_id(
        id: Uuid,
        source: SourceMode,
        destination: Destination,
        tmp_root: PathBuf,
    ) -> Self {
        Self {
            id,
            source,
            destination,
            workspace: JobWorkspace::new(tmp_root, id),
            started_at: Utc::now(),
            state: JobState::Validated,
            failed_stage: None,
        }
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// The stage the job was in when it failed, if it failed.
    pub fn failed_stage(&self) -> Option<JobState> {
        self.failed_stage
    }

    pub fn advance(&mut self, next: JobState) -> Result<(), BackupError> {
        if !self.state.can_transition_to(next) {
            return Err(BackupError::IllegalTransition {
                from: self.state,
                to: next,
            });
        }
        debug!(job_id = %self.id, from = %self.state, to = %next, "Job state transition");
        if next == JobState::Failed {
            self.failed_stage = Some(self.state);
        }
        self.state = next;
        Ok(())
    }

    pub fn report(&self, key: Option<String>, archive_size: Option<u64>) -> JobReport {
        JobReport {
            job_id: self.id,
            source: self.source.clone(),
            state: self.state,
            failed_stage: self.failed_stage,
            key,
            archive_path: self.workspace.archive_path(),
            archive_size,
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }
}

/// Raw result of the store's snapshot mechanism.
#[derive(Debug, Clone, Default)]
pub struct SnapshotOutput {
    pub dir: PathBuf,
    pub files: usize,
    pub bytes: u64,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArchiveInfo {
    pub path: PathBuf,
    pub size: u64,
    pub entries: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadReceipt {
    pub bucket: String,
    pub key: String,
    pub size: u64,
    pub e_tag: Option<String>,
}

/// Summary of a finished job, logged as JSON at debug level.
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub job_id: Uuid,
    pub source: SourceMode,
    pub state: JobState,
    pub failed_stage: Option<JobState>,
    pub key: Option<String>,
    pub archive_path: PathBuf,
    pub archive_size: Option<u64>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}
