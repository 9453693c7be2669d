use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to prepare job workspace: {0}")]
    Workspace(#[source] std::io::Error),

    #[error("Snapshot failed: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("Archive failed: {0}")]
    Archive(#[from] ArchiveError),

    #[error("Upload failed, archive retained at {archive}: {source}")]
    Upload {
        archive: PathBuf,
        #[source]
        source: UploadError,
    },

    #[error("Illegal job state transition from {from} to {to}")]
    IllegalTransition {
        from: crate::models::types::JobState,
        to: crate::models::types::JobState,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("--etcd_v2_datadir or --etcd_v3_endpoints must be set")]
    MissingSource,

    #[error("--etcd_v2_datadir and --etcd_v3_endpoints are mutually exclusive")]
    ConflictingSources,

    #[error("--etcd_v3_endpoints contains no endpoints")]
    EmptyEndpoints,

    #[error("Missing required setting: {0}")]
    MissingField(&'static str),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("Failed to load settings file: {0}")]
    Load(#[from] ::config::ConfigError),
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("`{command}` exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stdout: String,
        stderr: String,
    },

    #[error("Snapshot produced no output directory at {0}")]
    MissingOutput(PathBuf),

    #[error("Snapshot output directory {0} is empty")]
    EmptyOutput(PathBuf),

    #[error("Snapshot command timed out after {0:?}")]
    Timeout(Duration),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Path {0} is outside of the snapshot directory")]
    StrayPath(PathBuf),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Failed to read archive: {0}")]
    Read(#[from] std::io::Error),

    #[error("Remote storage error: {0}")]
    Remote(String),
}

pub type BackupResult<T> = Result<T, BackupError>;
