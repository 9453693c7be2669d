//! Application initialization and setup

use crate::config::{BackupConfig, Settings};
use crate::error::{BackupError, ConfigError};
use crate::models::types::{BackupJob, JobReport, JobState};
use crate::services::orchestrator::BackupOrchestrator;
use crate::services::snapshot::{EtcdctlSnapshotter, SnapshotTaker};
use crate::stores::object_store::ObjectStore;
use crate::stores::s3::S3ObjectStore;
use crate::utils::metrics::JobMetrics;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Application components
pub struct App {
    config: BackupConfig,
    orchestrator: BackupOrchestrator,
}

/// Final state of a job plus the error that ended it, if any.
#[derive(Debug)]
pub struct JobOutcome {
    pub job: BackupJob,
    pub report: JobReport,
    pub error: Option<BackupError>,
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.report.state == JobState::Done
    }

    pub fn exit_code(&self) -> ExitCode {
        if self.is_success() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }
    }
}

impl App {
    /// Wire `etcdctl` and S3 from the validated config.
    pub fn initialize(config: BackupConfig) -> Self {
        let store = Arc::new(S3ObjectStore::new(&config.s3));
        Self::with_store(config, store)
    }

    /// Real snapshotter, caller-provided store.
    pub fn with_store(config: BackupConfig, store: Arc<dyn ObjectStore>) -> Self {
        let snapshotter = Arc::new(EtcdctlSnapshotter::new(
            config.etcdctl_path.clone(),
            config.snapshot_timeout,
        ));
        Self::with_components(config, snapshotter, store)
    }

    pub fn with_components(
        config: BackupConfig,
        snapshotter: Arc<dyn SnapshotTaker>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            orchestrator: BackupOrchestrator::new(snapshotter, store),
            config,
        }
    }

    pub async fn run(&self) -> JobOutcome {
        let mut job = BackupJob::new(
            self.config.source.clone(),
            self.config.destination(),
            self.config.tmp_dir.clone(),
        );

        let (report, error) = match self.orchestrator.run(&mut job).await {
            Ok(report) => (report, None),
            Err(e) => (job.report(None, None), Some(e)),
        };

        if let Some(path) = &self.config.metrics_textfile {
            write_metrics(path, |metrics| metrics.record(&report)).await;
        }

        JobOutcome { job, report, error }
    }
}

async fn write_metrics(path: &Path, record: impl FnOnce(&JobMetrics)) {
    let metrics = match JobMetrics::new() {
        Ok(metrics) => metrics,
        Err(e) => {
            warn!(error = %e, "Failed to set up metrics");
            return;
        }
    };
    record(&metrics);

    if let Err(e) = metrics.write_textfile(path).await {
        warn!(path = %path.display(), error = %e, "Failed to write metrics textfile");
    }
}

/// Entry point once settings are loaded: validate, run, map to an exit code.
///
/// `metrics_textfile` is where a configuration failure gets reported, since
/// broken settings may not carry a usable path themselves.
pub async fn execute(
    settings: Result<Settings, ConfigError>,
    metrics_textfile: Option<PathBuf>,
) -> ExitCode {
    let settings = match settings {
        Ok(settings) => settings,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return config_failure(metrics_textfile.as_deref()).await;
        }
    };

    if settings.debug_enabled {
        debug!("Debug enabled");
    }

    let config = match settings.validate() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return config_failure(metrics_textfile.as_deref()).await;
        }
    };

    info!(source = %config.source, "etcd backup enabled!");
    let outcome = App::initialize(config).run().await;
    outcome.exit_code()
}

async fn config_failure(metrics_textfile: Option<&Path>) -> ExitCode {
    if let Some(path) = metrics_textfile {
        write_metrics(path, JobMetrics::record_invalid_config).await;
    }
    ExitCode::FAILURE
}
