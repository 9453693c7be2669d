//! Prometheus metrics for a single backup run
//!
//! The process is short-lived, so nothing is scraped. Metrics are written in
//! text format for the node_exporter textfile collector instead.

use crate::models::types::{JobReport, JobState};
use chrono::Utc;
use prometheus::{Encoder, Gauge, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder};
use std::path::Path;
use tokio::fs;

pub struct JobMetrics {
    registry: Registry,
    pub last_run_timestamp: IntGauge,
    pub last_success_timestamp: IntGauge,
    pub success: IntGauge,
    pub duration: Gauge,
    pub archive_size: IntGauge,
    pub failed_stage: IntGaugeVec,
}

impl JobMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let last_run_timestamp = IntGauge::new(
            "etcd_backup_last_run_timestamp_seconds",
            "Unix time the last backup run finished",
        )?;
        let last_success_timestamp = IntGauge::new(
            "etcd_backup_last_success_timestamp_seconds",
            "Unix time the last successful backup finished",
        )?;
        let success = IntGauge::new(
            "etcd_backup_success",
            "Whether the last backup run succeeded (1) or failed (0)",
        )?;
        let duration = Gauge::new(
            "etcd_backup_duration_seconds",
            "Wall time of the last backup run",
        )?;
        let archive_size = IntGauge::new(
            "etcd_backup_archive_size_bytes",
            "Size of the uploaded archive",
        )?;
        let failed_stage = IntGaugeVec::new(
            Opts::new(
                "etcd_backup_failed_stage",
                "Stage the last backup run failed in",
            ),
            &["stage"],
        )?;

        registry.register(Box::new(last_run_timestamp.clone()))?;
        registry.register(Box::new(last_success_timestamp.clone()))?;
        registry.register(Box::new(success.clone()))?;
        registry.register(Box::new(duration.clone()))?;
        registry.register(Box::new(archive_size.clone()))?;
        registry.register(Box::new(failed_stage.clone()))?;

        Ok(Self {
            registry,
            last_run_timestamp,
            last_success_timestamp,
            success,
            duration,
            archive_size,
            failed_stage,
        })
    }

    pub fn record(&self, report: &JobReport) {
        let finished = report.finished_at.timestamp();
        let elapsed = (report.finished_at - report.started_at)
            .num_milliseconds()
            .max(0) as f64
            / 1000.0;

        self.last_run_timestamp.set(finished);
        self.duration.set(elapsed);

        if report.state == JobState::Done {
            self.success.set(1);
            self.last_success_timestamp.set(finished);
            self.archive_size.set(report.archive_size.unwrap_or(0) as i64);
        } else {
            self.success.set(0);
            let stage = report
                .failed_stage
                .map(|s| s.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            self.failed_stage.with_label_values(&[stage.as_str()]).set(1);
        }
    }

    /// A run that never got past configuration. No job exists, so the
    /// failure is attributed to the `validated` stage.
    pub fn record_invalid_config(&self) {
        self.last_run_timestamp.set(Utc::now().timestamp());
        self.success.set(0);
        self.failed_stage
            .with_label_values(&[JobState::Validated.to_string().as_str()])
            .set(1);
    }

    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    /// Writes next to `path` first and renames, so the collector never reads a
    /// half-written file.
    pub async fn write_textfile(&self, path: &Path) -> std::io::Result<()> {
        let body = self
            .render()
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        let staging = path.with_extension("prom.tmp");
        fs::write(&staging, body).await?;
        fs::rename(&staging, path).await
    }
}
