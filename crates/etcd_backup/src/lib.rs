//! etcd backup
//!
//! Takes a point-in-time snapshot of an etcd cluster, packages it as a zip
//! archive and uploads it to S3-compatible object storage.

// Entry points
pub mod app;
pub mod cli;
pub mod config;

// Domain
pub mod error;
pub mod models;

// Pipeline stages
pub mod services;

// Storage
pub mod stores;

// Utilities
pub mod utils;

// Re-export commonly used types
pub use crate::config::BackupConfig;
pub use error::BackupError;
pub use models::types::{BackupJob, JobReport, JobState, SourceMode};
pub use services::orchestrator::BackupOrchestrator;
