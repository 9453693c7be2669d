//! Trait for remote object storage backends

use crate::error::UploadError;
use crate::models::types::UploadReceipt;
use chrono::{DateTime, TimeZone};
use std::fmt::Display;
use std::path::Path;

/// Namespace token every uploaded backup key starts with.
pub const KEY_NAMESPACE: &str = "k8s";

/// Timestamp layout embedded in object keys, e.g. `2024-01-15-120000`.
pub const KEY_TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H%M%S";

#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write `data` under `key` in the configured bucket.
    async fn put_object(&self, key: &str, data: Vec<u8>) -> Result<UploadReceipt, UploadError>;

    /// Read the file at `path` in full and upload it under `key`.
    async fn put_file(&self, key: &str, path: &Path) -> Result<UploadReceipt, UploadError> {
        let data = tokio::fs::read(path).await?;
        self.put_object(key, data).await
    }

    /// Name of the backend, for logs.
    fn name(&self) -> &'static str;
}

/// Builds `k8s_<prefix>_<YYYY-MM-DD-HHMMSS>.zip`, or `k8s_<timestamp>.zip`
/// when no prefix is configured.
pub fn object_key<Tz>(prefix: Option<&str>, at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let timestamp = at.format(KEY_TIMESTAMP_FORMAT);
    match prefix.filter(|p| !p.is_empty()) {
        Some(prefix) => format!("{}_{}_{}.zip", KEY_NAMESPACE, prefix, timestamp),
        None => format!("{}_{}.zip", KEY_NAMESPACE, timestamp),
    }
}
