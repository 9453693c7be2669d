//! In-process object store
//!
//! Keeps uploaded objects in memory. Used for dry runs and tests; it can be
//! told to reject uploads to simulate an unreachable bucket.

use crate::error::UploadError;
use crate::models::types::UploadReceipt;
use crate::stores::object_store::ObjectStore;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

#[derive(Clone, Default)]
pub struct MemoryObjectStore {
    bucket: String,
    objects: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
    unreachable: Arc<AtomicBool>,
}

impl MemoryObjectStore {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            ..Default::default()
        }
    }

    /// A store whose every upload fails as if the endpoint were down.
    pub fn unreachable(bucket: impl Into<String>) -> Self {
        let store = Self::new(bucket);
        store.set_unreachable(true);
        store
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    pub async fn keys(&self) -> Vec<String> {
        self.objects.read().await.keys().cloned().collect()
    }

    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.read().await.get(key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put_object(&self, key: &str, data: Vec<u8>) -> Result<UploadReceipt, UploadError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(UploadError::Remote(format!(
                "bucket {} is unreachable",
                self.bucket
            )));
        }

        let size = data.len() as u64;
        self.objects.write().await.insert(key.to_string(), data);

        info!(bucket = %self.bucket, key = %key, size = size, "Object stored in memory");
        Ok(UploadReceipt {
            bucket: self.bucket.clone(),
            key: key.to_string(),
            size,
            e_tag: None,
        })
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
