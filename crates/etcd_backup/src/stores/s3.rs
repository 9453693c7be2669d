//! S3-based backup storage

use crate::config::S3Settings;
use crate::error::UploadError;
use crate::models::types::UploadReceipt;
use crate::stores::object_store::ObjectStore;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use secrecy::ExposeSecret;
use tracing::{info, instrument};

pub const DEFAULT_REGION: &str = "us-east-1";

pub struct S3ObjectStore {
    s3_client: S3Client,
    bucket: String,
}

impl S3ObjectStore {
    pub fn new(settings: &S3Settings) -> Self {
        let region = settings
            .region
            .clone()
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        let credentials = Credentials::new(
            settings.access_key.clone(),
            settings.secret_key.expose_secret().clone(),
            None,
            None,
            "etcd-backup",
        );

        let mut s3_config_builder = aws_sdk_s3::config::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(region.clone()))
            .credentials_provider(credentials);

        if let Some(endpoint) = &settings.endpoint {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint);
        }

        if settings.path_style {
            s3_config_builder = s3_config_builder.force_path_style(true);
        }

        let s3_client = S3Client::from_conf(s3_config_builder.build());

        info!(bucket = %settings.bucket, region = %region, "S3 backup store initialized");

        Self {
            s3_client,
            bucket: settings.bucket.clone(),
        }
    }
}

#[async_trait::async_trait]
impl ObjectStore for S3ObjectStore {
    #[instrument(skip(self, data), fields(bucket = %self.bucket))]
    async fn put_object(&self, key: &str, data: Vec<u8>) -> Result<UploadReceipt, UploadError> {
        let size = data.len() as u64;

        info!("Uploading backup to s3 bucket");
        let output = self
            .s3_client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type("application/zip")
            .content_length(size as i64)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| UploadError::Remote(format!("S3 upload failed: {}", DisplayErrorContext(&e))))?;

        let e_tag = output.e_tag().map(str::to_string);
        info!(key = %key, size = size, e_tag = ?e_tag, "Backup uploaded to S3");

        Ok(UploadReceipt {
            bucket: self.bucket.clone(),
            key: key.to_string(),
            size,
            e_tag,
        })
    }

    fn name(&self) -> &'static str {
        "s3"
    }
}
