//! Google Cloud Storage backend for Play Console report buckets.

use std::sync::Arc;

use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::RetryConfig;
use tracing::info;

use super::ObjectStoreSource;
use crate::config::TapConfig;
use crate::error::{Result, TapError};

/// Google Cloud Storage authentication configuration.
#[derive(Debug, Clone)]
pub enum GcsAuth {
    /// Use service account key file
    ServiceAccountKey(String),
    /// Use service account JSON string
    ServiceAccountJson(String),
}

/// Configuration for a Google Cloud Storage bucket.
#[derive(Debug, Clone)]
pub struct GcsConfig {
    /// GCS bucket name
    pub bucket: String,
    /// Authentication method
    pub auth: GcsAuth,
}

impl GcsConfig {
    /// Bucket and credential from the tap configuration.
    ///
    /// `key_file` is normally a path; a value that is itself a JSON object is
    /// used as the key directly.
    pub fn from_tap_config(config: &TapConfig) -> Self {
        let key = config.key_file.trim();
        let auth = if key.starts_with('{') {
            GcsAuth::ServiceAccountJson(key.to_string())
        } else {
            GcsAuth::ServiceAccountKey(config.key_file.clone())
        };
        Self {
            bucket: config.bucket_name.clone(),
            auth,
        }
    }
}

impl ObjectStoreSource {
    /// Connects to a GCS bucket.
    pub fn gcs(config: &GcsConfig) -> Result<Self> {
        let mut builder = GoogleCloudStorageBuilder::new()
            .with_bucket_name(&config.bucket)
            .with_retry(RetryConfig {
                max_retries: 3,
                retry_timeout: std::time::Duration::from_secs(30),
                ..Default::default()
            });

        builder = match &config.auth {
            GcsAuth::ServiceAccountKey(path) => builder.with_service_account_path(path),
            GcsAuth::ServiceAccountJson(json) => builder.with_service_account_key(json),
        };

        let store = builder.build().map_err(|e| {
            TapError::configuration(format!(
                "Failed to create GCS client for bucket '{}': {e}",
                config.bucket
            ))
        })?;
        info!(bucket = %config.bucket, "Connected to GCS bucket");

        Ok(Self::new(Arc::new(store), format!("gs://{}", config.bucket)))
    }
}
