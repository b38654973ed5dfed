//! Report blob sources.
//!
//! The sync engine only needs "fetch named blob as bytes". [`BlobSource`] is
//! that capability; [`ObjectStoreSource`] provides it on top of any
//! `object_store` backend (Google Cloud Storage, local files, memory).

use std::fmt::Debug;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};
use tracing::{debug, instrument};

use crate::dates::year_month;
use crate::error::{FetchErrorKind, Result, TapError};

#[cfg(feature = "gcs")]
mod gcs;

#[cfg(feature = "gcs")]
pub use gcs::{GcsAuth, GcsConfig};

/// Object key of a monthly report export.
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use tap_googleplay::sources::report_key;
///
/// let month = Utc.with_ymd_and_hms(2019, 6, 14, 0, 0, 0).unwrap();
/// assert_eq!(
///     report_key("installs", "com.example.app", &month, "os_version"),
///     "stats/installs/installs_com.example.app_201906_os_version.csv"
/// );
/// ```
pub fn report_key(
    report_type: &str,
    package_name: &str,
    month: &DateTime<Utc>,
    dimension: &str,
) -> String {
    format!(
        "stats/{report_type}/{report_type}_{package_name}_{}_{dimension}.csv",
        year_month(month)
    )
}

/// Something that can fetch a named blob.
#[async_trait]
pub trait BlobSource: Debug + Send + Sync {
    /// Fetches the whole object. A missing object is a fetch error.
    async fn fetch(&self, key: &str) -> Result<Vec<u8>>;

    /// Returns a human-readable description of this source.
    fn description(&self) -> String;
}

/// [`BlobSource`] backed by an `object_store` implementation.
#[derive(Debug, Clone)]
pub struct ObjectStoreSource {
    store: Arc<dyn ObjectStore>,
    label: String,
}

impl ObjectStoreSource {
    pub fn new(store: Arc<dyn ObjectStore>, label: impl Into<String>) -> Self {
        Self {
            store,
            label: label.into(),
        }
    }

    /// An empty in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemory::new()), "memory")
    }

    /// Serves keys relative to a local directory.
    pub fn local(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let store = LocalFileSystem::new_with_prefix(root).map_err(|e| {
            TapError::configuration(format!(
                "Cannot use '{}' as report directory: {e}",
                root.display()
            ))
        })?;
        Ok(Self::new(Arc::new(store), format!("file://{}", root.display())))
    }

    /// Stores an object under `key`, replacing any previous content.
    pub async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        self.store
            .put(&ObjectPath::from(key), PutPayload::from(bytes))
            .await
            .map_err(|e| map_store_error(key, e))?;
        Ok(())
    }

    /// Removes an object. Missing objects are not an error.
    pub async fn delete(&self, key: &str) -> Result<()> {
        match self.store.delete(&ObjectPath::from(key)).await {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(map_store_error(key, e)),
        }
    }
}

#[async_trait]
impl BlobSource for ObjectStoreSource {
    #[instrument(skip(self), fields(source = %self.label))]
    async fn fetch(&self, key: &str) -> Result<Vec<u8>> {
        let location = ObjectPath::from(key);
        let result = self
            .store
            .get(&location)
            .await
            .map_err(|e| map_store_error(key, e))?;
        let bytes = result.bytes().await.map_err(|e| map_store_error(key, e))?;
        debug!(bytes = bytes.len(), "Fetched blob");
        Ok(bytes.to_vec())
    }

    fn description(&self) -> String {
        format!("object store source: {}", self.label)
    }
}

pub(crate) fn map_store_error(key: &str, error: object_store::Error) -> TapError {
    let kind = match &error {
        object_store::Error::NotFound { .. } => FetchErrorKind::NotFound,
        object_store::Error::PermissionDenied { .. } | object_store::Error::Unauthenticated { .. } => {
            FetchErrorKind::PermissionDenied
        }
        _ => FetchErrorKind::Transport,
    };
    TapError::fetch_with_source(key, kind, Box::new(error))
}
