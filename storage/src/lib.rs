//! # Storage backends
//!
//! Configuration and unification for the storage backends.

use std::sync::Arc;

use camino::Utf8Path;
#[cfg(feature = "local")]
use camino::Utf8PathBuf;
use serde::Deserialize;
use tokio::io;

#[cfg(feature = "local")]
pub(crate) mod local;

pub(crate) mod memory;

#[cfg(feature = "local")]
#[doc(inline)]
pub use local::LocalDriver;

#[doc(inline)]
pub use memory::MemoryStorage;

#[doc(inline)]
pub use storage_driver::{ByteStream, Content, Driver, Reader, StorageError, StorageErrorKind};

/// Storage backend selection, as read from configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StorageConfig {
    /// Volatile in-memory storage, pre-seeded with one bucket.
    Memory {
        /// Bucket created up front.
        bucket: String,
    },

    /// Files under a local directory.
    #[cfg(feature = "local")]
    Local {
        /// Directory holding one sub-directory per bucket.
        path: Utf8PathBuf,
    },
}

impl StorageConfig {
    /// Create the configured backend.
    #[tracing::instrument]
    pub fn build(self) -> Storage {
        match self {
            StorageConfig::Memory { bucket } => MemoryStorage::with_buckets(&[bucket.as_str()]).into(),
            #[cfg(feature = "local")]
            StorageConfig::Local { path } => LocalDriver::new(path).into(),
        }
    }
}

pub(crate) type ArcDriver = Arc<dyn Driver + Send + Sync>;

/// Shared handle to a storage driver.
///
/// Cheap to clone; all clones use the same driver.
#[derive(Debug, Clone)]
pub struct Storage {
    driver: ArcDriver,
}

impl<D> From<D> for Storage
where
    D: Driver + Send + Sync + 'static,
{
    fn from(value: D) -> Self {
        Storage::new(value)
    }
}

impl Storage {
    /// Wrap a driver.
    pub fn new<D: Driver + Send + Sync + 'static>(driver: D) -> Self {
        Self {
            driver: Arc::new(driver),
        }
    }

    /// Name of the underlying driver.
    pub fn name(&self) -> &str {
        self.driver.name()
    }

    /// Handle which reads and writes keys in `bucket`.
    pub fn bucket<S: Into<String>>(&self, bucket: S) -> StorageBucket {
        StorageBucket {
            driver: self.driver.clone(),
            bucket: bucket.into(),
        }
    }
}

/// A `Storage` handle pinned to a single bucket.
#[derive(Debug, Clone)]
pub struct StorageBucket {
    /// Bucket every call is made against.
    pub bucket: String,
    driver: Arc<dyn Driver + Send + Sync + 'static>,
}

impl StorageBucket {
    /// Name of the underlying driver.
    pub fn name(&self) -> &str {
        self.driver.name()
    }

    /// Read the value stored under `remote`, or `None` when there isn't one.
    #[tracing::instrument(skip(self), fields(driver=self.driver.name(), bucket=self.bucket))]
    pub async fn read(&self, remote: &Utf8Path) -> Result<Option<Content>, StorageError> {
        tracing::trace!(%remote, "Reading from: {}/{remote}", self.bucket);
        self.driver.read(&self.bucket, remote).await
    }

    /// Store everything `reader` yields under `remote`, replacing any previous value.
    #[tracing::instrument(skip(self, reader), fields(driver=self.driver.name(), bucket=self.bucket))]
    pub async fn upload<'d, R>(
        &'d self,
        remote: &Utf8Path,
        reader: &mut R,
    ) -> Result<(), StorageError>
    where
        R: io::AsyncBufRead + Unpin + Send + Sync + 'd,
    {
        tracing::trace!(%remote, "Uploading to: {}/{remote}", self.bucket);
        self.driver.upload(&self.bucket, remote, reader).await?;
        Ok(())
    }

    /// Keys below `prefix`, in no particular order.
    #[tracing::instrument(skip(self), fields(driver=self.driver.name(), bucket=self.bucket))]
    pub async fn list(&self, prefix: Option<&Utf8Path>) -> Result<Vec<String>, StorageError> {
        self.driver.list(&self.bucket, prefix).await
    }

    /// Remove `path`. Removing a missing key is not an error.
    #[tracing::instrument(skip(self), fields(driver=self.driver.name(), bucket=self.bucket))]
    pub async fn delete(&self, path: &Utf8Path) -> Result<(), StorageError> {
        self.driver.delete(&self.bucket, path).await
    }
}
