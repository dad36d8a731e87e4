//! Registry configuration and builder

use serde::Deserialize;
use storage::StorageConfig;

use crate::error::{RegistryError, RegistryResult};
use crate::storage::RegistryStorage;

const DEFAULT_BUCKET: &str = "registry";

/// Registry builder for configuring and creating the registry storage
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    storage: Option<storage::Storage>,
    bucket: Option<String>,
}

impl RegistryBuilder {
    /// Create a new registry builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the storage backend
    pub fn storage(mut self, storage: storage::Storage) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Set the bucket name for storage
    pub fn bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    /// Build the registry storage
    pub fn build(self) -> RegistryResult<RegistryStorage> {
        let storage = self
            .storage
            .ok_or(RegistryError::Misconfigured("storage backend must be configured"))?;
        let bucket = self.bucket.unwrap_or_else(|| DEFAULT_BUCKET.to_string());

        tracing::debug!(driver = storage.name(), %bucket, "building registry storage");
        Ok(RegistryStorage::new(storage, bucket))
    }
}

fn default_bucket() -> String {
    DEFAULT_BUCKET.to_string()
}

/// Deserializable registry configuration.
///
/// ```json
/// { "storage": { "local": { "path": "/var/lib/registry" } }, "bucket": "registry" }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RegistryConfig {
    /// Storage backend
    pub storage: StorageConfig,

    /// Bucket holding all registry data
    #[serde(default = "default_bucket")]
    pub bucket: String,
}

impl RegistryConfig {
    /// Build the configured registry storage
    pub fn build(self) -> RegistryResult<RegistryStorage> {
        RegistryBuilder::new()
            .storage(self.storage.build())
            .bucket(self.bucket)
            .build()
    }
}
