use std::collections::HashMap;

use bytes::Bytes;
use camino::{Utf8Path, Utf8PathBuf};
use tokio::sync::RwLock;

use storage_driver::{Content, Driver, Reader, StorageError, StorageErrorKind};

const MEMORY_STORAGE_NAME: &str = "memory";

/// Size of the chunks handed out when reading a stored file.
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;

fn bucket_not_found(bucket: &str) -> StorageError {
    StorageError::builder(
        MEMORY_STORAGE_NAME,
        StorageErrorKind::NotFound,
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Bucket not found: {bucket}"),
        ),
    )
    .bucket(bucket)
    .context("bucket not found")
    .build()
}

/// Storage driver that stores files in memory.
#[derive(Debug)]
pub struct MemoryStorage {
    buckets: RwLock<HashMap<String, HashMap<Utf8PathBuf, Bytes>>>,
    chunk_size: usize,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self {
            buckets: RwLock::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl MemoryStorage {
    /// Create a new `MemoryStorage` instance, with no buckets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new `MemoryStorage` instance, with the given buckets.
    pub fn with_buckets(buckets: &[&str]) -> Self {
        let map = buckets
            .iter()
            .map(|bucket| (bucket.to_string(), HashMap::new()))
            .collect();

        Self {
            buckets: RwLock::new(map),
            ..Self::default()
        }
    }

    /// Set the size of the chunks produced when reading files back.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Create a new bucket in the storage.
    pub async fn create_bucket(&self, bucket: String) {
        let mut buckets = self.buckets.write().await;
        buckets.entry(bucket).or_default();
    }
}

#[async_trait::async_trait]
impl Driver for MemoryStorage {
    fn name(&self) -> &'static str {
        MEMORY_STORAGE_NAME
    }

    async fn read(&self, bucket: &str, remote: &Utf8Path) -> Result<Option<Content>, StorageError> {
        let buckets = self.buckets.read().await;
        let bucket_map = buckets.get(bucket).ok_or_else(|| bucket_not_found(bucket))?;

        // Bytes clones are cheap, so the lock is not held while the caller streams.
        Ok(bucket_map
            .get(remote)
            .cloned()
            .map(|data| Content::chunked(data, self.chunk_size)))
    }

    async fn upload(
        &self,
        bucket: &str,
        remote: &Utf8Path,
        local: &mut Reader<'_>,
    ) -> Result<(), StorageError> {
        let mut buf = Vec::new();

        tokio::io::copy(local, &mut buf)
            .await
            .map_err(|err| StorageError::io(self.name(), err))?;

        let mut buckets = self.buckets.write().await;
        let bucket_map = buckets.entry(bucket.to_string()).or_default();
        bucket_map.insert(remote.to_owned(), Bytes::from(buf));

        Ok(())
    }

    async fn delete(&self, bucket: &str, remote: &Utf8Path) -> Result<(), StorageError> {
        let mut buckets = self.buckets.write().await;
        let bucket_map = buckets
            .get_mut(bucket)
            .ok_or_else(|| bucket_not_found(bucket))?;
        bucket_map.remove(remote);

        Ok(())
    }

    async fn list(
        &self,
        bucket: &str,
        prefix: Option<&Utf8Path>,
    ) -> Result<Vec<String>, StorageError> {
        tracing::trace!(%bucket, ?prefix, "list memory bucket");

        let buckets = self.buckets.read().await;
        let bucket_map = buckets.get(bucket).ok_or_else(|| bucket_not_found(bucket))?;

        let paths = bucket_map
            .keys()
            .filter(|path| prefix.is_none_or(|prefix| path.starts_with(prefix)))
            .map(|path| path.to_string())
            .collect();

        Ok(paths)
    }
}
