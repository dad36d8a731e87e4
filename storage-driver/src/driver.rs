use std::fmt;

use camino::Utf8Path;
use tokio::io;

use crate::content::Content;
use crate::error::StorageError;

/// A reader stream for file contents.
pub type Reader<'r> = dyn io::AsyncBufRead + Unpin + Send + Sync + 'r;

/// A storage driver, which provides the ability to interact with a storage backend.
///
/// Keys are relative, `/`-separated paths inside a bucket. How a bucket and
/// key map onto physical storage is entirely up to the driver.
#[async_trait::async_trait]
pub trait Driver: fmt::Debug {
    /// The name of the driver.
    fn name(&self) -> &'static str;

    /// Open a file for reading.
    ///
    /// Returns `Ok(None)` when nothing is stored under `remote`. Errors are
    /// reserved for failures of the backend itself.
    async fn read(&self, bucket: &str, remote: &Utf8Path) -> Result<Option<Content>, StorageError>;

    /// Upload a file to the storage, using a reader stream to provide the contents.
    ///
    /// An existing file at `remote` is replaced.
    async fn upload(
        &self,
        bucket: &str,
        remote: &Utf8Path,
        reader: &mut Reader<'_>,
    ) -> Result<(), StorageError>;

    /// Delete a file from the storage, by path. Deleting a missing file succeeds.
    async fn delete(&self, bucket: &str, remote: &Utf8Path) -> Result<(), StorageError>;

    /// List the files in a bucket, optionally filtered by a prefix.
    ///
    /// The prefix is matched by whole path components.
    async fn list(
        &self,
        bucket: &str,
        prefix: Option<&Utf8Path>,
    ) -> Result<Vec<String>, StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    static_assertions::assert_obj_safe!(Driver);
}
