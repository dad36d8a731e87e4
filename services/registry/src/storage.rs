//! Storage layer for the registry

use camino::Utf8Path;
use storage::{Content, StorageBucket, StorageError};
use tokio::io::BufReader;

use crate::digest::Digest;
use crate::error::{RegistryError, RegistryResult};
use crate::layout;
use crate::name::{RepositoryName, Tag};
use crate::reference::ManifestRef;

/// Manifest access on top of a storage bucket.
///
/// Every call goes straight to the backend: nothing is cached, and
/// backend errors are returned as they are, without retries.
#[derive(Clone, Debug)]
pub struct RegistryStorage {
    bucket: StorageBucket,
}

impl RegistryStorage {
    /// Create a new registry storage
    pub fn new(storage: storage::Storage, bucket: impl Into<String>) -> Self {
        Self {
            bucket: storage.bucket(bucket),
        }
    }

    /// Get a manifest.
    ///
    /// Returns `Ok(None)` when the tag isn't set, or when the digest was never
    /// stored in `repository`. Content stored only in another repository is
    /// not visible here.
    #[tracing::instrument(skip_all, fields(repository = %repository, reference = %reference))]
    pub async fn get_manifest(
        &self,
        repository: &RepositoryName,
        reference: &ManifestRef,
    ) -> RegistryResult<Option<Content>> {
        let link = layout::manifest_path(repository, reference);
        let Some(digest) = self.read_link(&link).await? else {
            tracing::trace!("manifest is not linked into this repository");
            return Ok(None);
        };

        if let ManifestRef::Digest(expected) = reference {
            if digest != *expected {
                return Err(RegistryError::CorruptLink {
                    path: link.to_string(),
                    reason: format!("links to {digest}"),
                });
            }
        }

        let content = self
            .bucket
            .read(&layout::blob_path(&digest))
            .await
            .map_err(backend_failure)?;
        if content.is_none() {
            tracing::warn!(%digest, "link points at missing content");
        }

        Ok(content)
    }

    /// Store a manifest, returning its digest.
    ///
    /// The content is linked into `repository`, and tag references are
    /// re-pointed at it. Digest references must match the content.
    #[tracing::instrument(skip_all, fields(repository = %repository, reference = %reference))]
    pub async fn put_manifest(
        &self,
        repository: &RepositoryName,
        reference: &ManifestRef,
        data: &[u8],
    ) -> RegistryResult<Digest> {
        let digest = match reference {
            ManifestRef::Digest(expected) => {
                let actual = expected.algorithm().digest(data);
                if actual != *expected {
                    return Err(RegistryError::DigestMismatch {
                        expected: expected.clone(),
                        actual,
                    });
                }
                actual
            }
            ManifestRef::Tag(_) => Digest::sha256(data),
        };

        // Content is immutable once stored under its digest.
        let blob = layout::blob_path(&digest);
        if self.bucket.read(&blob).await.map_err(backend_failure)?.is_none() {
            self.bucket
                .upload(&blob, &mut BufReader::new(data))
                .await
                .map_err(backend_failure)?;
        } else {
            tracing::trace!(%digest, "content already stored");
        }

        self.write_link(&layout::revision_link(repository, &digest), &digest)
            .await?;
        if let ManifestRef::Tag(tag) = reference {
            self.write_link(&layout::tag_link(repository, tag), &digest)
                .await?;
        }

        tracing::debug!(%digest, "stored manifest");
        Ok(digest)
    }

    /// Read the digest a tag currently points at.
    #[tracing::instrument(skip_all, fields(repository = %repository, tag = %tag))]
    pub async fn resolve_tag(
        &self,
        repository: &RepositoryName,
        tag: &Tag,
    ) -> RegistryResult<Option<Digest>> {
        self.read_link(&layout::tag_link(repository, tag)).await
    }

    /// Remove a tag. The manifest it pointed at is left in place.
    #[tracing::instrument(skip_all, fields(repository = %repository, tag = %tag))]
    pub async fn delete_tag(&self, repository: &RepositoryName, tag: &Tag) -> RegistryResult<()> {
        self.bucket
            .delete(&layout::tag_link(repository, tag))
            .await
            .map_err(backend_failure)?;
        Ok(())
    }

    /// List tags for a repository, sorted.
    #[tracing::instrument(skip_all, fields(repository = %repository))]
    pub async fn tags(&self, repository: &RepositoryName) -> RegistryResult<Vec<Tag>> {
        let prefix = layout::tags_dir(repository);
        let files = self
            .bucket
            .list(Some(&prefix))
            .await
            .map_err(backend_failure)?;

        let mut tags: Vec<Tag> = files
            .iter()
            .filter_map(|file| layout::tag_of_link(&prefix, Utf8Path::new(file)))
            .filter_map(|name| match Tag::new(name) {
                Ok(tag) => Some(tag),
                Err(error) => {
                    tracing::warn!(%name, %error, "skipping unparseable tag directory");
                    None
                }
            })
            .collect();
        tags.sort();
        tags.dedup();

        Ok(tags)
    }

    /// Read a link to a digest.
    async fn read_link(&self, path: &Utf8Path) -> RegistryResult<Option<Digest>> {
        let Some(content) = self.bucket.read(path).await.map_err(backend_failure)? else {
            return Ok(None);
        };

        let data = content.bytes().await.map_err(backend_failure)?;
        let corrupt = |reason: String| RegistryError::CorruptLink {
            path: path.to_string(),
            reason,
        };

        let text = std::str::from_utf8(&data).map_err(|err| corrupt(err.to_string()))?;
        let digest = text
            .trim()
            .parse::<Digest>()
            .map_err(|err| corrupt(err.to_string()))?;
        Ok(Some(digest))
    }

    async fn write_link(&self, path: &Utf8Path, digest: &Digest) -> RegistryResult<()> {
        let link = digest.to_string();
        self.bucket
            .upload(path, &mut BufReader::new(link.as_bytes()))
            .await
            .map_err(backend_failure)?;
        Ok(())
    }
}

fn backend_failure(err: StorageError) -> RegistryError {
    tracing::debug!(
        retryable = err.is_retryable(),
        "storage backend failed: {err}\n{}",
        err.span_trace()
    );
    RegistryError::Storage(err)
}
