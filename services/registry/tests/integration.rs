//! Integration tests for manifest lookup

use std::sync::Once;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::Bytes;
use camino::{Utf8Path, Utf8PathBuf};
use futures::TryStreamExt;
use registry::{Digest, ManifestRef, RegistryBuilder, RegistryError, RegistryStorage, RepositoryName, Tag};
use storage::{Content, Driver, LocalDriver, MemoryStorage, Reader, StorageError, StorageErrorKind};

fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("registry=trace,storage=trace")
            .with_test_writer()
            .try_init();
    });
}

fn manifest() -> Vec<u8> {
    serde_json::to_vec_pretty(&serde_json::json!({
        "schemaVersion": 2,
        "mediaType": "application/vnd.docker.distribution.manifest.v2+json",
        "config": {
            "mediaType": "application/vnd.docker.container.image.v1+json",
            "size": 1234,
            "digest": "sha256:0d7e9b6b1a5e4f02b0e1c2f2a6ad4d9ac3f8b4a1d0f6f0e7e9b6d7f3c2a1b0c9"
        },
        "layers": [
            {
                "mediaType": "application/vnd.docker.image.rootfs.diff.tar.gzip",
                "size": 32654,
                "digest": "sha256:e692418e4cbaf90ca69d05a66403747baa33ee08806650b51fab815ad7fc331f"
            }
        ]
    }))
    .unwrap()
}

fn local_registry() -> (tempfile::TempDir, RegistryStorage) {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(dir.path().to_owned()).unwrap();
    let registry = RegistryBuilder::new()
        .storage(LocalDriver::new(root).into())
        .bucket("test-registry")
        .build()
        .unwrap();
    (dir, registry)
}

fn repo(name: &str) -> RepositoryName {
    RepositoryName::new(name).unwrap()
}

#[tokio::test]
async fn test_read_manifest_by_tag() {
    let (_dir, registry) = local_registry();
    let data = manifest();
    let reference = ManifestRef::Tag(Tag::new("1").unwrap());

    registry
        .put_manifest(&repo("test"), &reference, &data)
        .await
        .unwrap();

    let content = registry
        .get_manifest(&repo("test"), &reference)
        .await
        .unwrap()
        .expect("manifest should be present");
    assert_eq!(content.size(), Some(data.len() as u64));
    assert_eq!(content.bytes().await.unwrap().to_vec(), data);
}

#[tokio::test]
async fn test_absent_tag_reads_as_none() {
    let (_dir, registry) = local_registry();
    registry
        .put_manifest(&repo("test"), &"1".parse().unwrap(), &manifest())
        .await
        .unwrap();

    let content = registry
        .get_manifest(&repo("test"), &"2".parse().unwrap())
        .await
        .unwrap();
    assert!(content.is_none());

    let content = registry
        .get_manifest(&repo("never/pushed"), &"latest".parse().unwrap())
        .await
        .unwrap();
    assert!(content.is_none());
}

#[tokio::test]
async fn test_read_manifest_by_digest() {
    let (_dir, registry) = local_registry();
    let data = manifest();
    let digest = Digest::sha256(&data);
    let reference: ManifestRef = format!("sha256:{}", digest.hex()).parse().unwrap();

    registry
        .put_manifest(&repo("library/ubuntu"), &reference, &data)
        .await
        .unwrap();

    for _ in 0..2 {
        let content = registry
            .get_manifest(&repo("library/ubuntu"), &reference)
            .await
            .unwrap()
            .unwrap();
        let chunks: Vec<Bytes> = content.try_collect().await.unwrap();
        assert_eq!(chunks.concat(), data);
    }
}

#[tokio::test]
async fn test_tags_on_local_storage() {
    let (_dir, registry) = local_registry();
    let name = repo("library/ubuntu");

    assert!(registry.tags(&name).await.unwrap().is_empty());

    for tag in ["22.04", "latest", "20.04"] {
        registry
            .put_manifest(&name, &tag.parse().unwrap(), &manifest())
            .await
            .unwrap();
    }

    let tags: Vec<String> = registry
        .tags(&name)
        .await
        .unwrap()
        .into_iter()
        .map(|tag| tag.to_string())
        .collect();
    assert_eq!(tags, ["20.04", "22.04", "latest"]);
}

#[tokio::test]
async fn test_invalid_input_never_reaches_storage() {
    assert!(matches!(
        "UPPER/name".parse::<RepositoryName>(),
        Err(registry::InvalidName::BadComponentPattern { .. })
    ));
    assert!(matches!(
        "sha256:1234".parse::<ManifestRef>(),
        Err(RegistryError::InvalidDigest(_))
    ));
}

/// Driver which fails every call, counting how often it was asked.
#[derive(Debug)]
struct FailingDriver {
    kind: StorageErrorKind,
    calls: AtomicUsize,
}

impl FailingDriver {
    fn new(kind: StorageErrorKind) -> Self {
        Self {
            kind,
            calls: AtomicUsize::new(0),
        }
    }

    fn fail(&self) -> StorageError {
        self.calls.fetch_add(1, Ordering::SeqCst);
        StorageError::new(self.name(), self.kind, std::io::Error::other("backend is down"))
    }
}

#[async_trait::async_trait]
impl Driver for FailingDriver {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn read(&self, _bucket: &str, _remote: &Utf8Path) -> Result<Option<Content>, StorageError> {
        Err(self.fail())
    }

    async fn upload(
        &self,
        _bucket: &str,
        _remote: &Utf8Path,
        _reader: &mut Reader<'_>,
    ) -> Result<(), StorageError> {
        Err(self.fail())
    }

    async fn delete(&self, _bucket: &str, _remote: &Utf8Path) -> Result<(), StorageError> {
        Err(self.fail())
    }

    async fn list(
        &self,
        _bucket: &str,
        _prefix: Option<&Utf8Path>,
    ) -> Result<Vec<String>, StorageError> {
        Err(self.fail())
    }
}

#[tokio::test]
async fn test_backend_errors_propagate_without_retry() {
    init_tracing();
    let driver = std::sync::Arc::new(FailingDriver::new(StorageErrorKind::ServiceUnavailable));
    let registry = RegistryStorage::new(storage::Storage::from(SharedDriver(driver.clone())), "test");

    let err = registry
        .get_manifest(&repo("test"), &"latest".parse().unwrap())
        .await
        .unwrap_err();

    let RegistryError::Storage(source) = &err else {
        panic!("expected a storage error, got {err:?}");
    };
    assert_eq!(source.kind(), StorageErrorKind::ServiceUnavailable);
    assert!(err.is_transient());
    assert_eq!(driver.calls.load(Ordering::SeqCst), 1);

    let digest = ManifestRef::Digest(Digest::sha256(b"x"));
    let err = registry.get_manifest(&repo("test"), &digest).await.unwrap_err();
    assert!(err.is_transient());
    assert_eq!(driver.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_fatal_backend_errors_are_not_transient() {
    let registry = RegistryStorage::new(
        storage::Storage::from(FailingDriver::new(StorageErrorKind::PermissionDenied)),
        "test",
    );

    let err = registry
        .get_manifest(&repo("test"), &"latest".parse().unwrap())
        .await
        .unwrap_err();
    assert!(!err.is_transient());
}

/// Lets a test keep a handle on a driver owned by `Storage`.
#[derive(Debug)]
struct SharedDriver(std::sync::Arc<FailingDriver>);

#[async_trait::async_trait]
impl Driver for SharedDriver {
    fn name(&self) -> &'static str {
        self.0.name()
    }

    async fn read(&self, bucket: &str, remote: &Utf8Path) -> Result<Option<Content>, StorageError> {
        self.0.read(bucket, remote).await
    }

    async fn upload(
        &self,
        bucket: &str,
        remote: &Utf8Path,
        reader: &mut Reader<'_>,
    ) -> Result<(), StorageError> {
        self.0.upload(bucket, remote, reader).await
    }

    async fn delete(&self, bucket: &str, remote: &Utf8Path) -> Result<(), StorageError> {
        self.0.delete(bucket, remote).await
    }

    async fn list(
        &self,
        bucket: &str,
        prefix: Option<&Utf8Path>,
    ) -> Result<Vec<String>, StorageError> {
        self.0.list(bucket, prefix).await
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_digest_reads() {
    init_tracing();
    let storage = MemoryStorage::with_buckets(&["registry"]).with_chunk_size(64);
    let registry = RegistryBuilder::new()
        .storage(storage.into())
        .build()
        .unwrap();

    let data = manifest();
    let name = repo("library/ubuntu");
    let digest = registry
        .put_manifest(&name, &"latest".parse().unwrap(), &data)
        .await
        .unwrap();
    let reference = ManifestRef::Digest(digest);

    let reads = (0..16).map(|_| {
        let registry = registry.clone();
        let name = name.clone();
        let reference = reference.clone();
        tokio::spawn(async move {
            registry
                .get_manifest(&name, &reference)
                .await
                .unwrap()
                .unwrap()
                .bytes()
                .await
                .unwrap()
        })
    });

    for read in futures::future::join_all(reads).await {
        assert_eq!(read.unwrap().to_vec(), data);
    }
}

#[tokio::test]
async fn test_digest_is_not_visible_across_repositories() {
    let (_dir, registry) = local_registry();
    let data = manifest();

    let digest = registry
        .put_manifest(&repo("team-a/secret"), &"latest".parse().unwrap(), &data)
        .await
        .unwrap();

    let content = registry
        .get_manifest(&repo("team-b/public"), &ManifestRef::Digest(digest.clone()))
        .await
        .unwrap();
    assert!(content.is_none());

    let content = registry
        .get_manifest(&repo("team-a/secret"), &ManifestRef::Digest(digest))
        .await
        .unwrap();
    assert!(content.is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_digest_reads_while_content_is_stored_again() {
    let (_dir, registry) = local_registry();
    let name = repo("library/ubuntu");
    let data: Vec<u8> = (0..512 * 1024).map(|i| (i % 251) as u8).collect();
    let digest = registry
        .put_manifest(&name, &"latest".parse().unwrap(), &data)
        .await
        .unwrap();
    let reference = ManifestRef::Digest(digest);

    let writer = {
        let registry = registry.clone();
        let name = name.clone();
        let reference = reference.clone();
        let data = data.clone();
        tokio::spawn(async move {
            for _ in 0..100 {
                registry.put_manifest(&name, &reference, &data).await.unwrap();
            }
        })
    };

    let mut reads = 0;
    while !writer.is_finished() || reads == 0 {
        let content = registry
            .get_manifest(&name, &reference)
            .await
            .unwrap()
            .expect("stored digest should stay readable");
        assert_eq!(content.bytes().await.unwrap().to_vec(), data);
        reads += 1;
    }
    writer.await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_tag_reads_while_tag_is_repointed() {
    let (_dir, registry) = local_registry();
    let name = repo("library/ubuntu");
    let latest: ManifestRef = "latest".parse().unwrap();
    let first = manifest();
    let second = b"{\"schemaVersion\":2,\"layers\":[]}".to_vec();

    registry.put_manifest(&name, &latest, &first).await.unwrap();

    let writer = {
        let registry = registry.clone();
        let name = name.clone();
        let latest = latest.clone();
        let (first, second) = (first.clone(), second.clone());
        tokio::spawn(async move {
            for round in 0..200 {
                let data = if round % 2 == 0 { &second } else { &first };
                registry.put_manifest(&name, &latest, data).await.unwrap();
            }
        })
    };

    let mut reads = 0;
    while !writer.is_finished() || reads == 0 {
        let content = registry
            .get_manifest(&name, &latest)
            .await
            .unwrap()
            .expect("tag should always resolve");
        let bytes = content.bytes().await.unwrap().to_vec();
        assert!(bytes == first || bytes == second, "read a manifest that was never stored");
        reads += 1;
    }
    writer.await.unwrap();
}
