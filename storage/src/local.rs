use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use eyre::WrapErr;
use futures::TryStreamExt;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::Instrument;

use storage_driver::{Content, Driver, Reader, StorageError, StorageErrorKind};

const LOCAL_STORAGE_NAME: &str = "local";

/// Prefix of in-flight uploads, which `list` skips.
const STAGING_PREFIX: &str = ".upload-";

/// Storage driver which keeps each bucket in a directory under `root`.
#[derive(Debug)]
pub struct LocalDriver {
    root: Utf8PathBuf,
}

impl LocalDriver {
    /// Driver rooted at `root`, which is created on first upload.
    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    fn path(&self, bucket: &str, remote: &Utf8Path) -> Utf8PathBuf {
        let mut path = self.root.join(bucket);
        path.push(remote);
        path
    }

    fn io_error(&self, bucket: &str, remote: &Utf8Path, context: &str, err: io::Error) -> StorageError {
        StorageError::builder(self.name(), err.kind().into(), err)
            .bucket(bucket)
            .path(remote.as_str())
            .context(context)
            .build()
    }
}

#[async_trait::async_trait]
impl Driver for LocalDriver {
    fn name(&self) -> &'static str {
        LOCAL_STORAGE_NAME
    }

    async fn read(&self, bucket: &str, remote: &Utf8Path) -> Result<Option<Content>, StorageError> {
        let path = self.path(bucket, remote);

        let file = match tokio::fs::File::open(&path).await {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::trace!(%path, "no such file");
                return Ok(None);
            }
            Err(err) => return Err(self.io_error(bucket, remote, "open file", err)),
        };

        let size = file
            .metadata()
            .await
            .map_err(|err| self.io_error(bucket, remote, "file metadata", err))?
            .len();

        let engine = self.name();
        let stream = ReaderStream::new(file).map_err(move |err| StorageError::io(engine, err));
        Ok(Some(Content::new(stream).with_size(size)))
    }

    async fn upload(
        &self,
        bucket: &str,
        remote: &Utf8Path,
        local: &mut Reader<'_>,
    ) -> Result<(), StorageError> {
        let path = self.path(bucket, remote);
        let Some(parent) = path.parent().map(Utf8Path::to_owned) else {
            return Err(StorageError::builder(
                self.name(),
                StorageErrorKind::InvalidRequest,
                format!("no parent directory for {path}"),
            )
            .bucket(bucket)
            .path(remote.as_str())
            .build());
        };

        tokio::fs::create_dir_all(&parent)
            .await
            .map_err(|err| self.io_error(bucket, remote, "create_dir_all", err))?;

        // Staged beside `path` and renamed over it, so readers see either the
        // old file or the whole new one.
        let staged = tokio::task::spawn_blocking(move || {
            tempfile::Builder::new()
                .prefix(STAGING_PREFIX)
                .tempfile_in(&parent)
        })
        .in_current_span()
        .await
        .map_err(|err| self.io_error(bucket, remote, "join create temporary file", err.into()))?
        .map_err(|err| self.io_error(bucket, remote, "create temporary file", err))?;
        let (file, staged) = staged.into_parts();

        let mut writer = tokio::io::BufWriter::new(tokio::fs::File::from_std(file));

        tokio::io::copy(local, &mut writer)
            .await
            .map_err(|err| self.io_error(bucket, remote, "copy", err))?;

        writer
            .shutdown()
            .await
            .map_err(|err| self.io_error(bucket, remote, "shutdown writer", err))?;
        drop(writer);

        tokio::task::spawn_blocking(move || staged.persist(path))
            .in_current_span()
            .await
            .map_err(|err| self.io_error(bucket, remote, "join rename", err.into()))?
            .map_err(|err| self.io_error(bucket, remote, "rename into place", err.error))?;
        Ok(())
    }

    async fn delete(&self, bucket: &str, remote: &Utf8Path) -> Result<(), StorageError> {
        let path = self.path(bucket, remote);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(self.io_error(bucket, remote, "remove_file", err)),
        }
    }

    async fn list(
        &self,
        bucket: &str,
        prefix: Option<&Utf8Path>,
    ) -> Result<Vec<String>, StorageError> {
        let root = self.root.join(bucket);
        let start = match prefix {
            Some(prefix) => root.join(prefix),
            None => root.clone(),
        };

        let items = tokio::task::spawn_blocking(move || collect_list(&root, &start))
            .in_current_span()
            .await
            .wrap_err("local driver: join list task")
            .map_err(StorageError::with(self.name(), StorageErrorKind::Other))?
            .map_err(StorageError::with(self.name(), StorageErrorKind::Io))?;

        tracing::debug!("Found {} entries", items.len());
        Ok(items)
    }
}

#[tracing::instrument]
fn collect_list(root: &Utf8Path, start: &Utf8Path) -> eyre::Result<Vec<String>> {
    let mut files = Vec::new();

    if start.is_dir() {
        visit(start, &mut files).wrap_err_with(|| format!("walking {start}"))?;
    } else if start.is_file() {
        files.push(start.to_owned());
    }

    Ok(files
        .into_iter()
        .filter_map(|p| p.strip_prefix(root).ok().map(|p| p.to_string()))
        .collect())
}

fn visit(path: &Utf8Path, files: &mut Vec<Utf8PathBuf>) -> eyre::Result<()> {
    for entry in path.read_dir_utf8()? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            visit(entry.path(), files)?;
        } else if !entry.file_name().starts_with(STAGING_PREFIX) {
            files.push(entry.path().to_owned())
        }
    }

    Ok(())
}
