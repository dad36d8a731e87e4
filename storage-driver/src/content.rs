use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use futures::stream::{self, BoxStream};
use futures::{Stream, StreamExt, TryStreamExt};

use crate::error::StorageError;

/// A boxed stream of byte chunks read from storage.
pub type ByteStream = BoxStream<'static, Result<Bytes, StorageError>>;

/// Stored object contents, delivered as a lazy, single-pass stream of chunks.
///
/// The stream owns whatever backend handle it needs (an open file, a
/// snapshot of an in-memory buffer), and releases it when dropped.
pub struct Content {
    size: Option<u64>,
    stream: ByteStream,
}

impl fmt::Debug for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Content")
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

impl Content {
    /// Wrap a stream of chunks.
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, StorageError>> + Send + 'static,
    {
        Self {
            size: None,
            stream: stream.boxed(),
        }
    }

    /// Content made of a single, already materialized chunk.
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        let size = data.len() as u64;
        Self::new(stream::once(async move { Ok(data) })).with_size(size)
    }

    /// Content which yields `data` in chunks of at most `chunk_size` bytes.
    pub fn chunked(data: Bytes, chunk_size: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        let size = data.len() as u64;
        let chunks = (0..data.len())
            .step_by(chunk_size)
            .map(move |start| Ok(data.slice(start..(start + chunk_size).min(data.len()))));
        Self::new(stream::iter(chunks)).with_size(size)
    }

    /// Attach the total size in bytes, when the backend knows it up front.
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Total size in bytes, if known.
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    /// Unwrap the underlying chunk stream.
    pub fn into_stream(self) -> ByteStream {
        self.stream
    }

    /// Drain the stream and concatenate every chunk.
    pub async fn bytes(mut self) -> Result<Bytes, StorageError> {
        let capacity = self.size.unwrap_or_default() as usize;
        let mut buffer = BytesMut::with_capacity(capacity);
        while let Some(chunk) = self.stream.try_next().await? {
            buffer.extend_from_slice(&chunk);
        }
        Ok(buffer.freeze())
    }
}

impl Stream for Content {
    type Item = Result<Bytes, StorageError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.stream.poll_next_unpin(cx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.stream.size_hint()
    }
}
