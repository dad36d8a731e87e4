use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error as StdError;
use std::fmt;
use std::io;

use tracing_error::SpanTrace;

/// What went wrong in a storage backend, independent of which backend it was.
///
/// A key that isn't there is never an error: [`Driver::read`](crate::Driver::read)
/// reports it as `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorKind {
    /// The bucket itself doesn't exist, which usually means misconfiguration.
    NotFound,

    /// The backend refused access.
    PermissionDenied,

    /// Reading or writing the backing medium failed.
    Io,

    /// The backend can't be reached right now.
    ServiceUnavailable,

    /// The backend rejected the request as malformed.
    InvalidRequest,

    /// Anything else.
    Other,
}

impl StorageErrorKind {
    /// Whether the same call might succeed if made again later.
    ///
    /// Advisory only: no layer of the storage stack retries on its own.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StorageErrorKind::ServiceUnavailable | StorageErrorKind::Io
        )
    }
}

impl From<io::ErrorKind> for StorageErrorKind {
    fn from(kind: io::ErrorKind) -> Self {
        match kind {
            io::ErrorKind::NotFound => StorageErrorKind::NotFound,
            io::ErrorKind::PermissionDenied => StorageErrorKind::PermissionDenied,
            io::ErrorKind::InvalidInput => StorageErrorKind::InvalidRequest,
            io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::TimedOut => StorageErrorKind::ServiceUnavailable,
            _ => StorageErrorKind::Io,
        }
    }
}

impl fmt::Display for StorageErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StorageErrorKind::NotFound => "not found",
            StorageErrorKind::PermissionDenied => "permission denied",
            StorageErrorKind::Io => "I/O error",
            StorageErrorKind::ServiceUnavailable => "service unavailable",
            StorageErrorKind::InvalidRequest => "invalid request",
            StorageErrorKind::Other => "other error",
        })
    }
}

/// Where the error was raised. Boxed to keep `Result<_, StorageError>` small.
struct Origin {
    backtrace: Backtrace,
    span_trace: SpanTrace,
}

impl Origin {
    #[track_caller]
    fn capture() -> Box<Self> {
        Box::new(Origin {
            backtrace: Backtrace::capture(),
            span_trace: SpanTrace::capture(),
        })
    }
}

/// Error raised by a storage backend.
///
/// Carries the [`StorageErrorKind`], the engine that raised it, the bucket
/// and key involved when known, and the tracing spans active at the time.
///
/// ```rust
/// use storage_driver::{StorageError, StorageErrorKind};
///
/// let error = StorageError::builder(
///     "memory",
///     StorageErrorKind::NotFound,
///     std::io::Error::new(std::io::ErrorKind::NotFound, "no such bucket"),
/// )
/// .bucket("registry")
/// .build();
///
/// assert_eq!(error.kind(), StorageErrorKind::NotFound);
/// assert_eq!(error.bucket(), Some("registry"));
/// ```
pub struct StorageError {
    kind: StorageErrorKind,
    engine: &'static str,
    bucket: Option<String>,
    path: Option<String>,
    context: Option<String>,
    source: Box<dyn StdError + Send + Sync + 'static>,
    origin: Box<Origin>,
}

impl StdError for StorageError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.source.as_ref())
    }
}

impl StorageError {
    /// Storage error with no bucket or key attached.
    #[track_caller]
    pub fn new<E>(engine: &'static str, kind: StorageErrorKind, error: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync + 'static>>,
    {
        Self::builder(engine, kind, error).build()
    }

    /// Storage error whose kind follows from the I/O error kind.
    #[track_caller]
    pub fn io(engine: &'static str, error: io::Error) -> Self {
        let kind = error.kind().into();
        Self::new(engine, kind, error)
    }

    /// Start a storage error which names the bucket and key involved.
    pub fn builder<E>(engine: &'static str, kind: StorageErrorKind, error: E) -> StorageErrorBuilder
    where
        E: Into<Box<dyn StdError + Send + Sync + 'static>>,
    {
        StorageErrorBuilder {
            engine,
            kind,
            source: error.into(),
            bucket: None,
            path: None,
            context: None,
        }
    }

    /// Converter for `.map_err()`.
    ///
    /// ```rust
    /// use storage_driver::{StorageError, StorageErrorKind};
    ///
    /// fn operation() -> Result<(), StorageError> {
    ///     std::fs::File::open("file.txt")
    ///         .map_err(StorageError::with("local", StorageErrorKind::Io))?;
    ///     Ok(())
    /// }
    /// ```
    pub fn with<E>(
        engine: &'static str,
        kind: StorageErrorKind,
    ) -> Box<dyn FnOnce(E) -> StorageError + Send + Sync>
    where
        E: Into<Box<dyn StdError + Send + Sync + 'static>>,
    {
        Box::new(move |error: E| StorageError::new(engine, kind, error))
    }

    /// The error kind.
    pub fn kind(&self) -> StorageErrorKind {
        self.kind
    }

    /// Name of the engine which raised the error.
    pub fn engine(&self) -> &'static str {
        self.engine
    }

    /// The bucket involved, if known.
    pub fn bucket(&self) -> Option<&str> {
        self.bucket.as_deref()
    }

    /// The key involved, if known.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// What the backend was doing, if recorded.
    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    /// See [`StorageErrorKind::is_retryable`].
    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    /// Tracing spans active where the error was raised.
    pub fn span_trace(&self) -> &SpanTrace {
        &self.origin.span_trace
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Storage error [{}] from {}", self.kind, self.engine)?;

        if let Some(bucket) = &self.bucket {
            write!(f, " (bucket: {bucket})")?;
        }

        if let Some(path) = &self.path {
            write!(f, " (path: {path})")?;
        }

        if let Some(context) = &self.context {
            write!(f, " ({context})")?;
        }

        write!(f, ": {}", self.source)
    }
}

impl fmt::Debug for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            return f
                .debug_struct("StorageError")
                .field("kind", &self.kind)
                .field("engine", &self.engine)
                .field("bucket", &self.bucket)
                .field("path", &self.path)
                .field("context", &self.context)
                .field("source", &self.source)
                .finish_non_exhaustive();
        }

        write!(f, "{self}")?;

        let span_trace = self.origin.span_trace.to_string();
        if !span_trace.is_empty() {
            write!(f, "\n\nSpan trace:\n{span_trace}")?;
        }

        if self.origin.backtrace.status() == BacktraceStatus::Captured {
            write!(f, "\n\nBacktrace:\n{}", self.origin.backtrace)?;
        }

        Ok(())
    }
}

/// Builder for a [`StorageError`] with bucket, key, and context attached.
#[derive(Debug)]
pub struct StorageErrorBuilder {
    kind: StorageErrorKind,
    engine: &'static str,
    source: Box<dyn StdError + Send + Sync + 'static>,
    bucket: Option<String>,
    path: Option<String>,
    context: Option<String>,
}

impl StorageErrorBuilder {
    /// Name the bucket.
    pub fn bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    /// Name the key.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Say what the backend was doing.
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Finish the error, capturing where it was raised.
    #[track_caller]
    pub fn build(self) -> StorageError {
        StorageError {
            kind: self.kind,
            engine: self.engine,
            bucket: self.bucket,
            path: self.path,
            context: self.context,
            source: self.source,
            origin: Origin::capture(),
        }
    }
}
