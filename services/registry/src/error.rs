//! Error types for the registry

use http::StatusCode;
use storage::StorageError;

use crate::digest::{Digest, InvalidDigest};
use crate::name::{InvalidName, InvalidTag};

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Error types for registry operations
///
/// A missing manifest is not an error: lookups return `Ok(None)`.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Invalid repository name
    #[error(transparent)]
    InvalidName(#[from] InvalidName),

    /// Invalid tag
    #[error(transparent)]
    InvalidTag(#[from] InvalidTag),

    /// Invalid digest format
    #[error(transparent)]
    InvalidDigest(#[from] InvalidDigest),

    /// Digest mismatch
    #[error("digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch {
        /// Expected digest
        expected: Digest,
        /// Actual digest
        actual: Digest,
    },

    /// A stored tag pointer does not contain a digest
    #[error("corrupt link at {path}: {reason}")]
    CorruptLink {
        /// Storage key of the pointer
        path: String,
        /// Why it couldn't be read
        reason: String,
    },

    /// Storage error, passed through from the backend
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// The registry was built without a required setting
    #[error("registry is misconfigured: {0}")]
    Misconfigured(&'static str),
}

impl RegistryError {
    /// Whether retrying the same call may succeed.
    ///
    /// Only backend failures can be transient, and only when the backend
    /// classified them that way.
    pub fn is_transient(&self) -> bool {
        match self {
            RegistryError::Storage(err) => err.is_retryable(),
            _ => false,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            RegistryError::InvalidName(_)
            | RegistryError::InvalidTag(_)
            | RegistryError::InvalidDigest(_)
            | RegistryError::DigestMismatch { .. } => StatusCode::BAD_REQUEST,
            RegistryError::Storage(err) if err.is_retryable() => StatusCode::SERVICE_UNAVAILABLE,
            RegistryError::CorruptLink { .. }
            | RegistryError::Storage(_)
            | RegistryError::Misconfigured(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for OCI error responses
    pub fn error_code(&self) -> &'static str {
        match self {
            RegistryError::InvalidName(_) => "NAME_INVALID",
            RegistryError::InvalidTag(_) => "TAG_INVALID",
            RegistryError::InvalidDigest(_) | RegistryError::DigestMismatch { .. } => {
                "DIGEST_INVALID"
            }
            RegistryError::CorruptLink { .. } => "MANIFEST_INVALID",
            RegistryError::Storage(err) if err.is_retryable() => "UNAVAILABLE",
            RegistryError::Storage(_) | RegistryError::Misconfigured(_) => "UNKNOWN",
        }
    }
}
