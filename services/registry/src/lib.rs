//! # Container registry core
//!
//! Naming rules and manifest lookup for an OCI / Docker container registry,
//! on top of a pluggable storage backend from the `storage` crate.
//!
//! - Repository names and tags are validated once, when they are constructed
//!   ([`validate_repository_name`], [`validate_tag`]).
//! - A [`ManifestRef`] addresses a manifest either by tag or by content digest.
//! - [`RegistryStorage::get_manifest`] resolves a reference to a stream of
//!   manifest bytes, or `None` when nothing is stored.
//!
//! ## Example
//!
//! ```no_run
//! use registry::{ManifestRef, RegistryBuilder, RepositoryName};
//! use storage::MemoryStorage;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let storage = MemoryStorage::with_buckets(&["registry"]);
//! let registry = RegistryBuilder::new()
//!     .storage(storage.into())
//!     .bucket("registry")
//!     .build()?;
//!
//! let name = RepositoryName::new("library/ubuntu")?;
//! let reference: ManifestRef = "latest".parse()?;
//! if let Some(manifest) = registry.get_manifest(&name, &reference).await? {
//!     let bytes = manifest.bytes().await?;
//!     println!("{} bytes", bytes.len());
//! }
//! # Ok(())
//! # }
//! ```

mod config;
mod digest;
mod error;
mod layout;
mod name;
mod reference;
mod storage;

pub use self::config::{RegistryBuilder, RegistryConfig};
pub use self::digest::{Algorithm, Digest, InvalidDigest};
pub use self::error::{RegistryError, RegistryResult};
pub use self::name::{
    InvalidName, InvalidTag, MAX_NAME_LEN, MAX_TAG_LEN, RepositoryName, Tag,
    validate_repository_name, validate_tag,
};
pub use self::reference::ManifestRef;
pub use self::storage::RegistryStorage;

#[doc(no_inline)]
pub use ::storage::Content;
