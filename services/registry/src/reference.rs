//! Manifest references

use std::fmt;
use std::str::FromStr;

use crate::digest::Digest;
use crate::error::RegistryError;
use crate::name::Tag;

/// How a manifest is addressed within a repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ManifestRef {
    /// Whatever manifest the tag currently points at.
    Tag(Tag),

    /// Exactly the manifest with this content digest.
    Digest(Digest),
}

impl ManifestRef {
    /// The tag, for tag references.
    pub fn as_tag(&self) -> Option<&Tag> {
        match self {
            ManifestRef::Tag(tag) => Some(tag),
            ManifestRef::Digest(_) => None,
        }
    }

    /// The digest, for digest references.
    pub fn as_digest(&self) -> Option<&Digest> {
        match self {
            ManifestRef::Tag(_) => None,
            ManifestRef::Digest(digest) => Some(digest),
        }
    }

    /// Whether this reference is content addressed, and so always resolves
    /// to the same bytes.
    pub fn is_digest(&self) -> bool {
        matches!(self, ManifestRef::Digest(_))
    }
}

impl From<Tag> for ManifestRef {
    fn from(tag: Tag) -> Self {
        ManifestRef::Tag(tag)
    }
}

impl From<Digest> for ManifestRef {
    fn from(digest: Digest) -> Self {
        ManifestRef::Digest(digest)
    }
}

impl fmt::Display for ManifestRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManifestRef::Tag(tag) => tag.fmt(f),
            ManifestRef::Digest(digest) => digest.fmt(f),
        }
    }
}

/// Parses the `<reference>` segment of a manifest path: anything with a `:`
/// is a digest, everything else is a tag.
impl FromStr for ManifestRef {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.contains(':') {
            Ok(ManifestRef::Digest(s.parse()?))
        } else {
            Ok(ManifestRef::Tag(s.parse()?))
        }
    }
}
