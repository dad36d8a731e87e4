//! Repository names and tags
//!
//! A repository name is broken up into `/`-separated path components. Each
//! component is one or more lowercase alphanumerics, optionally separated by
//! single periods, dashes or underscores:
//!
//! ```text
//! [a-z0-9]+(?:[._-][a-z0-9]+)*
//! ```
//!
//! The total length of a repository name, including slashes, must be less
//! than 256 characters.
//!
//! Tags follow the OCI distribution grammar `[a-zA-Z0-9_][a-zA-Z0-9._-]{0,127}`.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

/// Repository names must be strictly shorter than this many characters.
pub const MAX_NAME_LEN: usize = 256;

/// Tags may be at most this many characters long.
pub const MAX_TAG_LEN: usize = 128;

static COMPONENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]+(?:[._-][a-z0-9]+)*$").expect("repository component pattern")
});

static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_][a-zA-Z0-9._-]{0,127}$").expect("tag pattern"));

/// Reasons a repository name is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidName {
    /// The name has 256 or more characters.
    #[error("repository name must be less than {max} characters, got {length}", max = MAX_NAME_LEN)]
    TooLong {
        /// Length of the rejected name, in characters.
        length: usize,
    },

    /// The name ends with `/`.
    #[error("repository name can't end with a slash")]
    TrailingSlash,

    /// The name is empty, starts with `/`, or contains `//`.
    #[error("repository name can't contain an empty path component")]
    EmptyComponent,

    /// A path component doesn't match the component grammar.
    #[error("invalid repository name component: {component:?}")]
    BadComponentPattern {
        /// The offending component.
        component: String,
    },
}

/// Reasons a tag is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidTag {
    /// The tag is the empty string.
    #[error("tag can't be empty")]
    Empty,

    /// The tag is longer than 128 characters.
    #[error("tag must be at most {max} characters, got {length}", max = MAX_TAG_LEN)]
    TooLong {
        /// Length of the rejected tag, in characters.
        length: usize,
    },

    /// The tag contains characters outside `[a-zA-Z0-9._-]`, or starts with `.` or `-`.
    #[error("invalid tag: {tag:?}")]
    BadPattern {
        /// The rejected tag.
        tag: String,
    },
}

/// Validate a repository name.
///
/// The name is returned exactly as given: no case folding or trimming is
/// performed, so the input must already be canonical.
pub fn validate_repository_name(raw: &str) -> Result<RepositoryName, InvalidName> {
    let length = raw.chars().count();
    if length >= MAX_NAME_LEN {
        return Err(InvalidName::TooLong { length });
    }

    if raw.ends_with('/') {
        return Err(InvalidName::TrailingSlash);
    }

    for component in raw.split('/') {
        if component.is_empty() {
            return Err(InvalidName::EmptyComponent);
        }
        if !COMPONENT.is_match(component) {
            return Err(InvalidName::BadComponentPattern {
                component: component.to_owned(),
            });
        }
    }

    Ok(RepositoryName(raw.to_owned()))
}

/// Validate a tag.
pub fn validate_tag(raw: &str) -> Result<Tag, InvalidTag> {
    if raw.is_empty() {
        return Err(InvalidTag::Empty);
    }

    let length = raw.chars().count();
    if length > MAX_TAG_LEN {
        return Err(InvalidTag::TooLong { length });
    }

    if !TAG.is_match(raw) {
        return Err(InvalidTag::BadPattern {
            tag: raw.to_owned(),
        });
    }

    Ok(Tag(raw.to_owned()))
}

/// A validated repository name, e.g. `library/ubuntu`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RepositoryName(String);

impl RepositoryName {
    /// Validate `raw` as a repository name.
    pub fn new(raw: &str) -> Result<Self, InvalidName> {
        validate_repository_name(raw)
    }

    /// The name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `/`-separated path components of the name.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }
}

impl fmt::Display for RepositoryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RepositoryName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for RepositoryName {
    type Err = InvalidName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        validate_repository_name(s)
    }
}

impl TryFrom<String> for RepositoryName {
    type Error = InvalidName;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        validate_repository_name(&value)
    }
}

/// A validated tag, e.g. `latest` or `v1.2.3`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag(String);

impl Tag {
    /// Validate `raw` as a tag.
    pub fn new(raw: &str) -> Result<Self, InvalidTag> {
        validate_tag(raw)
    }

    /// The tag as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Tag {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for Tag {
    type Err = InvalidTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        validate_tag(s)
    }
}

impl TryFrom<String> for Tag {
    type Error = InvalidTag;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        validate_tag(&value)
    }
}
