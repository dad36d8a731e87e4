//! Storage key layout
//!
//! ```text
//! blobs/<algorithm>/<first two hex chars>/<hex>/data
//! repositories/<name>/_manifests/revisions/<algorithm>/<hex>/link
//! repositories/<name>/_manifests/tags/<tag>/current/link
//! ```
//!
//! Content is shared between repositories. A repository only sees the
//! manifests linked from its own `revisions` directory.
//!
//! Both names and tags are validated before they reach this module, and
//! neither grammar admits `.` or `..` as a path component.

use camino::{Utf8Path, Utf8PathBuf};

use crate::digest::Digest;
use crate::name::{RepositoryName, Tag};
use crate::reference::ManifestRef;

/// Suffix of every tag pointer below its tag directory.
pub(crate) const CURRENT_LINK: &str = "current/link";

/// Key of the immutable content with this digest.
pub(crate) fn blob_path(digest: &Digest) -> Utf8PathBuf {
    let hex = digest.hex();
    Utf8PathBuf::from(format!(
        "blobs/{}/{}/{}/data",
        digest.algorithm(),
        &hex[..2],
        hex
    ))
}

/// Key of the link which makes `digest` visible in `repository`.
pub(crate) fn revision_link(repository: &RepositoryName, digest: &Digest) -> Utf8PathBuf {
    Utf8PathBuf::from(format!(
        "repositories/{repository}/_manifests/revisions/{}/{}/link",
        digest.algorithm(),
        digest.hex()
    ))
}

/// Directory holding one sub-directory per tag of `repository`.
pub(crate) fn tags_dir(repository: &RepositoryName) -> Utf8PathBuf {
    Utf8PathBuf::from(format!("repositories/{repository}/_manifests/tags"))
}

/// Key of the mutable pointer from `tag` to a digest.
pub(crate) fn tag_link(repository: &RepositoryName, tag: &Tag) -> Utf8PathBuf {
    let mut path = tags_dir(repository);
    path.push(tag.as_str());
    path.push(CURRENT_LINK);
    path
}

/// Link consulted first when looking up `reference` in `repository`.
pub(crate) fn manifest_path(repository: &RepositoryName, reference: &ManifestRef) -> Utf8PathBuf {
    match reference {
        ManifestRef::Tag(tag) => tag_link(repository, tag),
        ManifestRef::Digest(digest) => revision_link(repository, digest),
    }
}

/// The tag whose pointer lives at `key`, if `key` is a tag pointer below `tags_dir`.
pub(crate) fn tag_of_link<'k>(tags_dir: &Utf8Path, key: &'k Utf8Path) -> Option<&'k str> {
    let relative = key.strip_prefix(tags_dir).ok()?;
    let tag = relative.parent()?.parent()?;
    (relative.ends_with(CURRENT_LINK) && tag.components().count() == 1).then(|| tag.as_str())
}
