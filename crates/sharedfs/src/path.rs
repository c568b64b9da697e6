//! Paths inside a shared folder.
//!
//! The host addresses entries by path relative to the share root. A
//! [`SharePath`] is rebuilt from the node tree before every host call and
//! dropped when the call returns.

use relative_path::{RelativePath, RelativePathBuf};
use std::fmt;

/// A path relative to the root of the shared folder.
///
/// The root is the empty path. Display adds a leading slash so log output
/// reads like an absolute path.
///
/// # Examples
///
/// ```
/// use sharedfs::SharePath;
///
/// let path = SharePath::new("/docs/report.txt");
/// assert_eq!(path.as_str(), "docs/report.txt");
/// assert_eq!(path.file_name(), Some("report.txt"));
/// assert_eq!(path.to_string(), "/docs/report.txt");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SharePath(RelativePathBuf);

impl SharePath {
    /// The root path (empty).
    #[inline]
    pub fn root() -> Self {
        SharePath(RelativePathBuf::new())
    }

    /// Creates a share path from a string, stripping leading slashes.
    pub fn new(path: impl AsRef<str>) -> Self {
        let s = path.as_ref().trim_start_matches('/');
        SharePath(RelativePathBuf::from(s))
    }

    /// Builds a path from root-to-leaf segments.
    pub fn from_components<'a>(components: impl IntoIterator<Item = &'a str>) -> Self {
        let mut buf = RelativePathBuf::new();
        for component in components {
            buf.push(component);
        }
        SharePath(buf)
    }

    /// Check if this is the root path.
    #[inline]
    pub fn is_root(&self) -> bool {
        self.0.as_str().is_empty()
    }

    /// Get the string representation of this path, without a leading slash.
    #[inline]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Get the underlying `RelativePath`.
    #[inline]
    pub fn as_relative_path(&self) -> &RelativePath {
        &self.0
    }

    /// Join this path with one more segment.
    pub fn join(&self, component: impl AsRef<str>) -> Self {
        SharePath(self.0.join(component.as_ref()))
    }

    /// Get the parent path. Returns `None` for the root path.
    pub fn parent(&self) -> Option<SharePath> {
        if self.is_root() {
            return None;
        }
        self.0.parent().map(|p| SharePath(p.to_relative_path_buf()))
    }

    /// Get the final segment. Returns `None` for the root path.
    pub fn file_name(&self) -> Option<&str> {
        self.0.file_name()
    }

    /// Iterate over the segments of this path.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.0.components().map(|c| c.as_str())
    }

    /// Returns true if `self` is `other` or lies beneath it.
    pub fn starts_with(&self, other: &SharePath) -> bool {
        other.is_root() || self.0.starts_with(&other.0)
    }
}

impl AsRef<str> for SharePath {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for SharePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            write!(f, "/")
        } else {
            write!(f, "/{}", self.0)
        }
    }
}
