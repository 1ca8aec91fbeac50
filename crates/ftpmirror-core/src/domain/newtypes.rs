//! Domain newtypes with validation
//!
//! This module provides strongly-typed wrappers for domain values.
//! Each newtype ensures data validity at construction time.

use std::fmt::{self, Display, Formatter};
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

// ============================================================================
// Path types
// ============================================================================

/// A path relative to the mirrored root, always using `/` as separator
///
/// The same value names a directory (or file) under the local root and
/// the corresponding entry under the remote root. RelativePath ensures
/// the path is:
/// - Non-empty and relative (no leading `/`)
/// - Normalized (no `.` components, no empty segments, no trailing `/`)
/// - Free of `..` traversal
///
/// Backslashes are accepted on input and converted to `/`, so paths
/// produced on hosts with a different separator compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RelativePath(String);

impl RelativePath {
    /// Create a new RelativePath from a string
    ///
    /// # Errors
    /// Returns `DomainError::InvalidPath` if the path is empty, absolute,
    /// or contains a `..` segment
    pub fn new(path: impl Into<String>) -> Result<Self, DomainError> {
        let raw: String = path.into();
        let unified = raw.replace('\\', "/");

        if unified.starts_with('/') {
            return Err(DomainError::InvalidPath(format!(
                "Path must be relative: {raw}"
            )));
        }

        let mut segments = Vec::new();
        for segment in unified.split('/') {
            match segment {
                "" | "." => continue,
                ".." => {
                    return Err(DomainError::InvalidPath(format!(
                        "Path contains traversal: {raw}"
                    )))
                }
                s => segments.push(s),
            }
        }

        if segments.is_empty() {
            return Err(DomainError::InvalidPath(format!(
                "Path has no components: {raw:?}"
            )));
        }

        Ok(Self(segments.join("/")))
    }

    /// Build a RelativePath from `path` expressed relative to `root`
    ///
    /// # Errors
    /// Returns `DomainError::PathNotInRoot` if `path` is not below `root`,
    /// or `DomainError::InvalidPath` if it is the root itself or a segment
    /// is not valid UTF-8
    pub fn from_local(path: &Path, root: &Path) -> Result<Self, DomainError> {
        let stripped = path.strip_prefix(root).map_err(|_| {
            DomainError::PathNotInRoot(format!(
                "{} is not within {}",
                path.display(),
                root.display()
            ))
        })?;

        let mut segments = Vec::new();
        for component in stripped.components() {
            match component {
                Component::Normal(c) => {
                    let s = c.to_str().ok_or_else(|| {
                        DomainError::InvalidPath(format!(
                            "Non UTF-8 path segment in {}",
                            path.display()
                        ))
                    })?;
                    segments.push(s);
                }
                Component::CurDir => {}
                other => {
                    return Err(DomainError::InvalidPath(format!(
                        "Unexpected component {other:?} in {}",
                        path.display()
                    )))
                }
            }
        }

        Self::new(segments.join("/"))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterate over the `/`-separated segments
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// Number of segments (1 for a top-level entry)
    #[must_use]
    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// The first segment, i.e. the top-level entry this path lives under
    #[must_use]
    pub fn top_level(&self) -> &str {
        self.0.split('/').next().unwrap_or(&self.0)
    }

    /// The last segment
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// The parent path, or `None` for a top-level entry
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.0.rfind('/').map(|idx| Self(self.0[..idx].to_string()))
    }

    /// Join a relative path below this one
    ///
    /// # Errors
    /// Returns error if `child` is not itself a valid relative path
    pub fn join(&self, child: &str) -> Result<Self, DomainError> {
        Self::new(format!("{}/{child}", self.0))
    }

    /// Returns true if `self` lies strictly below `ancestor`
    #[must_use]
    pub fn is_descendant_of(&self, ancestor: &RelativePath) -> bool {
        self.0.len() > ancestor.0.len()
            && self.0.starts_with(&ancestor.0)
            && self.0.as_bytes()[ancestor.0.len()] == b'/'
    }

    /// Resolve this path under a local root directory
    #[must_use]
    pub fn to_local(&self, root: &Path) -> PathBuf {
        self.segments().fold(root.to_path_buf(), |acc, s| acc.join(s))
    }
}

impl Display for RelativePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RelativePath {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for RelativePath {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RelativePath> for String {
    fn from(path: RelativePath) -> Self {
        path.0
    }
}

impl AsRef<str> for RelativePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
