//! Directory sets compared by the reconciliation engine
//!
//! [`DirectorySnapshot`] is what the remote side looked like at one point in
//! time: the names of the directories directly under the remote root.
//! [`LocalDirectorySet`] is every directory under the local root, at any
//! depth. The two are deliberately asymmetric; only top-level remote names
//! are ever listed.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::newtypes::RelativePath;

/// Set of top-level remote directory names
///
/// Equality is set equality, so two snapshots taken at different times
/// compare equal when they contain the same names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DirectorySnapshot {
    names: BTreeSet<String>,
}

impl DirectorySnapshot {
    /// Creates an empty snapshot
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a directory name to the snapshot
    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        self.names.insert(name.into())
    }

    /// Returns true if `name` is a known remote directory
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Number of directories in the snapshot
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true if the snapshot holds no directories
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Iterates over the names in sorted order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for DirectorySnapshot {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Set of every directory under the local root, as relative paths
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalDirectorySet {
    paths: BTreeSet<RelativePath>,
}

impl LocalDirectorySet {
    /// Creates an empty set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a directory path
    pub fn insert(&mut self, path: RelativePath) -> bool {
        self.paths.insert(path)
    }

    /// Returns true if the path is present
    #[must_use]
    pub fn contains(&self, path: &RelativePath) -> bool {
        self.paths.contains(path)
    }

    /// Number of directories
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Returns true if no directories were found
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Iterates over the paths in sorted order (parents before children)
    pub fn iter(&self) -> impl Iterator<Item = &RelativePath> {
        self.paths.iter()
    }
}

impl FromIterator<RelativePath> for LocalDirectorySet {
    fn from_iter<I: IntoIterator<Item = RelativePath>>(iter: I) -> Self {
        Self {
            paths: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for LocalDirectorySet {
    type Item = RelativePath;
    type IntoIter = std::collections::btree_set::IntoIter<RelativePath>;

    fn into_iter(self) -> Self::IntoIter {
        self.paths.into_iter()
    }
}
