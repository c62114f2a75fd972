//! In-memory form of the work index

use std::collections::{BTreeMap, HashSet};

use crate::group::WorkItem;

/// Mapping from group identity to the paths in that group
///
/// Ordered by identity so that a saved index is byte-for-byte reproducible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkIndex {
    groups: BTreeMap<String, Vec<String>>,
}

impl WorkIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of groups
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Check if the index has no groups
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total number of paths across all groups
    pub fn path_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    /// Check if an identity is present
    pub fn contains(&self, hash: &str) -> bool {
        self.groups.contains_key(hash)
    }

    /// Paths of a group
    pub fn get(&self, hash: &str) -> Option<&[String]> {
        self.groups.get(hash).map(Vec::as_slice)
    }

    /// Union of every path in every group
    pub fn indexed_paths(&self) -> HashSet<&str> {
        self.groups
            .values()
            .flat_map(|paths| paths.iter().map(String::as_str))
            .collect()
    }

    /// Add a group unless the identity is already present
    ///
    /// Existing entries are never rewritten. Returns `false` when the
    /// identity was already taken.
    pub fn insert_new(&mut self, hash: String, paths: Vec<String>) -> bool {
        match self.groups.entry(hash) {
            std::collections::btree_map::Entry::Occupied(_) => false,
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(paths);
                true
            }
        }
    }

    /// Iterate over `(identity, paths)` in identity order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.groups
            .iter()
            .map(|(hash, paths)| (hash.as_str(), paths.as_slice()))
    }

    /// Iterate over identities
    pub fn hashes(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Build a work item for one identity
    pub fn work_item(&self, hash: &str) -> Option<WorkItem> {
        self.groups
            .get_key_value(hash)
            .map(|(hash, paths)| WorkItem::new(hash.clone(), paths.clone()))
    }
}

impl FromIterator<(String, Vec<String>)> for WorkIndex {
    /// Later duplicates of an identity replace earlier ones, as a full
    /// rewrite of the blob would have.
    fn from_iter<T: IntoIterator<Item = (String, Vec<String>)>>(iter: T) -> Self {
        Self {
            groups: iter.into_iter().collect(),
        }
    }
}
