//! Work item types

use serde::{Deserialize, Serialize};

/// A single unit of work handed to a worker
///
/// Created during grouping or rebuilt from the index on load. The record
/// stays in the index forever; a work item is "done" only through its
/// result artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkItem {
    /// Group identity (hex digest of the sorted paths)
    pub hash: String,
    /// Paths in this group
    pub work_paths: Vec<String>,
}

impl WorkItem {
    /// Create a work item from an identity and its paths
    pub fn new(hash: impl Into<String>, work_paths: Vec<String>) -> Self {
        Self {
            hash: hash.into(),
            work_paths,
        }
    }

    /// Get the group identity
    pub fn id(&self) -> &str {
        &self.hash
    }

    /// Number of paths in the group
    pub fn len(&self) -> usize {
        self.work_paths.len()
    }

    /// Check if the group has no paths
    pub fn is_empty(&self) -> bool {
        self.work_paths.is_empty()
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
