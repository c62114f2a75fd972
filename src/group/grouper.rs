//! Group planning for newly discovered paths
//!
//! Given the current index and the full path universe of a run, decides
//! which paths are new and how they are chunked. Only paths that no existing
//! group contains are grouped, so a path is grouped at most once for the
//! lifetime of a workspace regardless of later group sizes.

use std::collections::{BTreeSet, HashSet};

use crate::error::ConfigError;
use crate::index::WorkIndex;

use super::hasher::compute_group_hash;

/// A newly planned group, not yet persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedGroup {
    /// Identity of the group
    pub hash: String,
    /// Sorted paths in the group
    pub paths: Vec<String>,
}

/// Result of planning a populate call
#[derive(Debug, Clone, Default)]
pub struct GroupPlan {
    /// Distinct paths in the input
    pub total_paths: usize,
    /// Input paths not present in any existing group
    pub new_paths: usize,
    /// Groups to append to the index
    pub groups: Vec<PlannedGroup>,
}

impl GroupPlan {
    /// True when nothing needs to be written
    pub fn is_noop(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Plan new groups for `paths` against `index`
///
/// New paths are sorted and split into consecutive chunks of `group_size`;
/// the last chunk may be shorter.
pub fn plan_groups<I, S>(
    index: &WorkIndex,
    paths: I,
    group_size: usize,
) -> Result<GroupPlan, ConfigError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    if group_size == 0 {
        return Err(ConfigError::InvalidGroupSize(group_size));
    }

    let all_paths: BTreeSet<String> = paths.into_iter().map(Into::into).collect();
    let indexed: HashSet<&str> = index.indexed_paths();

    let new_paths: Vec<String> = all_paths
        .iter()
        .filter(|p| !indexed.contains(p.as_str()))
        .cloned()
        .collect();

    for path in &new_paths {
        validate_path(path)?;
    }

    // BTreeSet iteration already yields byte-order sorted paths
    let groups = new_paths
        .chunks(group_size)
        .map(|chunk| PlannedGroup {
            hash: compute_group_hash(chunk),
            paths: chunk.to_vec(),
        })
        .collect();

    Ok(GroupPlan {
        total_paths: all_paths.len(),
        new_paths: new_paths.len(),
        groups,
    })
}

/// Reject paths that cannot round-trip through the index line format
fn validate_path(path: &str) -> Result<(), ConfigError> {
    let reason = if path.is_empty() {
        "empty path"
    } else if path.contains(',') {
        "paths containing ',' cannot be stored in the index"
    } else if path.contains('\n') || path.contains('\r') {
        "paths containing line breaks cannot be stored in the index"
    } else {
        return Ok(());
    };

    Err(ConfigError::UnsupportedPath {
        path: path.to_string(),
        reason: reason.to_string(),
    })
}
