//! Completion tracking
//!
//! A group is done exactly when its artifact exists in the results
//! directory. The artifact is written by whatever processes the group;
//! this module only looks.

use std::collections::HashSet;
use std::fs;
use std::io::{self, ErrorKind};

use crate::workspace::{hash_from_artifact_name, Workspace};

/// Answers "is this identity done?" from the results directory
#[derive(Debug, Clone)]
pub struct CompletionTracker {
    workspace: Workspace,
}

impl CompletionTracker {
    /// Create a tracker for a workspace
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }

    /// Check a single identity
    pub fn is_done(&self, hash: &str) -> bool {
        self.workspace.result_path(hash).exists()
    }

    /// All completed identities, from one directory scan
    ///
    /// A missing results directory means nothing is done yet.
    pub fn completed_identities(&self) -> io::Result<HashSet<String>> {
        let entries = match fs::read_dir(self.workspace.results_dir()) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(HashSet::new()),
            Err(e) => return Err(e),
        };

        let mut done = HashSet::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            if let Some(hash) = name.to_str().and_then(hash_from_artifact_name) {
                done.insert(hash.to_string());
            }
        }
        Ok(done)
    }
}
