//! Workspace layout
//!
//! All coordination state lives under one root directory:
//!
//! ```text
//! <root>/
//!   work_index_list.csv.zstd     compressed index blob
//!   results/output_<hash>.jsonl  completion artifacts (written by processors)
//!   worker_locks/output_<hash>.jsonl  lease markers
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};

/// File name of the index blob
pub const INDEX_FILE_NAME: &str = "work_index_list.csv.zstd";

/// Directory holding completion artifacts
pub const RESULTS_DIR_NAME: &str = "results";

/// Directory holding lease markers
pub const LOCKS_DIR_NAME: &str = "worker_locks";

const ARTIFACT_PREFIX: &str = "output_";
const ARTIFACT_SUFFIX: &str = ".jsonl";

/// Resolved paths of a workspace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
    index_path: PathBuf,
    results_dir: PathBuf,
    locks_dir: PathBuf,
}

impl Workspace {
    /// Resolve the layout under `root` without touching the filesystem
    pub fn at(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            index_path: root.join(INDEX_FILE_NAME),
            results_dir: root.join(RESULTS_DIR_NAME),
            locks_dir: root.join(LOCKS_DIR_NAME),
            root,
        }
    }

    /// Resolve and create the workspace directories
    ///
    /// Relative roots are made absolute against the current directory.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let root = if root.is_absolute() {
            root.to_path_buf()
        } else {
            std::env::current_dir()?.join(root)
        };

        if root.exists() && !root.is_dir() {
            return Err(ConfigError::InvalidWorkspace {
                path: root,
                reason: "not a directory".into(),
            }
            .into());
        }

        let workspace = Self::at(root);
        fs::create_dir_all(&workspace.root)?;
        fs::create_dir_all(&workspace.results_dir)?;
        fs::create_dir_all(&workspace.locks_dir)?;
        Ok(workspace)
    }

    /// Workspace root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Index blob path
    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    /// Results directory
    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    /// Lease marker directory
    pub fn locks_dir(&self) -> &Path {
        &self.locks_dir
    }

    /// Path of the completion artifact for `hash`
    pub fn result_path(&self, hash: &str) -> PathBuf {
        self.results_dir.join(artifact_name(hash))
    }

    /// Path of the lease marker for `hash`
    pub fn lock_path(&self, hash: &str) -> PathBuf {
        self.locks_dir.join(artifact_name(hash))
    }
}

/// File name used for both artifacts and lease markers of `hash`
pub fn artifact_name(hash: &str) -> String {
    format!("{}{}{}", ARTIFACT_PREFIX, hash, ARTIFACT_SUFFIX)
}

/// Inverse of [`artifact_name`]
pub fn hash_from_artifact_name(name: &str) -> Option<&str> {
    name.strip_prefix(ARTIFACT_PREFIX)?
        .strip_suffix(ARTIFACT_SUFFIX)
        .filter(|hash| !hash.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_artifact_names() {
        assert_eq!(artifact_name("abc"), "output_abc.jsonl");
        assert_eq!(hash_from_artifact_name("output_abc.jsonl"), Some("abc"));
        assert_eq!(hash_from_artifact_name("output_.jsonl"), None);
        assert_eq!(hash_from_artifact_name("output_abc.json"), None);
        assert_eq!(hash_from_artifact_name("result_abc.jsonl"), None);
    }

    #[test]
    fn test_open_creates_layout() {
        let dir = tempdir().unwrap();
        let ws = Workspace::open(dir.path().join("ws")).unwrap();

        assert!(ws.results_dir().is_dir());
        assert!(ws.locks_dir().is_dir());
        assert!(!ws.index_path().exists());
        assert_eq!(ws.result_path("h"), ws.root().join("results/output_h.jsonl"));
        assert_eq!(ws.lock_path("h"), ws.root().join("worker_locks/output_h.jsonl"));

        // Reopening is harmless
        assert_eq!(Workspace::open(ws.root()).unwrap(), ws);
    }

    #[test]
    fn test_open_rejects_file_root() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("plain");
        std::fs::write(&file, b"x").unwrap();

        let err = Workspace::open(&file).unwrap_err();
        assert!(err.is_fatal_config());
    }
}
