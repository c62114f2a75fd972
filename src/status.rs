//! Read-only workspace inspection for monitoring

use crate::completion::CompletionTracker;
use crate::error::Result;
use crate::index::IndexStore;
use crate::lease::{ClaimMode, LeaseManager};
use crate::workspace::Workspace;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// A lease marker as seen by status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaseSummary {
    /// Group identity
    pub hash: String,
    /// Seconds since the marker was written
    pub age_secs: u64,
    /// Older than the staleness timeout
    pub is_stale: bool,
}

/// Workspace-wide status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceStatus {
    /// Workspace root
    pub root: PathBuf,
    /// Groups in the index
    pub groups: usize,
    /// Paths across all groups
    pub paths: usize,
    /// Compressed index size in bytes
    pub index_bytes: Option<u64>,
    /// Indexed groups with a result artifact
    pub completed: usize,
    /// Indexed groups without a result artifact
    pub remaining: usize,
    /// Artifacts whose identity is not in the index
    pub orphaned_results: usize,
    /// Lease markers within the timeout
    pub active_leases: usize,
    /// Lease markers past the timeout
    pub stale_leases: usize,
    /// All lease markers
    pub leases: Vec<LeaseSummary>,
    /// Overall state (idle, complete, active, stalled, pending)
    pub health: String,
    /// Timestamp of this status
    pub timestamp: DateTime<Utc>,
    /// Messages/warnings
    pub messages: Vec<String>,
}

impl WorkspaceStatus {
    /// Scan the workspace; blocking
    pub fn collect(
        workspace: &Workspace,
        store: &IndexStore,
        lease_timeout: Duration,
    ) -> Result<Self> {
        let index = store.load()?;
        let done = CompletionTracker::new(workspace.clone()).completed_identities()?;
        let markers = LeaseManager::new(workspace.clone(), ClaimMode::default()).list()?;

        let completed = index.hashes().filter(|h| done.contains(*h)).count();
        let remaining = index.len() - completed;
        let orphaned_results = done.len() - completed;

        let leases: Vec<LeaseSummary> = markers
            .into_iter()
            .map(|lease| LeaseSummary {
                age_secs: lease.age.as_secs(),
                is_stale: lease.age > lease_timeout,
                hash: lease.hash,
            })
            .collect();
        let stale_leases = leases.iter().filter(|l| l.is_stale).count();
        let active_leases = leases.len() - stale_leases;

        let health = determine_health(index.len(), remaining, active_leases, stale_leases);

        let mut messages = Vec::new();
        if stale_leases > 0 {
            messages.push(format!(
                "{} leases are older than {}s and will be reclaimed by the next worker to reach them",
                stale_leases,
                lease_timeout.as_secs()
            ));
        }
        if orphaned_results > 0 {
            messages.push(format!(
                "{} result artifacts do not match any indexed group",
                orphaned_results
            ));
        }
        if remaining > 0 && active_leases == 0 {
            messages.push(
                "Groups are pending but no worker holds a live lease - start workers to process them"
                    .to_string(),
            );
        }

        Ok(Self {
            root: workspace.root().to_path_buf(),
            groups: index.len(),
            paths: index.path_count(),
            index_bytes: store.size_on_disk(),
            completed,
            remaining,
            orphaned_results,
            active_leases,
            stale_leases,
            leases,
            health,
            timestamp: Utc::now(),
            messages,
        })
    }

    /// Scan the workspace on the blocking pool
    pub async fn gather(
        workspace: Workspace,
        store: IndexStore,
        lease_timeout: Duration,
    ) -> Result<Self> {
        tokio::task::spawn_blocking(move || Self::collect(&workspace, &store, lease_timeout))
            .await?
    }

    /// Completed share of indexed groups, 0.0 to 100.0
    pub fn percent_complete(&self) -> f64 {
        if self.groups == 0 {
            return 0.0;
        }
        self.completed as f64 * 100.0 / self.groups as f64
    }
}

fn determine_health(groups: usize, remaining: usize, active: usize, stale: usize) -> String {
    if groups == 0 {
        return "idle".to_string();
    }

    if remaining == 0 {
        return "complete".to_string();
    }

    if active > 0 {
        return "active".to_string();
    }

    if stale > 0 {
        return "stalled".to_string();
    }

    "pending".to_string()
}
