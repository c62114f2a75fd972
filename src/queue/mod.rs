//! Work queue contract and the local filesystem backend
//!
//! The [`WorkQueue`] trait is the whole public contract: populate the index,
//! initialize the in-memory queue, fetch work under a lease, release it.
//! [`LocalWorkQueue`] implements it over a shared directory; other backends
//! share only the identity hash with it.

mod dispenser;
mod local;

pub use dispenser::{Dispenser, DispenserStats};
pub use local::LocalWorkQueue;

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::Result;
use crate::group::WorkItem;
use crate::lease::DEFAULT_LEASE_TIMEOUT;

/// Lifecycle of a queue instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueState {
    /// `initialize` has not run yet
    Uninitialized,
    /// Items are waiting to be fetched
    Ready,
    /// No items left, but leases handed out by this instance are unreleased
    Draining,
    /// Nothing left and nothing outstanding
    Empty,
}

impl std::fmt::Display for QueueState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueState::Uninitialized => write!(f, "uninitialized"),
            QueueState::Ready => write!(f, "ready"),
            QueueState::Draining => write!(f, "draining"),
            QueueState::Empty => write!(f, "empty"),
        }
    }
}

/// Outcome of a populate call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulateSummary {
    /// Distinct paths supplied
    pub total_paths: usize,
    /// Paths not already in the index
    pub new_paths: usize,
    /// Groups appended to the index
    pub new_groups: usize,
    /// Planned groups dropped because their identity was already taken
    pub collisions: usize,
}

/// Trait for work queue backends
#[async_trait::async_trait]
pub trait WorkQueue: Send + Sync {
    /// Group paths not yet in the index and persist the merged index
    ///
    /// Idempotent: paths already indexed are never regrouped.
    async fn populate(&self, paths: Vec<String>, group_size: usize) -> Result<PopulateSummary>;

    /// Rebuild the in-memory queue from the index minus completed work
    ///
    /// Returns the number of queued items.
    async fn initialize(&self) -> Result<usize>;

    /// Check if a group's result artifact exists
    async fn is_completed(&self, hash: &str) -> Result<bool>;

    /// Take the next item that is neither completed nor actively leased
    ///
    /// Leases older than `lease_timeout` are treated as abandoned. Returns
    /// `Ok(None)` when this instance has nothing left to hand out.
    async fn fetch(&self, lease_timeout: Duration) -> Result<Option<WorkItem>>;

    /// Drop the lease on an item after processing
    async fn release(&self, item: &WorkItem) -> Result<()>;

    /// Staleness window this queue was configured with
    ///
    /// Drivers pass it to [`fetch`](WorkQueue::fetch).
    fn lease_timeout(&self) -> Duration {
        DEFAULT_LEASE_TIMEOUT
    }

    /// Items waiting in the in-memory queue
    fn size(&self) -> usize;

    /// Current lifecycle state
    fn state(&self) -> QueueState;
}

// Re-export async_trait for implementors
pub use async_trait::async_trait;
