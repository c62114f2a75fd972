//! Work queue over a shared filesystem workspace
//!
//! Every process that points a `LocalWorkQueue` at the same root sees the
//! same index, completion artifacts and lease markers. Nothing else is
//! shared: each instance keeps its own shuffled dispenser.

use rand::seq::SliceRandom;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinError;
use tracing::{debug, info, info_span, warn, Instrument, Span};

use super::dispenser::{Dispenser, DispenserStats};
use super::{PopulateSummary, QueueState, WorkQueue};
use crate::completion::CompletionTracker;
use crate::config::QueueConfig;
use crate::error::Result;
use crate::group::{plan_groups, WorkItem};
use crate::index::{IndexCodec, IndexStore};
use crate::lease::{ClaimOutcome, LeaseManager};
use crate::workspace::Workspace;

/// Filesystem-backed work queue
pub struct LocalWorkQueue {
    workspace: Workspace,
    store: IndexStore,
    completion: Arc<CompletionTracker>,
    leases: Arc<LeaseManager>,
    dispenser: Dispenser,
    initialized: AtomicBool,
    lease_timeout: Duration,
    span: Span,
}

impl LocalWorkQueue {
    /// Open a queue with default settings, creating the workspace directories
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        Self::with_config(&QueueConfig::new(root.as_ref()))
    }

    /// Open a queue from a configuration
    pub fn with_config(config: &QueueConfig) -> Result<Self> {
        let workspace = Workspace::open(&config.workspace)?;
        let store = IndexStore::new(workspace.index_path()).codec(codec_for(config));
        let span = info_span!("work_queue", workspace = %workspace.root().display());

        Ok(Self {
            store,
            completion: Arc::new(CompletionTracker::new(workspace.clone())),
            leases: Arc::new(LeaseManager::new(workspace.clone(), config.claim_mode)),
            dispenser: Dispenser::new(),
            initialized: AtomicBool::new(false),
            lease_timeout: config.lease_timeout,
            span,
            workspace,
        })
    }

    /// Run all operations inside `span` instead of the default one
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Replace the index codec (`None` makes index access fail)
    pub fn with_codec(mut self, codec: Option<Arc<dyn IndexCodec>>) -> Self {
        self.store = self.store.codec(codec);
        self
    }

    /// Workspace layout
    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Index store backing this queue
    pub fn index_store(&self) -> &IndexStore {
        &self.store
    }

    /// Leases handed out by this instance and not yet released
    pub fn outstanding(&self) -> usize {
        self.dispenser.outstanding()
    }

    /// Dispenser counters since the last initialize
    pub fn stats(&self) -> &DispenserStats {
        self.dispenser.stats()
    }

    fn populate_blocking(
        store: &IndexStore,
        paths: Vec<String>,
        group_size: usize,
    ) -> Result<PopulateSummary> {
        let mut index = store.load()?;
        let plan = plan_groups(&index, paths, group_size)?;

        info!("Found {} total paths", plan.total_paths);
        info!("{} new paths to add to the workspace", plan.new_paths);

        let mut summary = PopulateSummary {
            total_paths: plan.total_paths,
            new_paths: plan.new_paths,
            ..Default::default()
        };
        if plan.is_noop() {
            return Ok(summary);
        }

        for group in plan.groups {
            if index.insert_new(group.hash.clone(), group.paths) {
                summary.new_groups += 1;
            } else {
                warn!(hash = %group.hash, "Identity already in the index, keeping existing entry");
                summary.collisions += 1;
            }
        }

        if summary.new_groups > 0 {
            store.save(&index)?;
        }
        info!(
            "Added {} new work groups ({} in index)",
            summary.new_groups,
            index.len()
        );
        Ok(summary)
    }

    fn initialize_blocking(
        store: &IndexStore,
        completion: &CompletionTracker,
    ) -> Result<Vec<WorkItem>> {
        let index = store.load()?;
        let done = completion.completed_identities()?;

        let mut items: Vec<WorkItem> = index
            .iter()
            .filter(|(hash, _)| !done.contains(*hash))
            .map(|(hash, paths)| WorkItem::new(hash, paths.to_vec()))
            .collect();
        items.shuffle(&mut rand::thread_rng());

        debug!(
            indexed = index.len(),
            completed = done.len(),
            "Loaded index and completed set"
        );
        Ok(items)
    }
}

/// Codec for the configured compression level
fn codec_for(config: &QueueConfig) -> Option<Arc<dyn IndexCodec>> {
    #[cfg(feature = "zstd")]
    {
        Some(Arc::new(crate::index::ZstdCodec::with_level(
            config.compression_level,
        )))
    }
    #[cfg(not(feature = "zstd"))]
    {
        let _ = config;
        crate::index::default_codec()
    }
}

impl LocalWorkQueue {
    async fn initialize_in_span(&self) -> Result<usize> {
        let store = self.store.clone();
        let completion = Arc::clone(&self.completion);
        let span = Span::current();
        let items = tokio::task::spawn_blocking(move || {
            let _guard = span.enter();
            Self::initialize_blocking(&store, &completion)
        })
        .await??;

        let count = self.dispenser.refill(items);
        self.initialized.store(true, Ordering::SeqCst);
        info!("Initialized local queue with {} work items", count);
        Ok(count)
    }

    async fn fetch_in_span(&self, lease_timeout: Duration) -> Result<Option<WorkItem>> {
        loop {
            let Some(item) = self.dispenser.try_take() else {
                debug!("No more items in the queue");
                return Ok(None);
            };

            let completion = Arc::clone(&self.completion);
            let leases = Arc::clone(&self.leases);
            let hash = item.hash.clone();
            let checked = tokio::task::spawn_blocking(move || {
                if completion.is_done(&hash) {
                    None
                } else {
                    Some(leases.try_claim(&hash, lease_timeout))
                }
            })
            .await;
            let outcome = self.settle_check(&item, checked)?;

            match outcome {
                None => {
                    debug!(hash = %item.hash, "Work item already completed, skipping");
                }
                Some(ClaimOutcome::Acquired) => {
                    self.dispenser.record_dispensed();
                    return Ok(Some(item));
                }
                Some(ClaimOutcome::Reclaimed { previous_age }) => {
                    debug!(
                        hash = %item.hash,
                        age_secs = previous_age.as_secs(),
                        "Found stale lock, taking work item"
                    );
                    self.dispenser.record_dispensed();
                    return Ok(Some(item));
                }
                Some(ClaimOutcome::Held { age }) => {
                    debug!(
                        hash = %item.hash,
                        age_secs = age.as_secs(),
                        "Work item locked by another worker, skipping"
                    );
                }
                Some(ClaimOutcome::Lost) => {
                    debug!(hash = %item.hash, "Lost lease race, skipping");
                }
                Some(ClaimOutcome::Failed(e)) => {
                    warn!(hash = %item.hash, "Failed to create lock file: {}", e);
                }
            }
            self.dispenser.record_skip();
        }
    }

    /// Unwrap a lease check whose blocking task may have died
    ///
    /// The item has already left the dispenser, so a failed check counts as
    /// a skip for this generation.
    fn settle_check(
        &self,
        item: &WorkItem,
        checked: std::result::Result<Option<ClaimOutcome>, JoinError>,
    ) -> Result<Option<ClaimOutcome>> {
        checked.map_err(|e| {
            warn!(hash = %item.hash, "Lease check did not complete: {}", e);
            self.dispenser.record_skip();
            e.into()
        })
    }

    async fn release_in_span(&self, item: &WorkItem) -> Result<()> {
        let leases = Arc::clone(&self.leases);
        let hash = item.hash.clone();
        match tokio::task::spawn_blocking(move || leases.release(&hash)).await? {
            Ok(true) => debug!(hash = %item.hash, "Released lease"),
            Ok(false) => debug!(hash = %item.hash, "No lease marker to release"),
            Err(e) => warn!(hash = %item.hash, "Failed to delete lock file: {}", e),
        }
        self.dispenser.record_release();
        Ok(())
    }
}

#[async_trait::async_trait]
impl WorkQueue for LocalWorkQueue {
    async fn populate(&self, paths: Vec<String>, group_size: usize) -> Result<PopulateSummary> {
        let store = self.store.clone();
        let span = self.span.clone();
        tokio::task::spawn_blocking(move || {
            let _guard = span.enter();
            Self::populate_blocking(&store, paths, group_size)
        })
        .await?
    }

    async fn initialize(&self) -> Result<usize> {
        self.initialize_in_span()
            .instrument(self.span.clone())
            .await
    }

    async fn is_completed(&self, hash: &str) -> Result<bool> {
        let completion = Arc::clone(&self.completion);
        let hash = hash.to_string();
        Ok(tokio::task::spawn_blocking(move || completion.is_done(&hash)).await?)
    }

    async fn fetch(&self, lease_timeout: Duration) -> Result<Option<WorkItem>> {
        self.fetch_in_span(lease_timeout)
            .instrument(self.span.clone())
            .await
    }

    async fn release(&self, item: &WorkItem) -> Result<()> {
        self.release_in_span(item)
            .instrument(self.span.clone())
            .await
    }

    fn lease_timeout(&self) -> Duration {
        self.lease_timeout
    }

    fn size(&self) -> usize {
        self.dispenser.len()
    }

    fn state(&self) -> QueueState {
        if !self.initialized.load(Ordering::SeqCst) {
            QueueState::Uninitialized
        } else if !self.dispenser.is_empty() {
            QueueState::Ready
        } else if self.dispenser.outstanding() > 0 {
            QueueState::Draining
        } else {
            QueueState::Empty
        }
    }
}
