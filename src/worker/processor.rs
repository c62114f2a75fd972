//! Queue worker driver
//!
//! Pulls items from any [`WorkQueue`], hands them to a caller-supplied
//! [`WorkProcessor`] and releases the lease afterwards. Writing the result
//! artifact is the processor's job; the driver never marks work done.

use crate::config::WorkerConfig;
use crate::error::{QueueError, Result, WorkerError};
use crate::group::WorkItem;
use crate::queue::{QueueState, WorkQueue};

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Error type returned by processors
pub type ProcessError = Box<dyn std::error::Error + Send + Sync>;

/// Processes one work item
///
/// A successful call is expected to have written the item's result
/// artifact; otherwise the group will be handed out again later.
#[async_trait::async_trait]
pub trait WorkProcessor: Send + Sync {
    async fn process(&self, item: &WorkItem) -> std::result::Result<(), ProcessError>;
}

/// Progress information during worker operation
#[derive(Debug, Clone, Default)]
pub struct WorkerProgress {
    /// Items processed successfully
    pub items_processed: u64,
    /// Items the processor failed on
    pub items_failed: u64,
    /// Paths in successfully processed items
    pub paths_processed: u64,
    /// Errors encountered
    pub errors: u64,
    /// Items still waiting in this instance's queue
    pub queue_size: usize,
    /// Elapsed time
    pub elapsed: Duration,
}

/// Final statistics from worker
#[derive(Debug, Clone, Default)]
pub struct WorkerStats {
    /// Total items processed
    pub items_processed: u64,
    /// Total items failed
    pub items_failed: u64,
    /// Total paths processed
    pub paths_processed: u64,
    /// Total errors
    pub errors: u64,
    /// Total duration
    pub duration: Duration,
}

#[derive(Debug, Default)]
struct Counters {
    items_processed: AtomicU64,
    items_failed: AtomicU64,
    paths_processed: AtomicU64,
    errors: AtomicU64,
    /// Items reserved against `max_items`
    claimed: AtomicU64,
}

impl Counters {
    fn reserve(&self, max: Option<u64>) -> bool {
        let max = max.unwrap_or(u64::MAX);
        self.claimed
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < max).then_some(n + 1)
            })
            .is_ok()
    }

    fn unreserve(&self) {
        self.claimed.fetch_sub(1, Ordering::SeqCst);
    }

    fn progress(&self, queue_size: usize, elapsed: Duration) -> WorkerProgress {
        WorkerProgress {
            items_processed: self.items_processed.load(Ordering::Relaxed),
            items_failed: self.items_failed.load(Ordering::Relaxed),
            paths_processed: self.paths_processed.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            queue_size,
            elapsed,
        }
    }
}

/// Drives a processor over a work queue with several concurrent tasks
pub struct QueueWorker<Q> {
    queue: Arc<Q>,
    processor: Arc<dyn WorkProcessor>,
    config: WorkerConfig,
    shutdown: Arc<AtomicBool>,
}

impl<Q: WorkQueue + 'static> QueueWorker<Q> {
    /// Create a new queue worker
    pub fn new(queue: Arc<Q>, processor: Arc<dyn WorkProcessor>, config: WorkerConfig) -> Self {
        Self {
            queue,
            processor,
            config,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Signal shutdown; in-flight items finish first
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Flag that stops the worker when set, for signal handlers
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Run until the queue is drained, `max_items` is reached or shutdown
    ///
    /// The queue is initialized first if nobody has done so yet.
    pub async fn run<F>(&self, progress_callback: F) -> Result<WorkerStats>
    where
        F: Fn(WorkerProgress) + Send + Sync + 'static,
    {
        let start = Instant::now();

        if self.queue.state() == QueueState::Uninitialized {
            self.queue.initialize().await?;
        }

        let counters = Arc::new(Counters::default());
        let finished = Arc::new(AtomicBool::new(false));
        let callback = Arc::new(progress_callback);

        // Spawn progress reporter
        let progress_handle = if self.config.show_progress {
            let counters = Arc::clone(&counters);
            let finished = Arc::clone(&finished);
            let queue = Arc::clone(&self.queue);
            let callback = Arc::clone(&callback);

            Some(tokio::spawn(async move {
                while !finished.load(Ordering::Relaxed) {
                    callback(counters.progress(queue.size(), start.elapsed()));
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
            }))
        } else {
            None
        };

        let stop = Arc::new(AtomicBool::new(false));
        let reinit = Arc::new(Mutex::new(()));
        let mut handles = Vec::with_capacity(self.config.concurrency);
        for slot in 0..self.config.concurrency {
            let task = WorkerTask {
                id: format!("{}/{}", self.config.worker_id, slot),
                queue: Arc::clone(&self.queue),
                processor: Arc::clone(&self.processor),
                config: self.config.clone(),
                counters: Arc::clone(&counters),
                shutdown: Arc::clone(&self.shutdown),
                stop: Arc::clone(&stop),
                reinit: Arc::clone(&reinit),
            };
            let id = task.id.clone();
            handles.push((id, tokio::spawn(task.run())));
        }

        let mut first_error: Option<QueueError> = None;
        for (id, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => Err(WorkerError::Panicked {
                    id,
                    message: e.to_string(),
                }
                .into()),
            };
            if let Err(e) = outcome {
                tracing::error!("Worker task failed: {}", e);
                first_error.get_or_insert(e);
            }
        }

        finished.store(true, Ordering::SeqCst);
        if let Some(handle) = progress_handle {
            // Last report carries the final counts
            let _ = handle.await;
            callback(counters.progress(self.queue.size(), start.elapsed()));
        }

        if let Some(e) = first_error {
            return Err(e);
        }

        let stats = WorkerStats {
            items_processed: counters.items_processed.load(Ordering::Relaxed),
            items_failed: counters.items_failed.load(Ordering::Relaxed),
            paths_processed: counters.paths_processed.load(Ordering::Relaxed),
            errors: counters.errors.load(Ordering::Relaxed),
            duration: start.elapsed(),
        };
        tracing::info!(
            worker = %self.config.worker_id,
            "Worker finished: {} processed, {} failed in {:.1}s",
            stats.items_processed,
            stats.items_failed,
            stats.duration.as_secs_f64()
        );
        Ok(stats)
    }
}

/// One concurrent fetch/process/release loop
struct WorkerTask<Q> {
    id: String,
    queue: Arc<Q>,
    processor: Arc<dyn WorkProcessor>,
    config: WorkerConfig,
    counters: Arc<Counters>,
    shutdown: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
    reinit: Arc<Mutex<()>>,
}

impl<Q: WorkQueue> WorkerTask<Q> {
    fn stopping(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed) || self.stop.load(Ordering::Relaxed)
    }

    async fn run(self) -> Result<()> {
        loop {
            if self.stopping() {
                break;
            }

            if !self.counters.reserve(self.config.max_items) {
                break;
            }

            match self.queue.fetch(self.queue.lease_timeout()).await {
                Ok(Some(item)) => self.handle(item).await,
                Ok(None) => {
                    self.counters.unreserve();
                    if !self.config.continuous {
                        tracing::debug!(task = %self.id, "Queue is empty, exiting");
                        break;
                    }
                    self.wait_for_work().await;
                }
                Err(e) => {
                    self.counters.unreserve();
                    self.counters.errors.fetch_add(1, Ordering::Relaxed);
                    if e.is_fatal_config() {
                        self.stop.store(true, Ordering::SeqCst);
                        return Err(e);
                    }
                    tracing::error!(task = %self.id, "Failed to fetch work item: {}", e);
                    self.sleep(Duration::from_secs(1)).await;
                }
            }
        }
        Ok(())
    }

    async fn handle(&self, item: WorkItem) {
        tracing::info!(
            task = %self.id,
            "Processing work item {} ({} paths)",
            item.id(),
            item.len()
        );

        match self.processor.process(&item).await {
            Ok(()) => {
                self.counters.items_processed.fetch_add(1, Ordering::Relaxed);
                self.counters
                    .paths_processed
                    .fetch_add(item.len() as u64, Ordering::Relaxed);
            }
            Err(e) => {
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
                self.counters.items_failed.fetch_add(1, Ordering::Relaxed);
                let err = WorkerError::ProcessingFailed {
                    id: self.id.clone(),
                    hash: item.hash.clone(),
                    reason: e.to_string(),
                };
                tracing::error!("{}", err);
            }
        }

        // Without an artifact the group is picked up again by a later initialize
        if let Err(e) = self.queue.release(&item).await {
            self.counters.errors.fetch_add(1, Ordering::Relaxed);
            tracing::error!(task = %self.id, "Failed to release {}: {}", item.id(), e);
        }
    }

    /// Continuous mode: sleep, then rebuild the queue once nothing is in flight
    async fn wait_for_work(&self) {
        self.sleep(self.config.poll_interval).await;
        if self.stopping() {
            return;
        }

        let Ok(_guard) = self.reinit.try_lock() else {
            return;
        };
        if self.queue.state() != QueueState::Empty {
            return;
        }
        match self.queue.initialize().await {
            Ok(count) => tracing::debug!(task = %self.id, "Re-initialized with {} items", count),
            Err(e) => {
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(task = %self.id, "Failed to re-initialize queue: {}", e);
            }
        }
    }

    /// Sleep in short steps so shutdown is noticed promptly
    async fn sleep(&self, total: Duration) {
        let step = Duration::from_millis(100);
        let deadline = Instant::now() + total;
        while !self.stopping() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            tokio::time::sleep(step.min(deadline - now)).await;
        }
    }
}
