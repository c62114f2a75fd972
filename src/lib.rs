//! fs-workqueue - Resumable Work Queue over a Shared Filesystem
//!
//! Splits a large list of input paths into fixed-size work groups, keeps an
//! index of them in a workspace directory, and lets any number of workers on
//! any number of hosts pull groups, process them and mark them done. The
//! filesystem is the only coordination medium: no broker, no database.
//!
//! # Features
//!
//! - **Content-addressed groups**: A group's identity is the SHA-1 of its
//!   sorted paths, so the same set of inputs always maps to the same work.
//!
//! - **Incremental population**: Paths already in the index are never
//!   regrouped; repeated populate calls only append new groups.
//!
//! - **Resumable**: A group is done when its result artifact exists. Restart
//!   any worker at any time and it picks up what is left.
//!
//! - **Lease markers with staleness**: Workers claim a group by writing a
//!   marker file. Markers older than the lease timeout (30 minutes by
//!   default) are reclaimed, so crashed workers do not strand work.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                     Workspace (shared dir)                       │
//! │  work_index_list.csv.zstd    results/          worker_locks/     │
//! │  hash,path1,path2,...        output_<h>.jsonl  output_<h>.jsonl  │
//! └───────▲──────────────────────────▲─────────────────────▲─────────┘
//!         │ load/save                │ exists?             │ create/stat/delete
//!         │                          │                     │
//! ┌───────┴──────────┐     ┌─────────┴─────────┐   ┌───────┴─────────┐
//! │   IndexStore     │     │ CompletionTracker │   │  LeaseManager   │
//! │ (IndexCodec:zstd)│     └─────────┬─────────┘   └───────┬─────────┘
//! └───────┬──────────┘               │                     │
//!         │ plan_groups              │                     │
//!         ▼                          ▼                     ▼
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        LocalWorkQueue                            │
//! │  populate ─► initialize ─► Dispenser (shuffled FIFO) ─► fetch    │
//! │                                                       ◄─ release │
//! └─────────────────────────────────┬────────────────────────────────┘
//!                                   │
//!                                   ▼
//!                       ┌───────────────────────┐
//!                       │ QueueWorker           │
//!                       │ WorkProcessor writes  │
//!                       │ results/output_<h>    │
//!                       └───────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use fs_workqueue::queue::{LocalWorkQueue, WorkQueue};
//! use fs_workqueue::lease::DEFAULT_LEASE_TIMEOUT;
//!
//! # async fn example() -> fs_workqueue::Result<()> {
//! let queue = LocalWorkQueue::open("/shared/workspace")?;
//! queue
//!     .populate(vec!["/data/a.pdf".into(), "/data/b.pdf".into()], 100)
//!     .await?;
//!
//! queue.initialize().await?;
//! while let Some(item) = queue.fetch(DEFAULT_LEASE_TIMEOUT).await? {
//!     // ... process item.work_paths, write the result artifact ...
//!     queue.release(&item).await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod completion;
pub mod config;
pub mod error;
pub mod group;
pub mod index;
pub mod lease;
pub mod progress;
pub mod queue;
pub mod status;
pub mod worker;
pub mod workspace;

pub use config::{QueueConfig, WorkerConfig};
pub use error::{QueueError, Result};
pub use group::{compute_group_hash, WorkItem};
pub use queue::{LocalWorkQueue, PopulateSummary, QueueState, WorkQueue};
pub use worker::{QueueWorker, WorkProcessor};
pub use workspace::Workspace;
