//! Integration tests for fs-workqueue
//!
//! Every test runs against a throwaway workspace in a temp directory.

use filetime::{set_file_mtime, FileTime};
use fs_workqueue::config::QueueConfig;
use fs_workqueue::group::compute_group_hash;
use fs_workqueue::index::IndexStore;
use fs_workqueue::lease::ClaimMode;
use fs_workqueue::queue::{LocalWorkQueue, QueueState, WorkQueue};
use fs_workqueue::status::WorkspaceStatus;
use fs_workqueue::worker::{ProcessError, QueueWorker, WorkProcessor};
use fs_workqueue::{WorkItem, WorkerConfig, Workspace};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tempfile::tempdir;

const TIMEOUT: Duration = Duration::from_secs(1800);

fn paths(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn age_lock(ws: &Workspace, hash: &str, secs: u64) {
    let then = SystemTime::now() - Duration::from_secs(secs);
    set_file_mtime(ws.lock_path(hash), FileTime::from_system_time(then)).unwrap();
}

/// Writes one JSON line per group, the way a real pipeline would
struct JsonlWriter {
    workspace: Workspace,
}

#[async_trait::async_trait]
impl WorkProcessor for JsonlWriter {
    async fn process(&self, item: &WorkItem) -> Result<(), ProcessError> {
        let line = format!("{}\n", item.to_json()?);
        tokio::fs::write(self.workspace.result_path(&item.hash), line).await?;
        Ok(())
    }
}

#[tokio::test]
async fn test_example_scenario() {
    let dir = tempdir().unwrap();
    let queue = LocalWorkQueue::open(dir.path()).unwrap();

    let summary = queue
        .populate(paths(&["a", "b", "c", "d", "e"]), 2)
        .await
        .unwrap();
    assert_eq!(summary.new_groups, 3);

    // The persisted index holds exactly {a,b}, {c,d}, {e}
    let index = IndexStore::new(queue.workspace().index_path()).load().unwrap();
    let groups: HashSet<Vec<String>> = index.iter().map(|(_, p)| p.to_vec()).collect();
    let expected: HashSet<Vec<String>> = [paths(&["a", "b"]), paths(&["c", "d"]), paths(&["e"])]
        .into_iter()
        .collect();
    assert_eq!(groups, expected);

    assert_eq!(queue.initialize().await.unwrap(), 3);

    // One group finished elsewhere
    let ab = compute_group_hash(&["a", "b"]);
    std::fs::write(queue.workspace().result_path(&ab), b"{}\n").unwrap();
    assert_eq!(queue.initialize().await.unwrap(), 2);
}

#[tokio::test]
async fn test_dedup_across_group_size_changes() {
    let dir = tempdir().unwrap();
    let queue = LocalWorkQueue::open(dir.path()).unwrap();

    queue.populate(paths(&["a", "b", "c", "d"]), 2).await.unwrap();
    let summary = queue
        .populate(paths(&["a", "b", "c", "d", "e", "f", "g"]), 3)
        .await
        .unwrap();

    assert_eq!(summary.total_paths, 7);
    assert_eq!(summary.new_paths, 3);
    assert_eq!(summary.new_groups, 1);

    // Every path appears in exactly one group
    let index = IndexStore::new(queue.workspace().index_path()).load().unwrap();
    let mut seen = HashSet::new();
    for (_, group) in index.iter() {
        for path in group {
            assert!(seen.insert(path.clone()), "{} indexed twice", path);
        }
    }
    assert_eq!(seen.len(), 7);
}

#[tokio::test]
async fn test_crashed_worker_lease_is_reclaimed() {
    let dir = tempdir().unwrap();
    let crashed = LocalWorkQueue::open(dir.path()).unwrap();
    crashed.populate(paths(&["a"]), 1).await.unwrap();
    crashed.initialize().await.unwrap();

    // Worker takes the item and dies without releasing
    let item = crashed.fetch(TIMEOUT).await.unwrap().unwrap();
    drop(crashed);

    let survivor = LocalWorkQueue::open(dir.path()).unwrap();
    survivor.initialize().await.unwrap();
    assert!(survivor.fetch(TIMEOUT).await.unwrap().is_none());

    age_lock(survivor.workspace(), &item.hash, 2 * TIMEOUT.as_secs());
    survivor.initialize().await.unwrap();
    let reclaimed = survivor.fetch(TIMEOUT).await.unwrap().unwrap();
    assert_eq!(reclaimed, item);
}

#[tokio::test]
async fn test_short_lease_timeout() {
    let dir = tempdir().unwrap();
    let queue = LocalWorkQueue::open(dir.path()).unwrap();
    queue.populate(paths(&["a"]), 1).await.unwrap();
    let hash = compute_group_hash(&["a"]);

    std::fs::write(queue.workspace().lock_path(&hash), b"").unwrap();
    age_lock(queue.workspace(), &hash, 120);

    queue.initialize().await.unwrap();
    assert!(queue.fetch(Duration::from_secs(300)).await.unwrap().is_none());

    queue.initialize().await.unwrap();
    assert!(queue.fetch(Duration::from_secs(60)).await.unwrap().is_some());
}

#[tokio::test]
async fn test_exclusive_mode_queue() {
    let dir = tempdir().unwrap();
    let config = QueueConfig::new(dir.path()).with_claim_mode(ClaimMode::Exclusive);
    let first = LocalWorkQueue::with_config(&config).unwrap();
    let second = LocalWorkQueue::with_config(&config).unwrap();

    first.populate(paths(&["a", "b"]), 1).await.unwrap();
    first.initialize().await.unwrap();
    second.initialize().await.unwrap();

    let a = first.fetch(TIMEOUT).await.unwrap().unwrap();
    let b = second.fetch(TIMEOUT).await.unwrap().unwrap();
    assert_ne!(a.hash, b.hash);
    assert!(first.fetch(TIMEOUT).await.unwrap().is_none());
    assert!(second.fetch(TIMEOUT).await.unwrap().is_none());
}

#[tokio::test]
async fn test_size_accounting() {
    let dir = tempdir().unwrap();
    let queue = LocalWorkQueue::open(dir.path()).unwrap();
    queue
        .populate(paths(&["a", "b", "c", "d"]), 1)
        .await
        .unwrap();
    assert_eq!(queue.initialize().await.unwrap(), 4);

    // Leased elsewhere: this one gets skipped
    let held = compute_group_hash(&["b"]);
    std::fs::write(queue.workspace().lock_path(&held), b"").unwrap();

    let mut fetched = Vec::new();
    let mut previous = queue.size();
    while let Some(item) = queue.fetch(TIMEOUT).await.unwrap() {
        assert!(queue.size() < previous);
        previous = queue.size();
        fetched.push(item);
    }
    assert_eq!(fetched.len(), 3);
    assert_eq!(queue.size(), 0);
    assert_eq!(queue.state(), QueueState::Draining);

    for item in &fetched {
        queue.release(item).await.unwrap();
    }
    assert_eq!(queue.state(), QueueState::Empty);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_two_workers_share_a_workspace() {
    let dir = tempdir().unwrap();
    let all: Vec<String> = (0..40).map(|i| format!("/data/doc-{:02}.pdf", i)).collect();

    let setup = LocalWorkQueue::open(dir.path()).unwrap();
    setup.populate(all, 3).await.unwrap();
    let groups = IndexStore::new(setup.workspace().index_path())
        .load()
        .unwrap()
        .len();
    assert_eq!(groups, 14);

    let mut runs = Vec::new();
    for name in ["host-a", "host-b"] {
        let queue = Arc::new(LocalWorkQueue::open(dir.path()).unwrap());
        let processor = Arc::new(JsonlWriter {
            workspace: queue.workspace().clone(),
        });
        let config = WorkerConfig::new(Some(name), 2).unwrap();
        runs.push(tokio::spawn(async move {
            QueueWorker::new(queue, processor, config).run(|_| {}).await
        }));
    }

    let mut processed = 0;
    for run in runs {
        processed += run.await.unwrap().unwrap().items_processed;
    }
    // Check-then-create may let both hosts run a group; never fewer than all
    assert!(processed >= groups as u64);

    let ws = Workspace::at(dir.path());
    let status = WorkspaceStatus::collect(
        &ws,
        &IndexStore::new(ws.index_path()),
        TIMEOUT,
    )
    .unwrap();
    assert_eq!(status.completed, groups);
    assert_eq!(status.remaining, 0);
    assert_eq!(status.leases.len(), 0);
    assert_eq!(status.health, "complete");
}

#[tokio::test]
async fn test_artifacts_are_jsonl() {
    let dir = tempdir().unwrap();
    let queue = Arc::new(LocalWorkQueue::open(dir.path()).unwrap());
    queue.populate(paths(&["/x/1", "/x/2"]), 2).await.unwrap();

    let processor = Arc::new(JsonlWriter {
        workspace: queue.workspace().clone(),
    });
    let config = WorkerConfig::new(Some("solo"), 1).unwrap();
    QueueWorker::new(Arc::clone(&queue), processor, config)
        .run(|_| {})
        .await
        .unwrap();

    let hash = compute_group_hash(&["/x/1", "/x/2"]);
    let body = std::fs::read_to_string(queue.workspace().result_path(&hash)).unwrap();
    let item: WorkItem = serde_json::from_str(body.trim()).unwrap();
    assert_eq!(item.hash, hash);
    assert_eq!(item.work_paths, paths(&["/x/1", "/x/2"]));
}

#[tokio::test]
async fn test_worker_uses_queue_lease_timeout() {
    let dir = tempdir().unwrap();
    let config = QueueConfig::new(dir.path()).with_lease_timeout(Duration::from_secs(60));
    let queue = Arc::new(LocalWorkQueue::with_config(&config).unwrap());
    queue.populate(paths(&["/x/1"]), 1).await.unwrap();

    // Two minutes old: stale for this queue, fresh under the default window
    let hash = compute_group_hash(&["/x/1"]);
    std::fs::write(queue.workspace().lock_path(&hash), b"").unwrap();
    age_lock(queue.workspace(), &hash, 120);

    let processor = Arc::new(JsonlWriter {
        workspace: queue.workspace().clone(),
    });
    let worker_config = WorkerConfig::new(Some("solo"), 1).unwrap();
    let stats = QueueWorker::new(Arc::clone(&queue), processor, worker_config)
        .run(|_| {})
        .await
        .unwrap();

    assert_eq!(stats.items_processed, 1);
    assert!(queue.workspace().result_path(&hash).exists());
}
