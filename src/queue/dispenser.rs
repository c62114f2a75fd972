//! In-memory dispensing of work items
//!
//! A FIFO local to one queue instance, rebuilt on every initialization.
//! Taking never blocks: an empty dispenser returns `None` and the caller
//! decides whether to poll, sleep or exit.

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use crate::group::WorkItem;

/// Counters for one dispenser generation
#[derive(Debug, Default)]
pub struct DispenserStats {
    /// Items loaded at initialization
    pub loaded: AtomicU64,
    /// Items taken from the FIFO
    pub taken: AtomicU64,
    /// Items taken and then skipped (done, leased elsewhere, claim failed)
    pub skipped: AtomicU64,
    /// Items handed out under a lease
    pub dispensed: AtomicU64,
    /// Leases released
    pub released: AtomicU64,
}

impl DispenserStats {
    fn reset(&self) {
        self.loaded.store(0, Ordering::Relaxed);
        self.taken.store(0, Ordering::Relaxed);
        self.skipped.store(0, Ordering::Relaxed);
        self.dispensed.store(0, Ordering::Relaxed);
        self.released.store(0, Ordering::Relaxed);
    }
}

/// One generation of the FIFO
struct Channel {
    sender: Sender<WorkItem>,
    receiver: Receiver<WorkItem>,
}

impl Channel {
    fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self { sender, receiver }
    }
}

/// Non-blocking FIFO plus outstanding-lease bookkeeping
pub struct Dispenser {
    channel: RwLock<Channel>,
    /// Items handed out and not yet released
    outstanding: AtomicUsize,
    stats: DispenserStats,
}

impl Dispenser {
    /// Create an empty dispenser
    pub fn new() -> Self {
        Self {
            channel: RwLock::new(Channel::new()),
            outstanding: AtomicUsize::new(0),
            stats: DispenserStats::default(),
        }
    }

    /// Replace the contents entirely, in the given order
    ///
    /// Items and bookkeeping from the previous generation are discarded.
    pub fn refill(&self, items: Vec<WorkItem>) -> usize {
        let fresh = Channel::new();
        let count = items.len();
        for item in items {
            // The receiver is alive in `fresh`, so this cannot fail
            let _ = fresh.sender.send(item);
        }

        *self.channel.write() = fresh;
        self.outstanding.store(0, Ordering::SeqCst);
        self.stats.reset();
        self.stats.loaded.store(count as u64, Ordering::Relaxed);
        count
    }

    /// Take the next item without blocking
    pub fn try_take(&self) -> Option<WorkItem> {
        let item = self.channel.read().receiver.try_recv().ok()?;
        self.stats.taken.fetch_add(1, Ordering::Relaxed);
        Some(item)
    }

    /// Record that a taken item was dropped for this generation
    pub fn record_skip(&self) {
        self.stats.skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record that a taken item was handed out under a lease
    pub fn record_dispensed(&self) {
        self.stats.dispensed.fetch_add(1, Ordering::Relaxed);
        self.outstanding.fetch_add(1, Ordering::SeqCst);
    }

    /// Record a released lease
    pub fn record_release(&self) {
        self.stats.released.fetch_add(1, Ordering::Relaxed);
        // Saturating: releases of items from an earlier generation are ignored
        let _ = self
            .outstanding
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }

    /// Items still waiting in the FIFO
    pub fn len(&self) -> usize {
        self.channel.read().receiver.len()
    }

    /// Check if the FIFO is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Leases handed out and not yet released
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    /// Counters for the current generation
    pub fn stats(&self) -> &DispenserStats {
        &self.stats
    }
}

impl Default for Dispenser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(hash: &str) -> WorkItem {
        WorkItem::new(hash, vec![format!("/{}", hash)])
    }

    #[test]
    fn test_fifo_order() {
        let dispenser = Dispenser::new();
        assert_eq!(dispenser.refill(vec![item("a"), item("b"), item("c")]), 3);
        assert_eq!(dispenser.len(), 3);

        assert_eq!(dispenser.try_take().unwrap().hash, "a");
        assert_eq!(dispenser.try_take().unwrap().hash, "b");
        assert_eq!(dispenser.try_take().unwrap().hash, "c");
        assert!(dispenser.try_take().is_none());
        assert!(dispenser.is_empty());
    }

    #[test]
    fn test_refill_discards_previous() {
        let dispenser = Dispenser::new();
        dispenser.refill(vec![item("a"), item("b")]);
        dispenser.try_take().unwrap();
        dispenser.record_dispensed();
        assert_eq!(dispenser.outstanding(), 1);

        dispenser.refill(vec![item("z")]);
        assert_eq!(dispenser.len(), 1);
        assert_eq!(dispenser.outstanding(), 0);
        assert_eq!(dispenser.stats().loaded.load(Ordering::Relaxed), 1);
        assert_eq!(dispenser.try_take().unwrap().hash, "z");
    }

    #[test]
    fn test_outstanding_saturates() {
        let dispenser = Dispenser::new();
        dispenser.refill(vec![item("a")]);
        dispenser.try_take().unwrap();
        dispenser.record_dispensed();

        dispenser.record_release();
        dispenser.record_release();
        assert_eq!(dispenser.outstanding(), 0);
        assert_eq!(dispenser.stats().released.load(Ordering::Relaxed), 2);
    }
}
