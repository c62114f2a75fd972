//! Filesystem leases
//!
//! A lease is an empty marker file named after the group identity in the
//! locks directory. Its modification time is the lease age; there is no
//! heartbeat. A marker older than the staleness timeout is considered
//! abandoned and may be reclaimed by any worker.
//!
//! Two claim strategies are available:
//!
//! - [`ClaimMode::CheckThenCreate`] inspects the marker, then creates or
//!   truncates it. Two workers racing inside that window can both believe
//!   they hold the lease; downstream processing must tolerate a rerun.
//! - [`ClaimMode::Exclusive`] creates the marker with `O_EXCL`, so only one
//!   of several concurrent claimers of a free item wins. Reclaiming a stale
//!   marker removes it first and is still only best-effort.

use std::fs::{self, OpenOptions};
use std::io::{self, ErrorKind};
use std::time::{Duration, SystemTime};

use crate::workspace::{hash_from_artifact_name, Workspace};

/// Default staleness window (30 minutes)
pub const DEFAULT_LEASE_TIMEOUT: Duration = Duration::from_secs(1800);

/// How a lease marker is created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClaimMode {
    /// Inspect, then create or truncate the marker
    #[default]
    CheckThenCreate,
    /// Create the marker only if absent
    Exclusive,
}

/// Observed state of a lease marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaseState {
    /// No marker
    Free,
    /// Marker older than the timeout
    Stale { age: Duration },
    /// Marker within the timeout
    Held { age: Duration },
}

/// Result of a claim attempt
#[derive(Debug)]
pub enum ClaimOutcome {
    /// Marker created for a free item
    Acquired,
    /// An abandoned marker was taken over
    Reclaimed { previous_age: Duration },
    /// Another worker holds a live lease
    Held { age: Duration },
    /// Another worker created the marker first (exclusive mode only)
    Lost,
    /// The marker could not be inspected or written
    Failed(io::Error),
}

impl ClaimOutcome {
    /// True when the caller now holds the lease
    pub fn is_claimed(&self) -> bool {
        matches!(self, ClaimOutcome::Acquired | ClaimOutcome::Reclaimed { .. })
    }
}

/// A lease marker found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaseInfo {
    /// Group identity
    pub hash: String,
    /// Time since the marker was last written
    pub age: Duration,
}

/// Claims and releases lease markers in a workspace
#[derive(Debug, Clone)]
pub struct LeaseManager {
    workspace: Workspace,
    mode: ClaimMode,
}

impl LeaseManager {
    /// Create a lease manager
    pub fn new(workspace: Workspace, mode: ClaimMode) -> Self {
        Self { workspace, mode }
    }

    /// Claim mode in use
    pub fn mode(&self) -> ClaimMode {
        self.mode
    }

    /// Look at the marker for `hash` without changing it
    pub fn inspect(&self, hash: &str, timeout: Duration) -> io::Result<LeaseState> {
        let metadata = match fs::metadata(self.workspace.lock_path(hash)) {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(LeaseState::Free),
            Err(e) => return Err(e),
        };

        let age = marker_age(metadata.modified()?);
        if age > timeout {
            Ok(LeaseState::Stale { age })
        } else {
            Ok(LeaseState::Held { age })
        }
    }

    /// Try to take the lease for `hash`
    pub fn try_claim(&self, hash: &str, timeout: Duration) -> ClaimOutcome {
        let state = match self.inspect(hash, timeout) {
            Ok(state) => state,
            Err(e) => return ClaimOutcome::Failed(e),
        };

        let result = match (state, self.mode) {
            (LeaseState::Held { age }, _) => return ClaimOutcome::Held { age },
            (_, ClaimMode::CheckThenCreate) => self.write_marker(hash),
            (LeaseState::Free, ClaimMode::Exclusive) => self.create_marker_exclusive(hash),
            (LeaseState::Stale { .. }, ClaimMode::Exclusive) => self
                .remove_marker(hash)
                .and_then(|_| self.create_marker_exclusive(hash)),
        };

        match (result, state) {
            (Ok(()), LeaseState::Stale { age }) => ClaimOutcome::Reclaimed { previous_age: age },
            (Ok(()), _) => ClaimOutcome::Acquired,
            (Err(e), _) if e.kind() == ErrorKind::AlreadyExists => ClaimOutcome::Lost,
            (Err(e), _) => ClaimOutcome::Failed(e),
        }
    }

    /// Remove the marker for `hash`
    ///
    /// Returns `Ok(false)` when there was no marker.
    pub fn release(&self, hash: &str) -> io::Result<bool> {
        self.remove_marker(hash)
    }

    /// All markers currently on disk with their ages
    pub fn list(&self) -> io::Result<Vec<LeaseInfo>> {
        let entries = match fs::read_dir(self.workspace.locks_dir()) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut leases = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let Some(hash) = name.to_str().and_then(hash_from_artifact_name) else {
                continue;
            };
            // The marker may be released between readdir and stat
            let Ok(modified) = entry.metadata().and_then(|m| m.modified()) else {
                continue;
            };
            leases.push(LeaseInfo {
                hash: hash.to_string(),
                age: marker_age(modified),
            });
        }

        leases.sort_by(|a, b| a.hash.cmp(&b.hash));
        Ok(leases)
    }

    /// Create or truncate the marker and stamp it with the current time
    fn write_marker(&self, hash: &str) -> io::Result<()> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(self.workspace.lock_path(hash))?;
        // Truncating an existing empty file does not reliably bump mtime
        file.set_modified(SystemTime::now())
    }

    fn create_marker_exclusive(&self, hash: &str) -> io::Result<()> {
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.workspace.lock_path(hash))
            .map(|_| ())
    }

    fn remove_marker(&self, hash: &str) -> io::Result<bool> {
        match fs::remove_file(self.workspace.lock_path(hash)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// Age of a marker; timestamps in the future count as brand new
fn marker_age(modified: SystemTime) -> Duration {
    SystemTime::now()
        .duration_since(modified)
        .unwrap_or(Duration::ZERO)
}
