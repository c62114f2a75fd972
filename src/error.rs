//! Error types for fs-workqueue
//!
//! This module defines the error hierarchy for the queue:
//! - Index store errors (codec capability, compression, file I/O)
//! - Configuration and CLI errors
//! - Worker driver errors
//!
//! Conditions that are part of normal operation are not errors here: a
//! missing index is an empty index, an exhausted queue is `Ok(None)`, and
//! lease marker failures are logged and skipped by the caller.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for fs-workqueue
#[derive(Error, Debug)]
pub enum QueueError {
    /// Persistent index errors
    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Worker driver errors
    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    /// I/O errors (workspace creation, directory scans)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A blocking filesystem task panicked or was cancelled
    #[error("Background task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl QueueError {
    /// Whether this error means the workspace or build is misconfigured.
    ///
    /// These are never retried by the worker driver.
    pub fn is_fatal_config(&self) -> bool {
        match self {
            QueueError::Config(_) => true,
            QueueError::Index(e) => e.is_codec_failure(),
            _ => false,
        }
    }
}

/// Persistent index store errors
#[derive(Error, Debug)]
pub enum IndexError {
    /// No compression codec is available in this build
    #[error(
        "No index codec available for '{path}': build with the `zstd` feature or inject a codec"
    )]
    CodecUnavailable { path: PathBuf },

    /// The codec failed to compress or decompress the index blob
    #[error("{codec} codec failed on '{path}': {reason}")]
    Codec {
        codec: &'static str,
        path: PathBuf,
        reason: String,
    },

    /// Failed to read the index file
    #[error("Failed to read index '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write the index file
    #[error("Failed to write index '{path}': {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl IndexError {
    /// Check if this error came from the codec rather than the filesystem
    pub fn is_codec_failure(&self) -> bool {
        matches!(
            self,
            IndexError::CodecUnavailable { .. } | IndexError::Codec { .. }
        )
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Group size must be at least one
    #[error("Invalid group size {0}: must be at least 1")]
    InvalidGroupSize(usize),

    /// Path cannot be represented in the index line format
    #[error("Unsupported path '{path}': {reason}")]
    UnsupportedPath { path: String, reason: String },

    /// Invalid worker concurrency
    #[error("Invalid worker count {count}: must be between 1 and {max}")]
    InvalidWorkerCount { count: usize, max: usize },

    /// Invalid exclude pattern
    #[error("Invalid exclude pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Workspace root is unusable
    #[error("Invalid workspace '{path}': {reason}")]
    InvalidWorkspace { path: PathBuf, reason: String },
}

/// Worker driver errors
#[derive(Error, Debug)]
pub enum WorkerError {
    /// The processor failed on a work item
    #[error("Worker '{id}' failed to process item '{hash}': {reason}")]
    ProcessingFailed {
        id: String,
        hash: String,
        reason: String,
    },

    /// A worker task panicked
    #[error("Worker '{id}' panicked: {message}")]
    Panicked { id: String, message: String },
}

/// Result type alias for QueueError
pub type Result<T> = std::result::Result<T, QueueError>;

/// Result type alias for IndexError
pub type IndexResult<T> = std::result::Result<T, IndexError>;
