//! Worker module for queue processing
//!
//! Workers pull groups from a work queue, hand them to a processor that
//! writes the result artifact, and release the lease.

mod processor;

pub use processor::{ProcessError, QueueWorker, WorkProcessor, WorkerProgress, WorkerStats};
