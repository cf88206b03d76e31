//! Error types shared by the bridge, the event loop and the poller.

use std::io;

use thiserror::Error;

/// Errors surfaced by `loopbridge`.
#[derive(Debug, Error)]
pub enum Error {
    /// An operating system call failed (poller creation, arming a watch,
    /// waiting for readiness).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The discovered descriptor buffer could not grow to the size the
    /// inner loop asked for.
    #[error("descriptor buffer exhausted: failed to grow to {requested} entries")]
    ResourceExhausted {
        /// Number of entries the inner loop wanted to report.
        requested: usize,
    },

    /// The inner loop context is owned by another thread.
    #[error("inner loop context is owned by another thread")]
    AcquireFailed,
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;
