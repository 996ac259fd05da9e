/*!
 * Error Types
 * Centralized error handling for the lock and queue primitives
 */

use thiserror::Error;

/// Result type for lock operations
pub type LockResult<T> = Result<T, LockError>;

/// Lock operation errors
///
/// Ownership violations are programming errors and are surfaced immediately.
/// Timeouts are recoverable outcomes: every timeout-governed path also has a
/// non-failing `try_` alternative.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LockError {
    #[error("lock released from a thread that does not own it")]
    NotOwner,

    #[error("lock acquisition timed out")]
    Timeout,
}

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;

/// Queue operation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("capacity must be greater than 0, got {0}")]
    InvalidCapacity(usize),

    #[error("queue is empty")]
    Empty,

    #[error("wait timed out")]
    Timeout,

    #[error("destination too small: need {needed} slots, have {available}")]
    InsufficientSpace { needed: usize, available: usize },
}
