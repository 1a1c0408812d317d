//! Error types for job system operations.

use thiserror::Error;

use super::JobHandle;

/// Errors produced by the job system.
///
/// `Canceled` and `Pending` are not errors; they are reported through
/// [`JobResult`](super::JobResult).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    /// The handle is stale (slot reclaimed) or its index is out of range.
    #[error("invalid job handle: {0}")]
    InvalidHandle(JobHandle),
    /// The child or parent has left the state required for linking.
    #[error("job already started: {0}")]
    AlreadyStarted(JobHandle),
    /// The child already has a parent; a parent can only be set once.
    #[error("job already has a parent: {0}")]
    AlreadyParented(JobHandle),
    /// Linking would make a job its own ancestor.
    #[error("linking {child} under {parent} would create a cycle")]
    Cycle {
        /// Job that was to become the child.
        child: JobHandle,
        /// Job that was to become the parent.
        parent: JobHandle,
    },
    /// The system has been shut down and accepts no more work.
    #[error("job system has been shut down")]
    ShutDown,
    /// Configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// A worker thread could not be spawned.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(String),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
