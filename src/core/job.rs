//! Job descriptors, lifecycle status and operation results.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{JobHandle, JobScheduler};

/// Opaque user context or payload attached to a job.
///
/// The scheduler never looks inside; it only hands clones of the `Arc` to the
/// process function, the callback and the `context`/`data` accessors.
pub type UserPtr = Arc<dyn Any + Send + Sync>;

/// Work function. May run on any worker thread.
pub type ProcessFn =
    Box<dyn FnOnce(&JobScheduler, JobHandle, Option<&UserPtr>, Option<&UserPtr>) -> i32 + Send>;

/// Completion function. Always runs on the thread that calls `JobSystem::update`.
pub type CallbackFn = Box<dyn FnOnce(&JobScheduler, &JobOutcome) + Send>;

/// Lifecycle state of a job record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Slot is unused.
    Free,
    /// Created, not yet pushed. Children can be attached.
    Created,
    /// Waiting in the ready queue.
    Queued,
    /// Process function is executing.
    Processing,
    /// Process function returned.
    Finished,
    /// Canceled before it could run.
    Canceled,
}

impl JobStatus {
    /// `true` for `Finished` and `Canceled`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Canceled)
    }
}

/// Outcome of `push_job` and `cancel_job`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobResult {
    /// Push: job queued (or already past `Created`). Cancel: job already finished.
    Ok,
    /// The job (and its whole subtree) is canceled.
    Canceled,
    /// Part of the subtree is still processing; call `cancel_job` again later.
    Pending,
}

/// What the callback learns about a completed job.
#[derive(Clone)]
pub struct JobOutcome {
    /// The job that completed. Still valid while the callback runs.
    pub handle: JobHandle,
    /// `Finished` or `Canceled`.
    pub status: JobStatus,
    /// Value returned by the process function, 0 when canceled.
    pub result: i32,
    /// User context the job was created with.
    pub context: Option<UserPtr>,
    /// User data the job was created with.
    pub data: Option<UserPtr>,
}

impl fmt::Debug for JobOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobOutcome")
            .field("handle", &self.handle)
            .field("status", &self.status)
            .field("result", &self.result)
            .field("has_context", &self.context.is_some())
            .field("has_data", &self.data.is_some())
            .finish()
    }
}

/// Parameters for a new job.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use prometheus_job_system::core::Job;
///
/// let job = Job::new(|_scheduler, _handle, _context, data| {
///     data.and_then(|d| d.downcast_ref::<i32>()).copied().unwrap_or(0) * 2
/// })
/// .with_data(Arc::new(21_i32))
/// .with_callback(|_scheduler, outcome| {
///     println!("{} -> {}", outcome.handle, outcome.result);
/// });
/// # drop(job);
/// ```
pub struct Job {
    pub(crate) process: ProcessFn,
    pub(crate) callback: Option<CallbackFn>,
    pub(crate) context: Option<UserPtr>,
    pub(crate) data: Option<UserPtr>,
}

impl Job {
    /// Create a job descriptor around a process function.
    pub fn new<F>(process: F) -> Self
    where
        F: FnOnce(&JobScheduler, JobHandle, Option<&UserPtr>, Option<&UserPtr>) -> i32
            + Send
            + 'static,
    {
        Self {
            process: Box::new(process),
            callback: None,
            context: None,
            data: None,
        }
    }

    /// Attach the main-thread completion callback.
    #[must_use]
    pub fn with_callback<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(&JobScheduler, &JobOutcome) + Send + 'static,
    {
        self.callback = Some(Box::new(callback));
        self
    }

    /// Attach a user context.
    #[must_use]
    pub fn with_context(mut self, context: UserPtr) -> Self {
        self.context = Some(context);
        self
    }

    /// Attach user data.
    #[must_use]
    pub fn with_data(mut self, data: UserPtr) -> Self {
        self.data = Some(data);
        self
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("has_callback", &self.callback.is_some())
            .field("has_context", &self.context.is_some())
            .field("has_data", &self.data.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(JobStatus::Finished.is_terminal());
        assert!(JobStatus::Canceled.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Created.is_terminal());
        assert!(!JobStatus::Free.is_terminal());
    }

    #[test]
    fn test_job_builder() {
        let job = Job::new(|_, _, _, _| 1)
            .with_context(Arc::new("ctx"))
            .with_data(Arc::new(5_u8));
        assert!(job.callback.is_none());
        assert!(job.context.is_some());
        assert!(job.data.is_some());

        let job = job.with_callback(|_, _| {});
        assert!(job.callback.is_some());
    }

    #[test]
    fn test_status_serde() {
        let json = serde_json::to_string(&JobStatus::Processing).unwrap();
        assert_eq!(json, "\"processing\"");
        let back: JobResult = serde_json::from_str("\"pending\"").unwrap();
        assert_eq!(back, JobResult::Pending);
    }
}
