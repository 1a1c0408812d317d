//! Core scheduling: handles, the job table, the dependency tree, workers and delivery.

pub mod error;
pub mod handle;
pub mod job;
mod scheduler;
mod system;
mod table;
mod worker_pool;

pub use error::{AppResult, JobError};
pub use handle::JobHandle;
pub use job::{CallbackFn, Job, JobOutcome, JobResult, JobStatus, ProcessFn, UserPtr};
pub use scheduler::{JobScheduler, PANICKED_RESULT};
pub use system::{JobSystem, JobSystemStats};
pub use worker_pool::THREADS_SUPPORTED;
