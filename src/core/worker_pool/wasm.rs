//! Thread-less stand-in for targets and builds without worker threads.

use tracing::debug;

use crate::core::{JobError, JobScheduler};

/// Empty pool; every job runs inside `JobSystem::update`.
#[derive(Debug, Default)]
pub(crate) struct WorkerPool;

impl WorkerPool {
    pub(crate) fn spawn(
        _scheduler: &JobScheduler,
        count: usize,
        _name_prefix: &str,
        _stack_size: usize,
    ) -> Result<Self, JobError> {
        if count > 0 {
            debug!(requested = count, "worker threads unavailable, running synchronously");
        }
        Ok(Self)
    }

    pub(crate) const fn len(&self) -> usize {
        0
    }

    pub(crate) fn join(&mut self) {}
}
