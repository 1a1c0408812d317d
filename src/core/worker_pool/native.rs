//! Native implementation of `WorkerPool` using OS threads.
//!
//! # Design Principles
//!
//! - **No polling**: idle workers block on the scheduler's Condvar
//! - **Lock released while working**: process functions never run under the scheduler lock
//! - **Clean shutdown**: the run flag is cleared under the lock, then all workers are woken and joined

use std::thread::{self, JoinHandle};

use tracing::{debug, info, warn};

use crate::core::scheduler::Runnable;
use crate::core::{JobError, JobScheduler};

/// Dedicated worker threads sharing the scheduler's ready queue.
#[derive(Debug)]
pub(crate) struct WorkerPool {
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `count` workers named `<name_prefix>_<i>`.
    ///
    /// If a spawn fails the workers started so far are stopped and joined.
    pub(crate) fn spawn(
        scheduler: &JobScheduler,
        count: usize,
        name_prefix: &str,
        stack_size: usize,
    ) -> Result<Self, JobError> {
        let mut pool = Self {
            workers: Vec::with_capacity(count),
        };

        for worker_id in 0..count {
            match spawn_worker(scheduler.clone(), worker_id, name_prefix, stack_size) {
                Ok(worker) => pool.workers.push(worker),
                Err(e) => {
                    warn!(worker_id, error = %e, "failed to spawn worker thread");
                    scheduler.begin_shutdown();
                    pool.join();
                    return Err(JobError::Spawn(e.to_string()));
                }
            }
        }

        if count > 0 {
            info!(worker_count = count, name_prefix, "job worker threads started");
        }
        Ok(pool)
    }

    /// Number of live worker threads.
    pub(crate) fn len(&self) -> usize {
        self.workers.len()
    }

    /// Join every worker. The scheduler must already have cleared its run flag.
    pub(crate) fn join(&mut self) {
        for (worker_id, worker) in self.workers.drain(..).enumerate() {
            match worker.join() {
                Ok(()) => debug!(worker_id, "worker joined"),
                Err(_) => warn!(worker_id, "worker thread panicked"),
            }
        }
    }
}

/// Spawn a worker thread.
fn spawn_worker(
    scheduler: JobScheduler,
    worker_id: usize,
    name_prefix: &str,
    stack_size: usize,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("{name_prefix}_{worker_id}"))
        .stack_size(stack_size)
        .spawn(move || {
            debug!(worker_id, "worker thread started");
            while let Some(runnable) = next_runnable(&scheduler) {
                scheduler.execute(runnable);
            }
            debug!(worker_id, "worker thread exiting");
        })
}

/// Block until a job is runnable. `None` once the scheduler stops running.
fn next_runnable(scheduler: &JobScheduler) -> Option<Runnable> {
    let shared = &scheduler.shared;
    let mut state = shared.state.lock();
    loop {
        if !state.running {
            return None;
        }
        if let Some(runnable) = state.take_runnable() {
            return Some(runnable);
        }
        shared.wakeup.wait(&mut state);
    }
}
