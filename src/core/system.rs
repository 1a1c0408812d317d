//! The job system owner: worker lifetime, synchronous execution and callback delivery.

use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::{JobSystemConfig, MAX_THREAD_COUNT};

use super::worker_pool::{WorkerPool, THREADS_SUPPORTED};
use super::{Job, JobError, JobHandle, JobResult, JobScheduler, JobStatus, UserPtr};

/// Snapshot of job system utilization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JobSystemStats {
    /// Number of worker threads (0 in synchronous mode).
    pub worker_count: usize,
    /// Job records in use, including completed jobs awaiting `update`.
    pub live_jobs: usize,
    /// Jobs in the ready queue, runnable or waiting on children.
    pub queued_jobs: usize,
    /// Completed or canceled jobs whose callbacks have not run yet.
    pub pending_callbacks: usize,
    /// Allocated job slots.
    pub capacity: usize,
}

/// Dependency-aware job system.
///
/// Owns the worker threads and the consuming end of the done queue. Whoever
/// holds the `JobSystem` is the "main" thread: every callback runs inside
/// [`update`](Self::update), which needs `&mut self`, so there is exactly one
/// consumer. Other threads (and jobs themselves) work through a cloned
/// [`JobScheduler`].
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use prometheus_job_system::config::JobSystemConfig;
/// use prometheus_job_system::core::{Job, JobSystem};
///
/// let mut system = JobSystem::new(JobSystemConfig::new().with_thread_count(0))?;
/// let child = system.create_job(Job::new(|_, _, _, _| 1));
/// let parent = system.create_job(Job::new(|_, _, _, _| 2));
/// system.set_parent(child, parent)?;
/// system.push_job(parent)?;
/// system.push_job(child)?;
/// while system.stats().live_jobs > 0 {
///     system.update(Duration::from_millis(1));
/// }
/// # Ok::<(), prometheus_job_system::core::JobError>(())
/// ```
pub struct JobSystem {
    scheduler: JobScheduler,
    done_rx: Receiver<JobHandle>,
    workers: WorkerPool,
    shut_down: bool,
}

impl JobSystem {
    /// Create a job system. `thread_count == 0` selects synchronous mode, where
    /// jobs only make progress inside [`update`](Self::update).
    ///
    /// # Errors
    ///
    /// - `JobError::InvalidConfig` if the configuration is invalid
    /// - `JobError::Spawn` if a worker thread could not be started
    pub fn new(config: JobSystemConfig) -> Result<Self, JobError> {
        config.validate().map_err(JobError::InvalidConfig)?;

        let thread_count = if THREADS_SUPPORTED {
            config.thread_count.min(MAX_THREAD_COUNT)
        } else {
            0
        };
        let (done_tx, done_rx) = unbounded();
        let scheduler = JobScheduler::new(config.arena_chunk, thread_count > 0, done_tx);
        let workers = WorkerPool::spawn(
            &scheduler,
            thread_count,
            &config.thread_name_prefix,
            config.thread_stack_size,
        )?;

        info!(
            worker_count = thread_count,
            requested = config.thread_count,
            arena_chunk = config.arena_chunk,
            "job system initialized"
        );

        Ok(Self {
            scheduler,
            done_rx,
            workers,
            shut_down: false,
        })
    }

    /// Cloneable handle for building job graphs from any thread.
    #[must_use]
    pub const fn scheduler(&self) -> &JobScheduler {
        &self.scheduler
    }

    /// See [`JobScheduler::create_job`].
    pub fn create_job(&self, job: Job) -> JobHandle {
        self.scheduler.create_job(job)
    }

    /// See [`JobScheduler::set_parent`].
    ///
    /// # Errors
    ///
    /// Same as [`JobScheduler::set_parent`].
    pub fn set_parent(&self, child: JobHandle, parent: JobHandle) -> Result<(), JobError> {
        self.scheduler.set_parent(child, parent)
    }

    /// See [`JobScheduler::push_job`].
    ///
    /// # Errors
    ///
    /// Same as [`JobScheduler::push_job`].
    pub fn push_job(&self, handle: JobHandle) -> Result<JobResult, JobError> {
        self.scheduler.push_job(handle)
    }

    /// See [`JobScheduler::cancel_job`].
    ///
    /// # Errors
    ///
    /// Same as [`JobScheduler::cancel_job`].
    pub fn cancel_job(&self, handle: JobHandle) -> Result<JobResult, JobError> {
        self.scheduler.cancel_job(handle)
    }

    /// See [`JobScheduler::context`].
    #[must_use]
    pub fn context(&self, handle: JobHandle) -> Option<UserPtr> {
        self.scheduler.context(handle)
    }

    /// See [`JobScheduler::data`].
    #[must_use]
    pub fn data(&self, handle: JobHandle) -> Option<UserPtr> {
        self.scheduler.data(handle)
    }

    /// See [`JobScheduler::status`].
    #[must_use]
    pub fn status(&self, handle: JobHandle) -> Option<JobStatus> {
        self.scheduler.status(handle)
    }

    /// Number of live background threads (0 in synchronous mode).
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Deliver completed jobs on the calling thread.
    ///
    /// In synchronous mode this first executes ready jobs until `budget` is
    /// used up or nothing is runnable; a zero budget executes at most one job.
    /// Then every finished or canceled job gets its callback, outside the
    /// lock, and its slot is reclaimed. Never blocks waiting for work.
    pub fn update(&mut self, budget: Duration) {
        if self.shut_down {
            return;
        }
        if !self.scheduler.is_threaded() {
            self.run_synchronously(budget);
        }

        // take the current batch; jobs completing meanwhile wait for the next update
        let finished: Vec<JobHandle> = self.done_rx.try_iter().collect();
        for handle in finished {
            self.deliver(handle);
        }
    }

    fn run_synchronously(&self, budget: Duration) {
        let started = Instant::now();
        loop {
            let runnable = {
                let mut state = self.scheduler.shared.state.lock();
                if state.ready.is_empty() {
                    return;
                }
                match state.take_runnable() {
                    Some(runnable) => runnable,
                    None => return,
                }
            };
            self.scheduler.execute(runnable);

            if budget.is_zero() || started.elapsed() > budget {
                break;
            }
        }
    }

    fn deliver(&self, handle: JobHandle) {
        let Some(delivery) = self.scheduler.shared.state.lock().take_delivery(handle) else {
            return;
        };
        debug!(
            job = %handle,
            status = ?delivery.outcome.status,
            result = delivery.outcome.result,
            "delivering job"
        );
        if let Some(callback) = delivery.callback {
            callback(&self.scheduler, &delivery.outcome);
        }
        self.scheduler.shared.state.lock().reclaim(handle);
    }

    /// Current utilization snapshot.
    #[must_use]
    pub fn stats(&self) -> JobSystemStats {
        let state = self.scheduler.shared.state.lock();
        JobSystemStats {
            worker_count: self.workers.len(),
            live_jobs: state.table.live(),
            queued_jobs: state.ready.len(),
            pending_callbacks: self.done_rx.len(),
            capacity: state.table.capacity(),
        }
    }

    /// Log the ready queue and done-queue depth at debug level.
    pub fn debug_dump(&self) {
        let state = self.scheduler.shared.state.lock();
        debug!(
            ready = state.ready.len(),
            done = self.done_rx.len(),
            live = state.table.live(),
            "job system state"
        );
        for &handle in &state.ready {
            if let Some(record) = state.table.get(handle) {
                debug!(
                    job = %handle,
                    status = ?record.status,
                    children = record.num_children,
                    children_completed = record.num_children_completed,
                    "  queued"
                );
            }
        }
    }

    /// Stop accepting work, cancel everything still queued, join the workers
    /// and free every remaining job record.
    ///
    /// Jobs already processing run to completion first. Callbacks of work
    /// canceled here are not invoked, and their closures and user pointers are
    /// dropped. Handles stay invalid afterwards, also through cloned
    /// [`JobScheduler`]s. Called automatically on drop.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        let canceled = self.scheduler.begin_shutdown();
        self.workers.join();
        let released = self.scheduler.release_all();
        // completions still queued refer to slots that were just freed
        let undelivered = self.done_rx.try_iter().count();
        info!(canceled, released, undelivered, "job system shut down");
    }
}

impl Drop for JobSystem {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for JobSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobSystem")
            .field("worker_count", &self.workers.len())
            .field("shut_down", &self.shut_down)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn synchronous() -> JobSystem {
        JobSystem::new(JobSystemConfig::new().with_thread_count(0)).unwrap()
    }

    #[test]
    fn test_zero_budget_runs_one_job() {
        let mut system = synchronous();
        let handles: Vec<_> = (0..3)
            .map(|_| system.create_job(Job::new(|_, _, _, _| 1)))
            .collect();
        for &handle in &handles {
            system.push_job(handle).unwrap();
        }

        system.update(Duration::ZERO);
        assert_eq!(system.stats().live_jobs, 2);
        assert_eq!(system.stats().queued_jobs, 2);

        system.update(Duration::from_secs(1));
        assert_eq!(system.stats().live_jobs, 0);
    }

    #[test]
    fn test_callback_runs_on_update() {
        let mut system = synchronous();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let handle = system.create_job(
            Job::new(|_, _, _, _| 9).with_callback(move |_, outcome| {
                assert_eq!(outcome.status, JobStatus::Finished);
                assert_eq!(outcome.result, 9);
                seen.fetch_add(1, Ordering::SeqCst);
            }),
        );
        system.push_job(handle).unwrap();
        system.update(Duration::ZERO);
        system.update(Duration::ZERO);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(system.status(handle), None);
    }

    #[test]
    fn test_context_and_data_accessors() {
        let system = synchronous();
        let handle = system.create_job(
            Job::new(|_, _, _, _| 0)
                .with_context(Arc::new("ctx"))
                .with_data(Arc::new(7_u64)),
        );
        let data = system.data(handle).unwrap();
        assert_eq!(data.downcast_ref::<u64>(), Some(&7));
        let context = system.context(handle).unwrap();
        assert_eq!(context.downcast_ref::<&str>(), Some(&"ctx"));
        assert!(system.data(JobHandle::INVALID).is_none());
    }

    #[test]
    fn test_synchronous_mode_has_no_workers() {
        let system = synchronous();
        assert_eq!(system.worker_count(), 0);
        assert!(!system.scheduler().is_threaded());
    }

    #[test]
    fn test_shutdown_skips_callbacks() {
        let mut system = synchronous();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let handle = system.create_job(Job::new(|_, _, _, _| 0).with_callback(move |_, _| {
            seen.fetch_add(1, Ordering::SeqCst);
        }));
        system.push_job(handle).unwrap();

        system.shutdown();
        system.update(Duration::from_secs(1));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(system.push_job(handle), Err(JobError::ShutDown));
    }

    #[test]
    fn test_shutdown_frees_records() {
        let mut system = synchronous();
        let scheduler = system.scheduler().clone();
        let payload: UserPtr = Arc::new(vec![0_u8; 16]);
        let queued = system.create_job(Job::new(|_, _, _, _| 0).with_data(Arc::clone(&payload)));
        let created = system.create_job(Job::new(|_, _, _, _| 0).with_data(Arc::clone(&payload)));
        system.push_job(queued).unwrap();

        system.shutdown();
        drop(system);

        assert_eq!(Arc::strong_count(&payload), 1);
        assert_eq!(scheduler.status(queued), None);
        assert_eq!(scheduler.status(created), None);
        assert!(scheduler.data(created).is_none());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = JobSystemConfig::new().with_thread_name_prefix("");
        assert!(matches!(JobSystem::new(config), Err(JobError::InvalidConfig(_))));
    }
}
