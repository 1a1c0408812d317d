//! Scheduler core: the job table, dependency tree and ready queue behind one lock.
//!
//! Every mutation of job records happens in [`SchedulerState`] while holding
//! the scheduler mutex. Process functions and callbacks always run with the
//! lock released, since they are free to call back into the scheduler.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::Sender;
use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, trace, warn};

use super::job::{CallbackFn, Job, JobOutcome, JobResult, JobStatus, ProcessFn, UserPtr};
use super::table::JobTable;
use super::{JobError, JobHandle};

/// Result reported for a job whose process function panicked.
pub const PANICKED_RESULT: i32 = -1;

/// A job taken off the ready queue, ready to execute without the lock.
pub(crate) struct Runnable {
    handle: JobHandle,
    process: ProcessFn,
    context: Option<UserPtr>,
    data: Option<UserPtr>,
}

/// What `update` needs to deliver one completed job.
pub(crate) struct Delivery {
    pub(crate) callback: Option<CallbackFn>,
    pub(crate) outcome: JobOutcome,
}

/// Mutable scheduler state, only touched while holding [`Shared::state`].
pub(crate) struct SchedulerState {
    pub(crate) table: JobTable,
    /// Pushed jobs waiting for selection. Selection is not FIFO.
    pub(crate) ready: VecDeque<JobHandle>,
    /// Workers exit once this is cleared.
    pub(crate) running: bool,
    done_tx: Sender<JobHandle>,
}

impl SchedulerState {
    pub(crate) fn new(arena_chunk: usize, done_tx: Sender<JobHandle>) -> Self {
        Self {
            table: JobTable::new(arena_chunk),
            ready: VecDeque::new(),
            running: true,
            done_tx,
        }
    }

    fn set_parent(&mut self, child: JobHandle, parent: JobHandle) -> Result<(), JobError> {
        let child_record = self.table.get(child).ok_or(JobError::InvalidHandle(child))?;
        let parent_record = self.table.get(parent).ok_or(JobError::InvalidHandle(parent))?;

        if child_record.status != JobStatus::Created {
            return Err(JobError::AlreadyStarted(child));
        }
        if !matches!(parent_record.status, JobStatus::Created | JobStatus::Queued) {
            return Err(JobError::AlreadyStarted(parent));
        }
        if child_record.parent.is_some() {
            return Err(JobError::AlreadyParented(child));
        }
        debug_assert!(child_record.next_sibling.is_none());

        // walk up from the new parent; meeting the child means a cycle
        let mut cursor = Some(parent);
        while let Some(ancestor) = cursor {
            if ancestor == child {
                return Err(JobError::Cycle { child, parent });
            }
            cursor = self.table.get(ancestor).and_then(|record| record.parent);
        }

        let previous_last = parent_record.last_child;
        if let Some(last) = previous_last.and_then(|last| self.table.get_mut(last)) {
            last.next_sibling = Some(child);
        }
        if let Some(record) = self.table.get_mut(parent) {
            if record.first_child.is_none() {
                record.first_child = Some(child);
            }
            record.last_child = Some(child);
            record.num_children += 1;
        }
        if let Some(record) = self.table.get_mut(child) {
            record.parent = Some(parent);
        }
        Ok(())
    }

    fn push(&mut self, handle: JobHandle) -> Result<JobResult, JobError> {
        let record = self
            .table
            .get_mut(handle)
            .ok_or(JobError::InvalidHandle(handle))?;
        match record.status {
            JobStatus::Created => {
                record.status = JobStatus::Queued;
                self.ready.push_back(handle);
                Ok(JobResult::Ok)
            }
            JobStatus::Canceled => Ok(JobResult::Canceled),
            // already pushed once; never queue it twice
            _ => Ok(JobResult::Ok),
        }
    }

    /// Cancel `root` and everything below it.
    ///
    /// Jobs that are `Processing` cannot be interrupted; they make the whole
    /// call report `Pending`. Canceled jobs stay in the ready queue until
    /// their own children are complete, then selection delivers them.
    fn cancel(&mut self, root: JobHandle) -> Result<JobResult, JobError> {
        let status = self
            .table
            .get(root)
            .map(|record| record.status)
            .ok_or(JobError::InvalidHandle(root))?;
        match status {
            JobStatus::Processing => return Ok(JobResult::Pending),
            JobStatus::Finished => return Ok(JobResult::Ok),
            _ => {}
        }

        let mut result = JobResult::Canceled;
        let mut stack = vec![root];
        while let Some(handle) = stack.pop() {
            let Some(record) = self.table.get_mut(handle) else {
                continue;
            };
            match record.status {
                JobStatus::Processing => {
                    result = JobResult::Pending;
                    continue;
                }
                JobStatus::Finished | JobStatus::Free => continue,
                JobStatus::Created => {
                    // never pushed: queue it so it is delivered once its children are done
                    record.status = JobStatus::Canceled;
                    self.ready.push_back(handle);
                }
                JobStatus::Queued => record.status = JobStatus::Canceled,
                JobStatus::Canceled => {}
            }

            let mut child = record.first_child;
            while let Some(current) = child {
                stack.push(current);
                child = self.table.get(current).and_then(|record| record.next_sibling);
            }
        }
        trace!(job = %root, ?result, "cancel requested");
        Ok(result)
    }

    /// Remove and return the first runnable job in the ready queue.
    ///
    /// Canceled jobs whose children are complete are moved straight to the
    /// done queue on the way. A job still waiting on children keeps its place.
    fn select_next_runnable(&mut self) -> Option<JobHandle> {
        let mut index = 0;
        while index < self.ready.len() {
            let handle = self.ready[index];
            let Some(record) = self.table.get(handle) else {
                debug_assert!(false, "{handle} in the ready queue has no record");
                self.ready.remove(index);
                continue;
            };
            let status = record.status;
            let children_complete = record.children_complete();

            if status == JobStatus::Canceled {
                if children_complete {
                    self.ready.remove(index);
                    self.put_done(handle, JobStatus::Canceled, 0);
                    // may have unblocked a parent we already skipped
                    index = 0;
                } else {
                    index += 1;
                }
                continue;
            }
            debug_assert_eq!(status, JobStatus::Queued);

            if !children_complete {
                index += 1;
                continue;
            }
            self.ready.remove(index);
            return Some(handle);
        }
        None
    }

    /// Select a runnable job and move it to `Processing`.
    pub(crate) fn take_runnable(&mut self) -> Option<Runnable> {
        loop {
            let handle = self.select_next_runnable()?;
            let Some(record) = self.table.get_mut(handle) else {
                continue;
            };
            record.status = JobStatus::Processing;
            let Some(process) = record.process.take() else {
                debug_assert!(false, "{handle} selected twice");
                self.put_done(handle, JobStatus::Finished, 0);
                continue;
            };
            return Some(Runnable {
                handle,
                process,
                context: record.context.clone(),
                data: record.data.clone(),
            });
        }
    }

    /// Record the final status, credit the parent and queue the job for delivery.
    fn put_done(&mut self, handle: JobHandle, status: JobStatus, result: i32) {
        let Some(record) = self.table.get_mut(handle) else {
            debug_assert!(false, "completing unknown job {handle}");
            return;
        };
        record.status = status;
        record.result = result;
        let parent = record.parent;

        if let Some(parent_record) = parent.and_then(|parent| self.table.get_mut(parent)) {
            parent_record.num_children_completed += 1;
            debug_assert!(parent_record.num_children_completed <= parent_record.num_children);
        }
        if self.done_tx.send(handle).is_err() {
            trace!(job = %handle, "done queue closed, completion dropped");
        }
    }

    /// Cancel everything still in the ready queue. Returns how many jobs were dropped.
    pub(crate) fn cancel_all_queued(&mut self) -> usize {
        let queued: Vec<JobHandle> = self.ready.drain(..).collect();
        for &handle in &queued {
            self.put_done(handle, JobStatus::Canceled, 0);
        }
        queued.len()
    }

    /// Take what the callback of a completed job needs. `None` for stale handles.
    pub(crate) fn take_delivery(&mut self, handle: JobHandle) -> Option<Delivery> {
        let record = self.table.get_mut(handle)?;
        debug_assert!(record.status.is_terminal(), "{handle} delivered while {:?}", record.status);
        let result = if record.status == JobStatus::Finished {
            record.result
        } else {
            0
        };
        Some(Delivery {
            callback: record.callback.take(),
            outcome: JobOutcome {
                handle,
                status: record.status,
                result,
                context: record.context.clone(),
                data: record.data.clone(),
            },
        })
    }

    /// Unlink a delivered job from the tree and release its slot.
    pub(crate) fn reclaim(&mut self, handle: JobHandle) {
        self.detach_from_parent(handle);

        // children normally go first; clear whatever is left so no link dangles
        let mut child = self.table.get(handle).and_then(|record| record.first_child);
        while let Some(current) = child {
            child = self.table.get_mut(current).and_then(|record| {
                record.parent = None;
                record.next_sibling.take()
            });
        }

        if let Some(record) = self.table.free(handle) {
            if let Some(created_at) = record.created_at {
                trace!(job = %handle, age_us = created_at.elapsed().as_micros(), "job reclaimed");
            }
        }
    }

    fn detach_from_parent(&mut self, child: JobHandle) {
        let Some(record) = self.table.get_mut(child) else {
            return;
        };
        let Some(parent) = record.parent.take() else {
            return;
        };
        let next = record.next_sibling.take();
        let Some(parent_record) = self.table.get(parent) else {
            return;
        };

        let mut previous = None;
        let mut cursor = parent_record.first_child;
        while let Some(current) = cursor {
            if current == child {
                break;
            }
            previous = Some(current);
            cursor = self.table.get(current).and_then(|record| record.next_sibling);
        }
        if cursor.is_none() {
            debug_assert!(false, "{child} missing from the child list of {parent}");
            return;
        }

        match previous.and_then(|previous| self.table.get_mut(previous)) {
            Some(previous_record) => previous_record.next_sibling = next,
            None => {
                if let Some(parent_record) = self.table.get_mut(parent) {
                    parent_record.first_child = next;
                }
            }
        }
        if let Some(parent_record) = self.table.get_mut(parent) {
            if parent_record.last_child == Some(child) {
                parent_record.last_child = previous;
            }
        }
    }
}

/// State shared between the owner, the workers and every [`JobScheduler`] clone.
pub(crate) struct Shared {
    pub(crate) state: Mutex<SchedulerState>,
    /// Signaled when work may have become runnable, and on shutdown.
    pub(crate) wakeup: Condvar,
    accepting: AtomicBool,
    threaded: bool,
}

/// Cloneable, thread-safe entry point for building and controlling job graphs.
///
/// Handed to every process function and callback so jobs can create, push
/// or cancel other jobs. Completed jobs are only delivered by the owning
/// [`JobSystem`](super::JobSystem).
#[derive(Clone)]
pub struct JobScheduler {
    pub(crate) shared: Arc<Shared>,
}

impl JobScheduler {
    pub(crate) fn new(arena_chunk: usize, threaded: bool, done_tx: Sender<JobHandle>) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(SchedulerState::new(arena_chunk, done_tx)),
                wakeup: Condvar::new(),
                accepting: AtomicBool::new(true),
                threaded,
            }),
        }
    }

    /// Create a job in the `Created` state. Always succeeds; the table grows as needed.
    pub fn create_job(&self, job: Job) -> JobHandle {
        let handle = self.shared.state.lock().table.alloc(job);
        trace!(job = %handle, "job created");
        handle
    }

    /// Make `child` a dependency of `parent`: the parent runs only after the child completes.
    ///
    /// A job can get a parent only once and only while it is `Created`; the
    /// parent must not have started processing.
    ///
    /// # Errors
    ///
    /// - `JobError::InvalidHandle` if either handle is stale
    /// - `JobError::AlreadyStarted` if the child was pushed or the parent started
    /// - `JobError::AlreadyParented` if the child already has a parent
    /// - `JobError::Cycle` if `parent` is `child` or one of its descendants
    pub fn set_parent(&self, child: JobHandle, parent: JobHandle) -> Result<(), JobError> {
        self.shared.state.lock().set_parent(child, parent)
    }

    /// Queue a job for execution.
    ///
    /// Returns `JobResult::Canceled` if the job was canceled before it was
    /// pushed. Pushing a job that already left `Created` is a no-op.
    ///
    /// # Errors
    ///
    /// - `JobError::ShutDown` once the owning system shut down
    /// - `JobError::InvalidHandle` if the handle is stale
    pub fn push_job(&self, handle: JobHandle) -> Result<JobResult, JobError> {
        if !self.shared.accepting.load(Ordering::Acquire) {
            warn!(job = %handle, "push refused, job system is shut down");
            return Err(JobError::ShutDown);
        }
        let result = self.shared.state.lock().push(handle)?;
        if self.shared.threaded && result == JobResult::Ok {
            self.shared.wakeup.notify_one();
        }
        debug!(job = %handle, ?result, "job pushed");
        Ok(result)
    }

    /// Cancel a job and its whole subtree.
    ///
    /// Returns `JobResult::Ok` if the job already finished, `Canceled` once the
    /// subtree is canceled, or `Pending` while any part of it is still
    /// processing. Safe to call repeatedly until it stops returning `Pending`.
    ///
    /// # Errors
    ///
    /// `JobError::InvalidHandle` if the handle is stale.
    pub fn cancel_job(&self, handle: JobHandle) -> Result<JobResult, JobError> {
        let result = self.shared.state.lock().cancel(handle)?;
        if self.shared.threaded {
            // a canceled job may now be deliverable by a waiting worker
            self.shared.wakeup.notify_all();
        }
        Ok(result)
    }

    /// User context of a live job, `None` for a stale handle.
    #[must_use]
    pub fn context(&self, handle: JobHandle) -> Option<UserPtr> {
        self.shared
            .state
            .lock()
            .table
            .get(handle)
            .and_then(|record| record.context.clone())
    }

    /// User data of a live job, `None` for a stale handle.
    #[must_use]
    pub fn data(&self, handle: JobHandle) -> Option<UserPtr> {
        self.shared
            .state
            .lock()
            .table
            .get(handle)
            .and_then(|record| record.data.clone())
    }

    /// Current status of a live job, `None` for a stale handle.
    #[must_use]
    pub fn status(&self, handle: JobHandle) -> Option<JobStatus> {
        self.shared
            .state
            .lock()
            .table
            .get(handle)
            .map(|record| record.status)
    }

    /// Whether worker threads execute jobs (as opposed to `update`).
    #[must_use]
    pub fn is_threaded(&self) -> bool {
        self.shared.threaded
    }

    /// Run a selected job with the lock released, then complete it.
    pub(crate) fn execute(&self, runnable: Runnable) {
        let Runnable {
            handle,
            process,
            context,
            data,
        } = runnable;

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            process(self, handle, context.as_ref(), data.as_ref())
        }));
        let result = outcome.unwrap_or_else(|_| {
            error!(job = %handle, "job process function panicked");
            PANICKED_RESULT
        });

        let has_parent = {
            let mut state = self.shared.state.lock();
            state.put_done(handle, JobStatus::Finished, result);
            state.table.get(handle).is_some_and(|record| record.parent.is_some())
        };
        trace!(job = %handle, result, "job finished");
        if self.shared.threaded && has_parent {
            self.shared.wakeup.notify_all();
        }
    }

    /// Refuse new pushes, cancel queued work and tell the workers to exit.
    pub(crate) fn begin_shutdown(&self) -> usize {
        self.shared.accepting.store(false, Ordering::Release);
        let canceled = {
            let mut state = self.shared.state.lock();
            state.running = false;
            state.cancel_all_queued()
        };
        self.shared.wakeup.notify_all();
        canceled
    }

    /// Free every remaining job record once the workers are joined.
    ///
    /// Stale handles stop resolving through every clone, and the closures and
    /// user pointers of undelivered jobs are dropped. Returns how many records
    /// were released.
    pub(crate) fn release_all(&self) -> usize {
        let evicted = {
            let mut state = self.shared.state.lock();
            debug_assert!(!state.running, "releasing jobs while workers may still run");
            state.ready.clear();
            state.table.free_all()
        };
        // user drops run without the lock held
        let released = evicted.len();
        drop(evicted);
        released
    }
}

impl std::fmt::Debug for JobScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobScheduler")
            .field("threaded", &self.shared.threaded)
            .field("accepting", &self.shared.accepting.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
