//! Job record table: a growable arena of job slots addressed by generational handles.

use std::time::Instant;

use tracing::trace;

use super::job::{CallbackFn, Job, JobStatus, ProcessFn, UserPtr};
use super::JobHandle;

/// One job record. Tree links are handles into the same table.
pub(crate) struct JobRecord {
    pub(crate) process: Option<ProcessFn>,
    pub(crate) callback: Option<CallbackFn>,
    pub(crate) context: Option<UserPtr>,
    pub(crate) data: Option<UserPtr>,
    pub(crate) parent: Option<JobHandle>,
    pub(crate) first_child: Option<JobHandle>,
    pub(crate) last_child: Option<JobHandle>,
    pub(crate) next_sibling: Option<JobHandle>,
    /// Runnable only when both counters are equal.
    pub(crate) num_children: u32,
    pub(crate) num_children_completed: u32,
    pub(crate) status: JobStatus,
    /// Only meaningful once `status == Finished`.
    pub(crate) result: i32,
    pub(crate) created_at: Option<Instant>,
}

impl JobRecord {
    const fn vacant() -> Self {
        Self {
            process: None,
            callback: None,
            context: None,
            data: None,
            parent: None,
            first_child: None,
            last_child: None,
            next_sibling: None,
            num_children: 0,
            num_children_completed: 0,
            status: JobStatus::Free,
            result: 0,
            created_at: None,
        }
    }

    fn occupied(job: Job) -> Self {
        Self {
            process: Some(job.process),
            callback: job.callback,
            context: job.context,
            data: job.data,
            status: JobStatus::Created,
            created_at: Some(Instant::now()),
            ..Self::vacant()
        }
    }

    pub(crate) const fn children_complete(&self) -> bool {
        self.num_children == self.num_children_completed
    }
}

struct Slot {
    generation: u32,
    record: JobRecord,
}

/// Arena of job records with a free list.
///
/// Grows by `chunk` slots at a time. Every lookup re-validates the handle's
/// generation, so a stale handle yields `None` rather than someone else's job.
pub(crate) struct JobTable {
    slots: Vec<Slot>,
    free: Vec<u32>,
    chunk: usize,
    live: usize,
}

impl JobTable {
    pub(crate) fn new(chunk: usize) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            chunk: chunk.max(1),
            live: 0,
        }
    }

    /// Store `job` in a free slot, growing the arena if none is left.
    pub(crate) fn alloc(&mut self, job: Job) -> JobHandle {
        if self.free.is_empty() {
            self.grow();
        }
        // grow() always leaves at least one free slot
        let index = self.free.pop().unwrap_or_default();
        let slot = &mut self.slots[index as usize];
        debug_assert_eq!(slot.record.status, JobStatus::Free);
        slot.record = JobRecord::occupied(job);
        self.live += 1;
        JobHandle::new(slot.generation, index)
    }

    /// Release the slot behind `handle` and invalidate every copy of the handle.
    ///
    /// Returns the evicted record so the caller decides where its closures are dropped.
    /// A slot whose generation is exhausted is retired instead of reused, so a
    /// handle can never resolve again after its job was freed.
    pub(crate) fn free(&mut self, handle: JobHandle) -> Option<JobRecord> {
        let slot = self.slot_mut(handle)?;
        let record = std::mem::replace(&mut slot.record, JobRecord::vacant());
        let next = slot.generation.checked_add(1);
        if let Some(next) = next {
            slot.generation = next;
        }
        self.live -= 1;
        match next {
            Some(_) => self.free.push(handle.index()),
            None => trace!(slot = handle.index(), "job slot retired, generations exhausted"),
        }
        Some(record)
    }

    /// Free every occupied slot and return the evicted records.
    pub(crate) fn free_all(&mut self) -> Vec<JobRecord> {
        let occupied: Vec<JobHandle> = self
            .slots
            .iter()
            .zip(0_u32..)
            .filter(|(slot, _)| slot.record.status != JobStatus::Free)
            .map(|(slot, index)| JobHandle::new(slot.generation, index))
            .collect();
        occupied
            .into_iter()
            .filter_map(|handle| self.free(handle))
            .collect()
    }

    pub(crate) fn get(&self, handle: JobHandle) -> Option<&JobRecord> {
        self.slots
            .get(handle.slot())
            .filter(|slot| slot.generation == handle.generation())
            .filter(|slot| slot.record.status != JobStatus::Free)
            .map(|slot| &slot.record)
    }

    pub(crate) fn get_mut(&mut self, handle: JobHandle) -> Option<&mut JobRecord> {
        self.slot_mut(handle).map(|slot| &mut slot.record)
    }

    /// Number of occupied slots.
    pub(crate) const fn live(&self) -> usize {
        self.live
    }

    /// Number of slots, occupied or not.
    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn slot_mut(&mut self, handle: JobHandle) -> Option<&mut Slot> {
        self.slots
            .get_mut(handle.slot())
            .filter(|slot| slot.generation == handle.generation())
            .filter(|slot| slot.record.status != JobStatus::Free)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn grow(&mut self) {
        let start = self.slots.len();
        let end = start + self.chunk;
        self.slots.reserve_exact(self.chunk);
        self.slots.extend((start..end).map(|_| Slot {
            generation: 1,
            record: JobRecord::vacant(),
        }));
        // lowest index is handed out first
        self.free.extend((start..end).rev().map(|index| index as u32));
    }
}
