//! Generational job handles.

use std::fmt;

/// Opaque reference to a job record.
///
/// A handle pairs a slot index with the generation the slot had when the job
/// was created. Once the slot is reclaimed its generation moves on, and every
/// accessor reports the old handle as invalid instead of touching the new
/// occupant. Handles can only be minted by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobHandle {
    generation: u32,
    index: u32,
}

impl JobHandle {
    /// The reserved "no job" handle. Generation 0 is never issued.
    pub const INVALID: Self = Self {
        generation: 0,
        index: 0,
    };

    pub(crate) const fn new(generation: u32, index: u32) -> Self {
        Self { generation, index }
    }

    /// Returns `true` for [`JobHandle::INVALID`].
    #[must_use]
    pub const fn is_invalid(self) -> bool {
        self.generation == 0
    }

    /// Slot index in the job table.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Generation of the slot when the job was created.
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }

    /// Packs the handle as `generation << 32 | index`.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        ((self.generation as u64) << 32) | self.index as u64
    }

    pub(crate) const fn slot(self) -> usize {
        self.index as usize
    }
}

impl Default for JobHandle {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job({}:{})", self.generation, self.index)
    }
}
