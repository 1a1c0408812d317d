//! Worker pool: background threads that execute runnable jobs.
//!
//! On native targets each worker loops: lock the scheduler, wait on the
//! wake-up condition variable until a runnable job exists, take it, release
//! the lock, run its process function, then complete it under the lock again.
//! All workers share the one ready queue; there is no work stealing.
//!
//! On `wasm32` (or without the `threads` feature) no threads are spawned and
//! the owning [`JobSystem`](super::JobSystem) runs jobs inside `update`.

#[cfg(all(feature = "threads", not(target_arch = "wasm32")))]
mod native;
#[cfg(not(all(feature = "threads", not(target_arch = "wasm32"))))]
mod wasm;

#[cfg(all(feature = "threads", not(target_arch = "wasm32")))]
pub(crate) use native::WorkerPool;

#[cfg(not(all(feature = "threads", not(target_arch = "wasm32"))))]
pub(crate) use wasm::WorkerPool;

/// Whether this build can spawn worker threads at all.
pub const THREADS_SUPPORTED: bool = cfg!(all(feature = "threads", not(target_arch = "wasm32")));
