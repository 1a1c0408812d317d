//! # Prometheus Job System
//!
//! A dependency-aware job scheduler: units of work ("jobs") run on a pool of
//! worker threads, or synchronously on the calling thread, while completion
//! callbacks are always delivered on the one thread that owns the system.
//!
//! ## Core Problem Solved
//!
//! Asset pipelines (glyph generation, texture and shader compilation, loaders)
//! produce graphs of small jobs where some results depend on others, and whose
//! results must land on a single "main" thread:
//!
//! - **Dependencies**: a parent only runs after all of its children completed
//! - **Stale handles**: handles are generational, so a handle to a reclaimed job
//!   is always detected instead of aliasing a new one
//! - **Cooperative cancellation**: canceling a subtree never interrupts a running
//!   job; callers poll until nothing is `Pending`
//! - **Main-thread delivery**: callbacks run inside `JobSystem::update`
//!
//! ## Example
//!
//! ```rust
//! use std::time::Duration;
//! use prometheus_job_system::config::JobSystemConfig;
//! use prometheus_job_system::core::{Job, JobStatus, JobSystem};
//!
//! let mut system = JobSystem::new(JobSystemConfig::new().with_thread_count(2))?;
//!
//! let glyphs = system.create_job(Job::new(|_, _, _, _| 64));
//! let atlas = system.create_job(
//!     Job::new(|_, _, _, _| 1).with_callback(|_, outcome| {
//!         assert_eq!(outcome.status, JobStatus::Finished);
//!     }),
//! );
//! system.set_parent(glyphs, atlas)?;
//! system.push_job(atlas)?;
//! system.push_job(glyphs)?;
//!
//! while system.stats().live_jobs > 0 {
//!     system.update(Duration::from_millis(1));
//!     std::thread::sleep(Duration::from_millis(1));
//! }
//! # Ok::<(), prometheus_job_system::core::JobError>(())
//! ```
//!
//! With `thread_count == 0` nothing runs in the background; `update` executes
//! jobs itself, bounded by its time budget.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling: handles, job table, dependency tree, workers and delivery.
pub mod core;
/// Configuration models for the job system.
pub mod config;
/// Shared utilities.
pub mod util;

pub use crate::config::JobSystemConfig;
pub use crate::core::{
    Job, JobError, JobHandle, JobOutcome, JobResult, JobScheduler, JobStatus, JobSystem,
    JobSystemStats, UserPtr,
};
