//! Configuration models for the job system.

pub mod system;

pub use system::{
    JobSystemConfig, DEFAULT_ARENA_CHUNK, DEFAULT_THREAD_NAME_PREFIX, DEFAULT_THREAD_STACK_SIZE,
    ENV_THREAD_COUNT, ENV_THREAD_NAME_PREFIX, MAX_THREAD_COUNT, MAX_THREAD_NAME_PREFIX_LEN,
};
