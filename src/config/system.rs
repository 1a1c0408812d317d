//! Job system configuration.

use std::env;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::core::AppResult;

/// Upper bound on worker threads; larger requests are clamped.
pub const MAX_THREAD_COUNT: usize = 64;
/// Worker threads are named `<prefix>_<index>`.
pub const DEFAULT_THREAD_NAME_PREFIX: &str = "pl-job";
/// OS thread names are limited to 15 bytes; leave room for `_NN`.
pub const MAX_THREAD_NAME_PREFIX_LEN: usize = 12;
/// 512 KiB per worker.
pub const DEFAULT_THREAD_STACK_SIZE: usize = 0x80000;
/// Job slots added each time the table is full.
pub const DEFAULT_ARENA_CHUNK: usize = 64;

/// Environment variable overriding [`JobSystemConfig::thread_count`].
pub const ENV_THREAD_COUNT: &str = "JOB_SYSTEM_THREAD_COUNT";
/// Environment variable overriding [`JobSystemConfig::thread_name_prefix`].
pub const ENV_THREAD_NAME_PREFIX: &str = "JOB_SYSTEM_THREAD_PREFIX";

/// Job system configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobSystemConfig {
    /// Worker threads to spawn; 0 runs every job inside `update`.
    pub thread_count: usize,
    /// Name prefix for worker threads.
    pub thread_name_prefix: String,
    /// Stack size in bytes for each worker thread.
    pub thread_stack_size: usize,
    /// Growth step of the job table.
    pub arena_chunk: usize,
}

impl Default for JobSystemConfig {
    fn default() -> Self {
        Self {
            // leave one core for the thread that calls update
            thread_count: num_cpus::get().saturating_sub(1).min(4),
            thread_name_prefix: DEFAULT_THREAD_NAME_PREFIX.to_string(),
            thread_stack_size: DEFAULT_THREAD_STACK_SIZE,
            arena_chunk: DEFAULT_ARENA_CHUNK,
        }
    }
}

impl JobSystemConfig {
    /// Default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of worker threads (0 = synchronous mode).
    #[must_use]
    pub const fn with_thread_count(mut self, thread_count: usize) -> Self {
        self.thread_count = thread_count;
        self
    }

    /// Set the worker thread name prefix.
    #[must_use]
    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Set the worker thread stack size in bytes.
    #[must_use]
    pub const fn with_thread_stack_size(mut self, bytes: usize) -> Self {
        self.thread_stack_size = bytes;
        self
    }

    /// Set how many job slots are added when the table is full.
    #[must_use]
    pub const fn with_arena_chunk(mut self, slots: usize) -> Self {
        self.arena_chunk = slots;
        self
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.thread_name_prefix.is_empty() {
            return Err("thread_name_prefix must not be empty".into());
        }
        if self.thread_name_prefix.len() > MAX_THREAD_NAME_PREFIX_LEN {
            return Err(format!(
                "thread_name_prefix `{}` is longer than {MAX_THREAD_NAME_PREFIX_LEN} bytes",
                self.thread_name_prefix
            ));
        }
        if self.thread_stack_size == 0 {
            return Err("thread_stack_size must be greater than 0".into());
        }
        if self.arena_chunk == 0 {
            return Err("arena_chunk must be greater than 0".into());
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate. Missing fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns a parse or validation message.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Defaults overridden by `JOB_SYSTEM_THREAD_COUNT` and `JOB_SYSTEM_THREAD_PREFIX`,
    /// reading a `.env` file first if one exists.
    ///
    /// # Errors
    ///
    /// Fails if a variable does not parse or the result does not validate.
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let mut cfg = Self::default();
        if let Some(count) = lookup(ENV_THREAD_COUNT) {
            cfg.thread_count = count
                .trim()
                .parse()
                .with_context(|| format!("{ENV_THREAD_COUNT}=`{count}` is not a thread count"))?;
        }
        if let Some(prefix) = lookup(ENV_THREAD_NAME_PREFIX) {
            cfg.thread_name_prefix = prefix;
        }
        cfg.validate().map_err(anyhow::Error::msg)?;
        Ok(cfg)
    }
}
