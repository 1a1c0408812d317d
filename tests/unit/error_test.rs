//! Tests for error types

use prometheus_job_system::core::{Job, JobError, JobHandle, JobSystem};
use prometheus_job_system::config::JobSystemConfig;

fn stale_handle() -> JobHandle {
    let mut system = JobSystem::new(JobSystemConfig::new().with_thread_count(0)).unwrap();
    let handle = system.create_job(Job::new(|_, _, _, _| 0));
    system.push_job(handle).unwrap();
    system.update(std::time::Duration::from_secs(1));
    handle
}

#[test]
fn test_invalid_handle_error() {
    let handle = stale_handle();
    let err = JobError::InvalidHandle(handle);
    assert_eq!(format!("{}", err), format!("invalid job handle: {handle}"));
}

#[test]
fn test_invalid_sentinel_error() {
    let err = JobError::InvalidHandle(JobHandle::INVALID);
    assert_eq!(format!("{}", err), "invalid job handle: job(0:0)");
}

#[test]
fn test_shut_down_error() {
    let err = JobError::ShutDown;
    assert_eq!(format!("{}", err), "job system has been shut down");
}

#[test]
fn test_invalid_config_error() {
    let err = JobError::InvalidConfig("arena_chunk must be greater than 0".to_string());
    assert_eq!(
        format!("{}", err),
        "invalid configuration: arena_chunk must be greater than 0"
    );
}

#[test]
fn test_spawn_error() {
    let err = JobError::Spawn("resource temporarily unavailable".to_string());
    assert_eq!(
        format!("{}", err),
        "failed to spawn worker thread: resource temporarily unavailable"
    );
}

#[test]
fn test_errors_convert_to_anyhow() {
    let result: prometheus_job_system::core::AppResult<()> = Err(JobError::ShutDown.into());
    let err = result.unwrap_err();
    assert!(err.downcast_ref::<JobError>().is_some());
}
