//! Tests for job handles

use prometheus_job_system::config::JobSystemConfig;
use prometheus_job_system::core::{Job, JobHandle, JobSystem};
use std::collections::HashSet;
use std::time::Duration;

#[test]
fn test_invalid_handle() {
    assert!(JobHandle::INVALID.is_invalid());
    assert_eq!(JobHandle::default(), JobHandle::INVALID);
    assert_eq!(JobHandle::INVALID.as_u64(), 0);
}

#[test]
fn test_created_handles_are_valid_and_distinct() {
    let system = JobSystem::new(JobSystemConfig::new().with_thread_count(0)).unwrap();
    let handles: Vec<JobHandle> = (0..100)
        .map(|_| system.create_job(Job::new(|_, _, _, _| 0)))
        .collect();

    assert!(handles.iter().all(|h| !h.is_invalid()));
    let unique: HashSet<_> = handles.iter().copied().collect();
    assert_eq!(unique.len(), handles.len());
}

#[test]
fn test_reused_slot_gets_new_generation() {
    let mut system = JobSystem::new(
        JobSystemConfig::new().with_thread_count(0).with_arena_chunk(1),
    )
    .unwrap();

    let mut previous = Vec::new();
    for _ in 0..5 {
        let handle = system.create_job(Job::new(|_, _, _, _| 0));
        system.push_job(handle).unwrap();
        system.update(Duration::from_secs(1));
        assert_eq!(system.status(handle), None);
        previous.push(handle);
    }

    // a one-slot table: same index every time, never the same handle
    assert!(previous.iter().all(|h| h.index() == 0));
    let generations: HashSet<_> = previous.iter().map(|h| h.generation()).collect();
    assert_eq!(generations.len(), previous.len());
    assert_eq!(system.stats().capacity, 1);
}

#[test]
fn test_handle_display() {
    let system = JobSystem::new(JobSystemConfig::new().with_thread_count(0)).unwrap();
    let handle = system.create_job(Job::new(|_, _, _, _| 0));
    assert_eq!(
        handle.to_string(),
        format!("job({}:{})", handle.generation(), handle.index())
    );
    assert_eq!(handle.as_u64() >> 32, u64::from(handle.generation()));
}
