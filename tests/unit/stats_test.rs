//! Tests for system statistics

use prometheus_job_system::config::JobSystemConfig;
use prometheus_job_system::core::{Job, JobSystem, JobSystemStats};
use std::time::Duration;

#[test]
fn test_stats_track_lifecycle() {
    let mut system = JobSystem::new(
        JobSystemConfig::new().with_thread_count(0).with_arena_chunk(4),
    )
    .unwrap();
    assert_eq!(system.stats(), JobSystemStats::default());

    let handles: Vec<_> = (0..6)
        .map(|_| system.create_job(Job::new(|_, _, _, _| 0)))
        .collect();
    let stats = system.stats();
    assert_eq!(stats.live_jobs, 6);
    assert_eq!(stats.queued_jobs, 0);
    assert_eq!(stats.capacity, 8);

    for &handle in &handles {
        system.push_job(handle).unwrap();
    }
    assert_eq!(system.stats().queued_jobs, 6);

    system.update(Duration::from_secs(1));
    let stats = system.stats();
    assert_eq!(stats.live_jobs, 0);
    assert_eq!(stats.queued_jobs, 0);
    assert_eq!(stats.pending_callbacks, 0);
    assert_eq!(stats.capacity, 8);
}

#[test]
fn test_stats_serialize() {
    let system = JobSystem::new(JobSystemConfig::new().with_thread_count(0)).unwrap();
    let json = serde_json::to_value(system.stats()).unwrap();
    assert_eq!(json["worker_count"], 0);
    assert_eq!(json["live_jobs"], 0);
    system.debug_dump();
}
