//! Tests for configuration validation

use prometheus_job_system::config::{
    JobSystemConfig, DEFAULT_ARENA_CHUNK, DEFAULT_THREAD_NAME_PREFIX, DEFAULT_THREAD_STACK_SIZE,
    MAX_THREAD_NAME_PREFIX_LEN,
};

#[test]
fn test_default_config() {
    let cfg = JobSystemConfig::default();
    assert_eq!(cfg.thread_name_prefix, DEFAULT_THREAD_NAME_PREFIX);
    assert_eq!(cfg.thread_stack_size, DEFAULT_THREAD_STACK_SIZE);
    assert_eq!(cfg.arena_chunk, DEFAULT_ARENA_CHUNK);
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_builder_methods() {
    let cfg = JobSystemConfig::new()
        .with_thread_count(2)
        .with_thread_name_prefix("glyphs")
        .with_thread_stack_size(1 << 20)
        .with_arena_chunk(8);
    assert_eq!(cfg.thread_count, 2);
    assert_eq!(cfg.thread_name_prefix, "glyphs");
    assert_eq!(cfg.thread_stack_size, 1 << 20);
    assert_eq!(cfg.arena_chunk, 8);
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_invalid_empty_prefix() {
    let invalid = JobSystemConfig::new().with_thread_name_prefix("");
    assert!(invalid.validate().is_err());
}

#[test]
fn test_invalid_long_prefix() {
    let invalid =
        JobSystemConfig::new().with_thread_name_prefix("x".repeat(MAX_THREAD_NAME_PREFIX_LEN + 1));
    let err = invalid.validate().unwrap_err();
    assert!(err.contains("longer than"));
}

#[test]
fn test_invalid_stack_size() {
    let invalid = JobSystemConfig::new().with_thread_stack_size(0);
    assert!(invalid.validate().is_err());
}

#[test]
fn test_invalid_arena_chunk() {
    let invalid = JobSystemConfig::new().with_arena_chunk(0);
    assert!(invalid.validate().is_err());
}

#[test]
fn test_zero_threads_is_valid() {
    let cfg = JobSystemConfig::new().with_thread_count(0);
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_from_json_partial() {
    let cfg = JobSystemConfig::from_json_str(r#"{ "thread_count": 3 }"#).unwrap();
    assert_eq!(cfg.thread_count, 3);
    assert_eq!(cfg.thread_name_prefix, DEFAULT_THREAD_NAME_PREFIX);
    assert_eq!(cfg.arena_chunk, DEFAULT_ARENA_CHUNK);
}

#[test]
fn test_from_json_full() {
    let json = r#"{
        "thread_count": 1,
        "thread_name_prefix": "loader",
        "thread_stack_size": 262144,
        "arena_chunk": 16
    }"#;
    let cfg = JobSystemConfig::from_json_str(json).unwrap();
    assert_eq!(
        cfg,
        JobSystemConfig::new()
            .with_thread_count(1)
            .with_thread_name_prefix("loader")
            .with_thread_stack_size(262_144)
            .with_arena_chunk(16)
    );
}

#[test]
fn test_from_json_rejects_invalid() {
    let err = JobSystemConfig::from_json_str(r#"{ "arena_chunk": 0 }"#).unwrap_err();
    assert!(err.contains("arena_chunk"));

    let err = JobSystemConfig::from_json_str("{ not json").unwrap_err();
    assert!(err.starts_with("parse error"));
}

#[test]
fn test_serde_roundtrip_preserves_values() {
    let cfg = JobSystemConfig::new().with_thread_count(2).with_thread_name_prefix("tex");
    let json = serde_json::to_string(&cfg).unwrap();
    assert_eq!(JobSystemConfig::from_json_str(&json).unwrap(), cfg);
}
