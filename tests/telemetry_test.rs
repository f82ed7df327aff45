//! Tests for logging initialization.
//!
//! The tracing subscriber is process-global, so this file holds a single
//! test that exercises file output and the double-init failure together.

use ipc_broker::telemetry::{init_logging, LogConfig, LogError, LogFormat};

#[test]
fn logging_initializes_to_file_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broker.log");

    let config = LogConfig {
        format: LogFormat::Json,
        level: "info".to_string(),
        output_path: Some(path.clone()),
    };
    init_logging(&config).expect("first init should succeed");

    tracing::info!(component = "telemetry_test", "log line for the file");
    assert!(path.exists(), "log file should have been created");

    // The global subscriber is already installed.
    let again = init_logging(&LogConfig::default());
    assert!(matches!(again, Err(LogError::AlreadyInitialized)));

    // A broken filter is rejected before touching the global state.
    let bad = LogConfig { level: "not==a==filter".to_string(), ..LogConfig::default() };
    assert!(matches!(init_logging(&bad), Err(LogError::InvalidFilter(_))));
}
