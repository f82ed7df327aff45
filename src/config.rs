//! Broker configuration loading from environment variables.
//!
//! All values come from `BROKER_*` variables with sensible defaults.
//! Invalid values fall back to defaults without crashing.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |---|---|---|
//! | `BROKER_TOKEN_TTL_SECS` | 86400 | Token lifetime (secs) |
//! | `BROKER_QUEUE_DEPTH` | 256 | Max queued bridge messages |
//! | `BROKER_PIPE_CAPACITY` | 65536 | Per-channel buffer (bytes) |
//! | `BROKER_LOG_LEVEL` | info | Tracing filter directive |
//! | `BROKER_LOG_FORMAT` | json | `json` or `pretty` |
//! | `BROKER_LOG_PATH` | (stderr) | Log file path |

use std::path::PathBuf;
use std::time::Duration;

use crate::telemetry::{LogConfig, LogFormat};
use crate::BrokerConfig;

/// Broker plus logging configuration loaded from the environment.
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub broker: BrokerConfig,
    pub log: LogConfig,
}

impl EnvConfig {
    /// Load everything from `BROKER_*` variables.
    pub fn load() -> Self {
        Self {
            broker: load_broker_config(),
            log: load_log_config(),
        }
    }
}

/// Parse a `usize` env var, returning `default` on missing or invalid.
fn parse_usize(key: &str, default: usize) -> usize {
    match std::env::var(key) {
        Ok(val) => val.parse::<usize>().unwrap_or(default),
        Err(_) => default,
    }
}

/// Parse a `u64` env var, returning `default` on missing or invalid.
fn parse_u64(key: &str, default: u64) -> u64 {
    match std::env::var(key) {
        Ok(val) => val.parse::<u64>().unwrap_or(default),
        Err(_) => default,
    }
}

fn load_broker_config() -> BrokerConfig {
    let ttl_secs = parse_u64("BROKER_TOKEN_TTL_SECS", 86_400).max(1);
    let queue_depth = parse_usize("BROKER_QUEUE_DEPTH", 256).max(1);
    let pipe_capacity = parse_usize("BROKER_PIPE_CAPACITY", 64 * 1024).max(1024);

    BrokerConfig {
        token_ttl: Duration::from_secs(ttl_secs),
        queue_depth,
        pipe_capacity,
    }
}

fn load_log_config() -> LogConfig {
    let level = std::env::var("BROKER_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let format = std::env::var("BROKER_LOG_FORMAT")
        .map(|v| LogFormat::from_name(&v))
        .unwrap_or_default();
    let output_path = std::env::var("BROKER_LOG_PATH").ok().map(PathBuf::from);

    LogConfig { format, level, output_path }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_usize_defaults_on_missing() {
        assert_eq!(parse_usize("BROKER_TEST_UNSET_USIZE", 42), 42);
    }

    #[test]
    fn parse_usize_defaults_on_garbage() {
        std::env::set_var("BROKER_TEST_GARBAGE_USIZE", "not-a-number");
        assert_eq!(parse_usize("BROKER_TEST_GARBAGE_USIZE", 7), 7);
        std::env::remove_var("BROKER_TEST_GARBAGE_USIZE");
    }

    #[test]
    fn parse_u64_reads_value() {
        std::env::set_var("BROKER_TEST_TTL_U64", "120");
        assert_eq!(parse_u64("BROKER_TEST_TTL_U64", 86_400), 120);
        std::env::remove_var("BROKER_TEST_TTL_U64");
    }

    #[test]
    fn defaults_match_broker_config() {
        let cfg = load_broker_config();
        assert_eq!(cfg.token_ttl, Duration::from_secs(86_400));
        assert_eq!(cfg.queue_depth, 256);
        assert_eq!(cfg.pipe_capacity, 64 * 1024);
    }
}
