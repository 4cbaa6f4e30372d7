//! Pipeline configuration
//!
//! Defaults match production behavior; every knob can be overridden from
//! the environment so the terminal driver and deployments tune pacing
//! without code changes.

use std::env;
use std::time::Duration;

use crate::analyzer::MAX_CONTENT_BYTES;
use crate::discovery::MAX_DISCOVER_BYTES;

/// Orchestration pacing and size limits
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Files per batch
    pub batch_size: usize,
    /// Pause between batches (pacing within a batch is the rate limiter's
    /// job)
    pub batch_delay: Duration,
    /// Analyzer content cap; larger files are counted but not analyzed
    pub max_content_bytes: usize,
    /// Discovery ceiling; larger files never become tasks
    pub max_discover_bytes: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            batch_size: 5,
            batch_delay: Duration::from_secs(4),
            max_content_bytes: MAX_CONTENT_BYTES,
            max_discover_bytes: MAX_DISCOVER_BYTES,
        }
    }
}

impl ScanConfig {
    /// Defaults with environment overrides applied
    ///
    /// Recognized variables: SCAN_BATCH_SIZE, SCAN_BATCH_DELAY_SECS,
    /// SCAN_MAX_CONTENT_BYTES, SCAN_MAX_DISCOVER_BYTES. Unparseable values
    /// fall back to the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            batch_size: env_parse("SCAN_BATCH_SIZE").unwrap_or(defaults.batch_size),
            batch_delay: env_parse("SCAN_BATCH_DELAY_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.batch_delay),
            max_content_bytes: env_parse("SCAN_MAX_CONTENT_BYTES")
                .unwrap_or(defaults.max_content_bytes),
            max_discover_bytes: env_parse("SCAN_MAX_DISCOVER_BYTES")
                .unwrap_or(defaults.max_discover_bytes),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}
