// crates/store/src/config.rs
//! Store configuration.

use std::time::Duration;

/// Env var overriding both lock timeouts, in whole seconds.
pub const LOCK_TIMEOUT_ENV: &str = "DATAJOBS_LOCK_TIMEOUT_SECS";

const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(30);

/// Bounded-wait settings for the registry lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    /// Maximum wait for a shared (read) acquisition.
    pub shared_lock_timeout: Duration,
    /// Maximum wait for an exclusive (write) acquisition.
    pub exclusive_lock_timeout: Duration,
}

impl StoreConfig {
    /// Use the same timeout for both acquisition modes.
    pub fn with_lock_timeout(timeout: Duration) -> Self {
        Self {
            shared_lock_timeout: timeout,
            exclusive_lock_timeout: timeout,
        }
    }

    /// Defaults, overridden by `DATAJOBS_LOCK_TIMEOUT_SECS` when it parses.
    pub fn from_env() -> Self {
        match std::env::var(LOCK_TIMEOUT_ENV)
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
        {
            Some(secs) => Self::with_lock_timeout(Duration::from_secs(secs)),
            None => Self::default(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::with_lock_timeout(DEFAULT_LOCK_TIMEOUT)
    }
}
