//! Polling and expiry bounds shared by both strategies.

use crate::config::Config;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// Sleep between lock attempts.
    pub poll_interval: Duration,
    /// Bound on waiting for admission, and on acquiring the lock to release.
    pub timeout: Duration,
    /// Age after which another process's queue entry is evicted.
    pub stale_after: Duration,
}

impl Timings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            timeout: config.admission_timeout(),
            stale_after: config.stale_after(),
        }
    }
}

