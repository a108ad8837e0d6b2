use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Session lifecycle configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionsConfig {
    /// Sessions with no activity for this long are reaped. 0 disables expiry.
    pub idle_timeout_secs: u64,
    /// How often the reaper sweeps (valid range: 1-86400).
    pub reap_interval_secs: u32,
    /// Retry bound for pairing code allocation (valid range: 1-1000000).
    pub max_code_attempts: u32,
    /// Messages that may queue for one connection before it is evicted as
    /// a slow peer (valid range: 1-65536).
    pub outbox_capacity: u32,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 0,
            reap_interval_secs: 60,
            max_code_attempts: 1000,
            outbox_capacity: 256,
        }
    }
}

impl SessionsConfig {
    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_secs > 0).then(|| Duration::from_secs(self.idle_timeout_secs))
    }

    pub fn reap_interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.reap_interval_secs))
    }
}
