//! Configuration for the registry client.

use std::time::Duration;

use medchain_core::InputPolicy;

/// Configuration for [`Registry`](crate::Registry).
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Size ceiling and type allow-list checked before hashing.
    pub policy: InputPolicy,
    /// Upper bound on any single registry call.
    pub call_timeout: Duration,
    /// Total rounds a write may take, counting the first submission.
    pub max_attempts: u32,
    /// Pause between rounds.
    pub retry_backoff: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            policy: InputPolicy::default(),
            call_timeout: Duration::from_secs(30),
            max_attempts: 3,
            retry_backoff: Duration::from_millis(500),
        }
    }
}

impl RegistryConfig {
    pub fn with_policy(mut self, policy: InputPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }
}
