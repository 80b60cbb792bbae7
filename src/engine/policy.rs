//! Retry policy for reconciliation passes

use std::time::Duration;

/// Bounded in-line attempts followed by a deferred retry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Consecutive attempts made while holding the room lock
    pub max_attempts: u32,

    /// Delay before a deferred pass runs
    pub cooldown: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 25,
            cooldown: Duration::from_secs(3),
        }
    }
}

impl RetryPolicy {
    /// Set the attempt bound (at least one attempt is always made)
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Set the deferred retry delay
    pub fn cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 25);
        assert_eq!(policy.cooldown, Duration::from_secs(3));
    }

    #[test]
    fn test_zero_attempts_clamped() {
        let policy = RetryPolicy::default().max_attempts(0);
        assert_eq!(policy.max_attempts, 1);
    }
}
