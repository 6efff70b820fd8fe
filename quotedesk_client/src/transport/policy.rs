//! Linear reconnection backoff with a hard attempt ceiling.
use std::time::Duration;

/// Default number of automatic reconnect attempts.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
/// Default delay unit; attempt `n` waits `n` units.
pub const DEFAULT_BASE_DELAY_MS: u64 = 1000;

/// How many times to reconnect and how long to wait before each attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Attempts allowed after a disconnect before giving up.
    pub max_attempts: u32,
    /// Delay multiplied by the attempt number.
    pub base_delay: Duration,
}

impl ReconnectPolicy {
    /// Policy with the given ceiling and delay unit.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Delay before attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }

    /// Whether another attempt is allowed after `attempts_made`.
    pub fn allows(&self, attempts_made: u32) -> bool {
        attempts_made < self.max_attempts
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_MAX_ATTEMPTS,
            Duration::from_millis(DEFAULT_BASE_DELAY_MS),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_grows_linearly() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(3000));
        assert_eq!(policy.delay_for(5), Duration::from_millis(5000));
    }

    #[test]
    fn ceiling_stops_at_max() {
        let policy = ReconnectPolicy::new(2, Duration::from_millis(10));
        assert!(policy.allows(0));
        assert!(policy.allows(1));
        assert!(!policy.allows(2));
    }
}
