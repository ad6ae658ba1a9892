//! Device recovery policy
//!
//! Decides how long the acquisition loop cools down before re-initializing a device.
//! Cooldown grows geometrically with consecutive failed inits and is capped; recovery
//! never gives up.

use std::fmt;
use std::time::Duration;

use tracing::debug;

/// Recovery policy configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RecoveryPolicy {
    /// Cooldown before the first re-init attempt
    pub initial_delay: Duration,
    /// Upper bound for the cooldown
    pub max_delay: Duration,
    /// Growth per consecutive failed init (1.0 keeps the cooldown fixed)
    pub backoff_multiplier: f64,
}

impl Default for RecoveryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 1.0,
        }
    }
}

impl RecoveryPolicy {
    /// Create from configuration values
    pub fn from_config(initial_delay_ms: u64, max_delay_ms: u64, backoff_multiplier: f64) -> Self {
        Self {
            initial_delay: Duration::from_millis(initial_delay_ms),
            max_delay: Duration::from_millis(max_delay_ms),
            backoff_multiplier,
        }
    }
}

/// Recovery statistics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecoveryStats {
    /// Total re-init attempts
    pub total_attempts: u64,
    /// Successful re-inits
    pub successful_reinits: u64,
    /// Failed re-inits
    pub failed_reinits: u64,
}

impl fmt::Display for RecoveryStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "reinit_attempts={} reinit_succeeded={} reinit_failed={}",
            self.total_attempts, self.successful_reinits, self.failed_reinits
        )
    }
}

/// Tracks consecutive failures and computes the next cooldown
#[derive(Debug)]
pub struct RecoveryTracker {
    policy: RecoveryPolicy,
    consecutive_failures: u32,
    stats: RecoveryStats,
}

impl RecoveryTracker {
    pub fn new(policy: RecoveryPolicy) -> Self {
        Self {
            policy,
            consecutive_failures: 0,
            stats: RecoveryStats::default(),
        }
    }

    pub fn policy(&self) -> &RecoveryPolicy {
        &self.policy
    }

    pub fn stats(&self) -> &RecoveryStats {
        &self.stats
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Cooldown before the next re-init attempt
    pub fn next_cooldown(&self) -> Duration {
        // delay = initial_delay * (multiplier ^ failures)
        let exponent = self.consecutive_failures.min(i32::MAX as u32) as i32;
        let factor = self.policy.backoff_multiplier.powi(exponent);
        let scaled_nanos = self.policy.initial_delay.as_nanos() as f64 * factor;

        if !scaled_nanos.is_finite() || scaled_nanos >= self.policy.max_delay.as_nanos() as f64 {
            self.policy.max_delay
        } else {
            Duration::from_nanos(scaled_nanos.max(0.0) as u64)
        }
    }

    /// Count a re-init attempt
    pub fn record_attempt(&mut self) {
        self.stats.total_attempts += 1;
    }

    /// Device became ready
    pub fn mark_ready(&mut self) {
        if self.consecutive_failures > 0 {
            debug!(
                "Device recovered after {} failed init(s)",
                self.consecutive_failures
            );
        }
        self.consecutive_failures = 0;
    }

    /// Re-init succeeded
    pub fn mark_reinit_succeeded(&mut self) {
        self.stats.successful_reinits += 1;
        self.mark_ready();
    }

    /// Init failed; the next cooldown grows
    pub fn mark_failed(&mut self) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.stats.failed_reinits += 1;
    }
}
