//! Reconnection policies

use rand::Rng;
use std::time::Duration;

/// Delay used by the widget: reconnect 500ms after every close
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(500);

/// Decides when to try reconnecting after the connection drops
pub trait ReconnectPolicy: Send + Sync {
    /// Delay before reconnect attempt `attempt` (1-based). `None` gives up.
    fn next_delay(&self, attempt: u32) -> Option<Duration>;
}

/// Same delay every time, optionally bounded
#[derive(Debug, Clone)]
pub struct FixedDelay {
    pub delay: Duration,
    pub max_attempts: Option<u32>,
}

impl FixedDelay {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            max_attempts: None,
        }
    }

    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }
}

impl Default for FixedDelay {
    fn default() -> Self {
        Self::new(DEFAULT_RECONNECT_DELAY)
    }
}

impl ReconnectPolicy for FixedDelay {
    fn next_delay(&self, attempt: u32) -> Option<Duration> {
        match self.max_attempts {
            Some(max) if attempt > max => None,
            _ => Some(self.delay),
        }
    }
}

/// Doubling delay with a cap and ±25% jitter
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    pub initial: Duration,
    pub max: Duration,
    pub max_attempts: Option<u32>,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            initial: DEFAULT_RECONNECT_DELAY,
            max: Duration::from_secs(30),
            max_attempts: None,
        }
    }
}

impl ExponentialBackoff {
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Un-jittered delay for an attempt
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.initial.saturating_mul(1 << exponent).min(self.max)
    }
}

impl ReconnectPolicy for ExponentialBackoff {
    fn next_delay(&self, attempt: u32) -> Option<Duration> {
        if matches!(self.max_attempts, Some(max) if attempt > max) {
            return None;
        }
        let base = self.base_delay(attempt);
        let factor = rand::thread_rng().gen_range(0.75..=1.25);
        Some(base.mul_f64(factor))
    }
}
