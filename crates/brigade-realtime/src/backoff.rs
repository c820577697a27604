//! Reconnection delay policy.
//!
//! The delay for attempt `n` is `base × 2^n`, clamped to `max`. There is no
//! attempt ceiling: the channel is the only path for call/order events, so a
//! closed connection is always retried.

use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay before the first retry.
    pub base: Duration,
    /// Upper bound for any single delay.
    pub max: Duration,
}

impl Default for ReconnectPolicy {
    /// `base = 1s`, `max = 30s`.
    fn default() -> Self {
        Self {
            base: Duration::from_millis(1_000),
            max: Duration::from_millis(30_000),
        }
    }
}

impl ReconnectPolicy {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    /// Delay for the given attempt number (0-indexed), saturating at `max`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u128.checked_pow(attempt).unwrap_or(u128::MAX);
        let millis = self.base.as_millis().saturating_mul(factor);
        let capped = millis.min(self.max.as_millis());
        Duration::from_millis(u64::try_from(capped).unwrap_or(u64::MAX))
    }
}
