//! Randomised pacing between navigation steps.

use rand::Rng;
use std::time::Duration;

use crate::config::SearchConfig;

/// Delay ranges, in milliseconds, applied between navigation steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingPolicy {
    /// `(min, max)` pause before every navigation after the first.
    pub navigation_ms: (u64, u64),
    /// `(min, max)` pause after a challenge is resolved, before reloading.
    pub settle_ms: (u64, u64),
}

impl PacingPolicy {
    pub fn from_config(config: &SearchConfig) -> Self {
        Self {
            navigation_ms: config.navigation_delay_ms,
            settle_ms: config.settle_delay_ms,
        }
    }

    /// No pauses at all.
    pub fn immediate() -> Self {
        Self {
            navigation_ms: (0, 0),
            settle_ms: (0, 0),
        }
    }

    pub fn navigation_delay(&self) -> Duration {
        random_delay(self.navigation_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        random_delay(self.settle_ms)
    }
}

impl Default for PacingPolicy {
    fn default() -> Self {
        Self::from_config(&SearchConfig::default())
    }
}

/// Pick a delay uniformly from `(min, max)`. A zero `max` means no delay.
fn random_delay((min, max): (u64, u64)) -> Duration {
    if max == 0 {
        return Duration::ZERO;
    }
    let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
    Duration::from_millis(rand::thread_rng().gen_range(lo..=hi))
}

/// Sleep for `delay` unless it is zero.
pub(crate) async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tracing::trace!(delay_ms = delay.as_millis() as u64, "pacing pause");
        tokio::time::sleep(delay).await;
    }
}
