//! Reconnect delay policy.

use rand::Rng;
use serde::Deserialize;
use std::time::Duration;

/// Default delay between reconnect attempts, matching the behavior a
/// human-attended client expects: retry every 5 seconds, forever.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Computes the delay before each reconnect attempt.
///
/// Reconnection itself is perpetual - there is no attempt cap. The default
/// policy is a fixed 5-second delay; unattended deployments can configure
/// capped exponential backoff with jitter instead.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReconnectPolicy {
    /// Delay before the first retry.
    #[serde(with = "seconds")]
    pub initial: Duration,
    /// Upper bound on the computed delay.
    #[serde(with = "seconds")]
    pub max: Duration,
    /// Growth factor applied per consecutive failed attempt.
    pub multiplier: f64,
    /// Jitter fraction in `[0.0, 1.0]`; the delay is scaled by a random
    /// factor in `[1 - jitter, 1 + jitter]`.
    pub jitter: f64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::fixed(DEFAULT_RECONNECT_DELAY)
    }
}

impl ReconnectPolicy {
    /// A fixed delay between attempts, no growth, no jitter.
    pub fn fixed(delay: Duration) -> Self {
        Self {
            initial: delay,
            max: delay,
            multiplier: 1.0,
            jitter: 0.0,
        }
    }

    /// Capped exponential backoff (doubling) with 10% jitter.
    pub fn exponential(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            multiplier: 2.0,
            jitter: 0.1,
        }
    }

    /// Returns the delay to wait before reconnect attempt `attempt`
    /// (0-based, counting consecutive failures since the last successful
    /// connection).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        // Exponent clamped so the computation cannot overflow to infinity
        // before the cap applies.
        let exponent = attempt.min(32) as i32;
        let base = self.initial.as_secs_f64() * self.multiplier.powi(exponent);
        let capped = base.min(self.max.as_secs_f64());

        let scaled = if self.jitter > 0.0 {
            let factor = rand::thread_rng().gen_range(1.0 - self.jitter..=1.0 + self.jitter);
            capped * factor
        } else {
            capped
        };

        Duration::from_secs_f64(scaled.max(0.0))
    }
}

/// Serde helper for durations expressed as whole seconds in config files.
mod seconds {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
