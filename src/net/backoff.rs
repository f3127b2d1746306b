//! Reconnect backoff schedule.
//!
//! DESIGN
//! ======
//! The schedule is derived, never stored: attempt `n` waits
//! `min(max, base * 2^(n-1))`, scaled by a uniform factor in
//! `[1 - jitter, 1 + jitter]` so a fleet of clients does not retry in lockstep.
//! Randomness comes in through [`JitterSource`] so the bounds are testable.

#[cfg(test)]
#[path = "backoff_test.rs"]
mod backoff_test;

use std::time::Duration;

/// Uniform random numbers in `[0, 1)`.
pub trait JitterSource {
    fn unit(&mut self) -> f64;
}

/// A constant source, for deterministic schedules.
#[derive(Clone, Copy, Debug)]
pub struct FixedJitter(pub f64);

impl JitterSource for FixedJitter {
    fn unit(&mut self) -> f64 {
        self.0
    }
}

/// Browser `Math.random()`.
#[cfg(feature = "hydrate")]
#[derive(Clone, Copy, Debug, Default)]
pub struct MathRandom;

#[cfg(feature = "hydrate")]
impl JitterSource for MathRandom {
    fn unit(&mut self) -> f64 {
        js_sys::Math::random()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffPolicy {
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter_ratio: f64,
}

impl BackoffPolicy {
    pub fn new(base_delay_ms: u64, max_delay_ms: u64, jitter_ratio: f64) -> Self {
        Self { base_delay_ms, max_delay_ms, jitter_ratio: jitter_ratio.clamp(0.0, 0.99) }
    }

    /// Pre-jitter delay for a 1-based attempt number; attempt 0 counts as 1.
    pub fn capped_delay_ms(&self, attempt: u32) -> u64 {
        let exponent = attempt.saturating_sub(1).min(63);
        let factor = 1_u64 << exponent;
        self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms)
    }

    /// Jittered delay for a 1-based attempt number, in whole milliseconds
    /// that stay inside the jitter band.
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn delay(&self, attempt: u32, jitter: &mut dyn JitterSource) -> Duration {
        let capped = self.capped_delay_ms(attempt) as f64;
        let unit = jitter.unit().clamp(0.0, 1.0);
        let factor = 1.0 + self.jitter_ratio * (2.0 * unit - 1.0);
        let low = capped * (1.0 - self.jitter_ratio);
        let high = capped * (1.0 + self.jitter_ratio);
        let jittered = (capped * factor).round().clamp(low.ceil(), high.floor()).max(0.0);
        Duration::from_millis(jittered as u64)
    }
}
