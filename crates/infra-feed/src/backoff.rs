// Reconnect backoff for the push channel
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct BackoffConfig {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            multiplier: 1.5,
        }
    }
}

/// Exponential backoff with deterministic ±10% jitter
///
/// delay = initial * multiplier^attempt, capped at max, then jittered.
/// The jitter seed spreads displays that lost the same server apart.
pub struct ReconnectBackoff {
    config: BackoffConfig,
    attempt: u32,
    jitter_seed: u32,
}

impl ReconnectBackoff {
    pub fn new(config: BackoffConfig, jitter_seed: u32) -> Self {
        Self {
            config,
            attempt: 0,
            jitter_seed,
        }
    }

    /// Seed derived from a string (e.g. the feed URL)
    pub fn seed_from(s: &str) -> u32 {
        s.chars().map(|c| c as u32).fold(0u32, u32::wrapping_add)
    }

    /// Delay before the next attempt; advances the attempt counter
    pub fn next_delay(&mut self) -> Duration {
        let base_ms = self.config.initial_delay.as_millis() as f64
            * self.config.multiplier.powi(self.attempt as i32);
        let capped_ms = base_ms.min(self.config.max_delay.as_millis() as f64);

        let jitter_factor = 0.9 + ((self.jitter_seed.wrapping_add(self.attempt) % 21) as f64 / 100.0);
        self.attempt = self.attempt.saturating_add(1);

        Duration::from_millis((capped_ms * jitter_factor) as u64)
    }

    /// Call after a successful connection
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}
