//! In-memory rate limiting for credential submissions.
//!
//! DESIGN
//! ======
//! A single window shared by every login call in the process: an attempt
//! counter plus the instant of the most recent accepted attempt. Defaults
//! are 5 attempts per 15 minutes.
//!
//! TRADE-OFFS
//! ==========
//! Each accepted attempt re-stamps the window start, so a steady stream of
//! attempts spaced closer than the window keeps postponing the reset. Check
//! and record happen under one lock acquisition, but callers that race
//! between the check and the provider round-trip are not otherwise held back.
//! Counters live in memory only and reset with the process.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_WINDOW_SECS: u64 = 15 * 60;

const SECS_PER_MINUTE: u128 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub max_attempts: u32,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { max_attempts: DEFAULT_MAX_ATTEMPTS, window: Duration::from_secs(DEFAULT_WINDOW_SECS) }
    }
}

// =============================================================================
// ERROR TYPE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RateLimitError {
    #[error("too many login attempts, please try again in {remaining_minutes} minutes")]
    Exceeded { remaining_minutes: u64 },
}

// =============================================================================
// RATE LIMITER
// =============================================================================

#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<Mutex<RateLimitWindow>>,
    config: RateLimitConfig,
}

/// Attempt counter for the current window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimitWindow {
    pub attempt_count: u32,
    /// `None` until the first accepted attempt.
    pub window_started_at: Option<Instant>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self { inner: Arc::new(Mutex::new(RateLimitWindow::default())), config }
    }

    /// Check the window and record one login attempt.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitError::Exceeded`] when the window is full. The
    /// rejected attempt is not counted.
    pub fn check_and_record(&self) -> Result<(), RateLimitError> {
        self.check_and_record_at(Instant::now())
    }

    /// Check + record with an explicit timestamp.
    ///
    /// # Errors
    ///
    /// Same as [`RateLimiter::check_and_record`].
    pub fn check_and_record_at(&self, now: Instant) -> Result<(), RateLimitError> {
        let mut window = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let cfg = self.config;

        let expired = window
            .window_started_at
            .is_none_or(|started| now.saturating_duration_since(started) > cfg.window);
        if expired {
            window.attempt_count = 0;
            window.window_started_at = Some(now);
        }

        if window.attempt_count >= cfg.max_attempts {
            let elapsed = window
                .window_started_at
                .map_or(Duration::ZERO, |started| now.saturating_duration_since(started));
            let remaining_minutes = remaining_minutes(cfg.window, elapsed);
            tracing::warn!(attempts = window.attempt_count, remaining_minutes, "login rate limit exceeded");
            return Err(RateLimitError::Exceeded { remaining_minutes });
        }

        window.attempt_count += 1;
        window.window_started_at = Some(now);
        Ok(())
    }

    /// Copy of the current window state.
    #[must_use]
    pub fn window(&self) -> RateLimitWindow {
        *self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

// =============================================================================
// HELPERS
// =============================================================================

/// Whole minutes left in the window, rounded up.
fn remaining_minutes(window: Duration, elapsed: Duration) -> u64 {
    let remaining_ms = window.saturating_sub(elapsed).as_millis();
    let minutes = remaining_ms.div_ceil(SECS_PER_MINUTE * 1000);
    u64::try_from(minutes).unwrap_or(u64::MAX)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[path = "rate_limit_test.rs"]
mod tests;
