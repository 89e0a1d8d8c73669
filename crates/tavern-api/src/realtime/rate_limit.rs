//! Per-connection command throttling.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::debug;

/// A command arrived after its event name used up the current window.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("rate limit exceeded for {event}: at most {limit} per second")]
pub struct RateLimitExceeded {
    /// The throttled event name.
    pub event: String,
    /// Commands allowed per window.
    pub limit: u32,
}

#[derive(Debug, Clone, Copy)]
struct Window {
    opened_at: Instant,
    count: u32,
}

/// Fixed-window counter per event name, owned by one connection.
///
/// Every check first drops the windows that have closed, so the map only
/// holds event names used within the last window.
#[derive(Debug)]
pub struct RateLimiter {
    limit: u32,
    window: Duration,
    windows: HashMap<String, Window>,
}

impl RateLimiter {
    /// Allows `limit` commands per event name per second.
    #[must_use]
    pub fn per_second(limit: u32) -> Self {
        Self::new(limit, Duration::from_secs(1))
    }

    /// Allows `limit` commands per event name per `window`.
    #[must_use]
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            windows: HashMap::new(),
        }
    }

    /// Counts one command named `event` at `now`.
    ///
    /// # Errors
    ///
    /// Returns `RateLimitExceeded` if the window for `event` is full. The
    /// rejected command is not counted.
    pub fn check(&mut self, event: &str, now: Instant) -> Result<(), RateLimitExceeded> {
        self.expire(now);

        let window = self.windows.entry(event.to_owned()).or_insert(Window {
            opened_at: now,
            count: 0,
        });
        if window.count >= self.limit {
            debug!(event, limit = self.limit, "rate limit exceeded");
            return Err(RateLimitExceeded {
                event: event.to_owned(),
                limit: self.limit,
            });
        }
        window.count += 1;
        Ok(())
    }

    /// Number of open windows.
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.windows.len()
    }

    fn expire(&mut self, now: Instant) {
        let length = self.window;
        self.windows
            .retain(|_, w| now.saturating_duration_since(w.opened_at) < length);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_up_to_the_limit_within_a_window() {
        // Arrange
        let mut limiter = RateLimiter::per_second(2);
        let now = Instant::now();

        // Act
        let first = limiter.check("next-turn", now);
        let second = limiter.check("next-turn", now + Duration::from_millis(100));
        let third = limiter.check("next-turn", now + Duration::from_millis(200));

        // Assert
        assert!(first.is_ok());
        assert!(second.is_ok());
        assert_eq!(
            third,
            Err(RateLimitExceeded {
                event: "next-turn".to_owned(),
                limit: 2,
            })
        );
    }

    #[test]
    fn test_event_names_are_counted_separately() {
        let mut limiter = RateLimiter::per_second(1);
        let now = Instant::now();

        assert!(limiter.check("next-turn", now).is_ok());
        assert!(limiter.check("modify-hp", now).is_ok());
        assert!(limiter.check("next-turn", now).is_err());
    }

    #[test]
    fn test_window_reopens_after_one_second() {
        // Arrange
        let mut limiter = RateLimiter::per_second(1);
        let now = Instant::now();
        limiter.check("modify-hp", now).unwrap();

        // Act
        let result = limiter.check("modify-hp", now + Duration::from_secs(1));

        // Assert
        assert!(result.is_ok());
    }

    #[test]
    fn test_stale_windows_are_expired_on_check() {
        // Arrange
        let mut limiter = RateLimiter::per_second(5);
        let now = Instant::now();
        limiter.check("modify-hp", now).unwrap();
        limiter.check("modify-mana", now).unwrap();
        assert_eq!(limiter.tracked(), 2);

        // Act
        limiter
            .check("next-turn", now + Duration::from_millis(1500))
            .unwrap();

        // Assert
        assert_eq!(limiter.tracked(), 1);
    }
}
