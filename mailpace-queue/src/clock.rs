//! Millisecond timestamps for batch scheduling
//!
//! Eligibility timestamps are signed milliseconds since the Unix epoch. The
//! wall clock is only read once, when the [`Clock`] is created; every later
//! reading adds the monotonic time elapsed since then, so timestamps never go
//! backwards when the system clock is adjusted. Because the monotonic part is
//! a [`tokio::time::Instant`], tests can drive the clock with tokio's paused
//! time.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::time::Instant;

/// Roughly thirty years, used when a deadline does not fit in an `Instant`
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

#[derive(Debug, Clone, Copy)]
pub struct Clock {
    origin: Instant,
    origin_millis: i64,
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock {
    /// Anchor a new clock at the current wall-clock time
    #[must_use]
    pub fn new() -> Self {
        let origin_millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, saturating_millis);

        Self {
            origin: Instant::now(),
            origin_millis,
        }
    }

    /// Milliseconds since the Unix epoch
    pub fn now_millis(&self) -> i64 {
        self.origin_millis
            .saturating_add(saturating_millis(self.origin.elapsed()))
    }

    /// The instant at which `millis` is reached
    ///
    /// Timestamps before this clock's anchor map to the anchor itself.
    pub fn instant_at(&self, millis: i64) -> Instant {
        let offset = millis.saturating_sub(self.origin_millis);
        let Ok(offset) = u64::try_from(offset) else {
            return self.origin;
        };

        self.origin
            .checked_add(Duration::from_millis(offset))
            .unwrap_or_else(|| Instant::now() + FAR_FUTURE)
    }
}

/// Convert a duration into whole milliseconds, saturating at `i64::MAX`
pub(crate) fn saturating_millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_now_follows_monotonic_time() {
        let clock = Clock::new();
        let start = clock.now_millis();

        tokio::time::advance(Duration::from_millis(1_500)).await;

        assert_eq!(clock.now_millis() - start, 1_500);
    }

    #[tokio::test(start_paused = true)]
    async fn test_instant_at_round_trips() {
        let clock = Clock::new();
        let target = clock.now_millis() + 250;

        let instant = clock.instant_at(target);

        assert_eq!(instant - clock.origin, Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn test_instant_at_clamps_past_and_overflow() {
        let clock = Clock::new();

        assert_eq!(clock.instant_at(i64::MIN), clock.origin);
        assert!(clock.instant_at(i64::MAX) > Instant::now() + Duration::from_secs(86_400));
    }

    #[test]
    fn test_saturating_millis() {
        assert_eq!(saturating_millis(Duration::from_millis(42)), 42);
        assert_eq!(saturating_millis(Duration::MAX), i64::MAX);
    }
}
