//! Reconnect backoff with jitter and reset-on-stability.

use std::time::Duration;

use rand::Rng;
use tokio::time::Instant;

/// Tracks consecutive reconnect attempts and computes the delay before the
/// next one.
///
/// The delay doubles with every attempt, is capped at `max_delay`, and is
/// randomised into `[delay / 2, delay]`. A connection that stayed open for at
/// least `reset_threshold` before failing forgives all previous attempts.
#[derive(Clone, Debug)]
pub struct Backoff {
    max_delay: Duration,
    reset_threshold: Duration,
    attempt: u32,
    connected_at: Option<Instant>,
}

impl Backoff {
    /// Create a backoff timer with no recorded attempts.
    pub fn new(max_delay: Duration, reset_threshold: Duration) -> Self {
        Self {
            max_delay,
            reset_threshold,
            attempt: 0,
            connected_at: None,
        }
    }

    /// Number of consecutive attempts counted so far.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Record the moment a connection became healthy.
    pub fn set_connected_time(&mut self, at: Instant) {
        self.connected_at = Some(at);
    }

    /// Compute the delay before the next reconnect attempt.
    pub fn reconnect_delay(&mut self, base: Duration) -> Duration {
        self.reconnect_delay_at(base, Instant::now())
    }

    /// Same as [`reconnect_delay`](Self::reconnect_delay) with an explicit
    /// "now".
    pub fn reconnect_delay_at(&mut self, base: Duration, now: Instant) -> Duration {
        self.attempt = self.attempt.saturating_add(1);

        // The connected timestamp is consumed by exactly one measurement.
        if let Some(connected_at) = self.connected_at.take()
            && now.saturating_duration_since(connected_at) >= self.reset_threshold
        {
            self.attempt = 0;
        }

        jitter(ceiling(base, self.max_delay, self.attempt))
    }
}

/// `min(max, base * 2^attempt)`, saturating at `max` on overflow.
pub(crate) fn ceiling(base: Duration, max: Duration, attempt: u32) -> Duration {
    2u32.checked_pow(attempt)
        .and_then(|factor| base.checked_mul(factor))
        .map_or(max, |delay| delay.min(max))
}

/// Uniformly pick a duration in `[delay / 2, delay]`.
fn jitter(delay: Duration) -> Duration {
    let full = u64::try_from(delay.as_nanos()).unwrap_or(u64::MAX);
    let half = full / 2;
    Duration::from_nanos(rand::rng().random_range(half..=full))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: Duration = Duration::from_millis(100);
    const MAX: Duration = Duration::from_secs(5);
    const THRESHOLD: Duration = Duration::from_secs(60);

    #[test]
    fn test_ceiling_doubles_until_max() {
        assert_eq!(ceiling(BASE, MAX, 0), Duration::from_millis(100));
        assert_eq!(ceiling(BASE, MAX, 1), Duration::from_millis(200));
        assert_eq!(ceiling(BASE, MAX, 3), Duration::from_millis(800));
        assert_eq!(ceiling(BASE, MAX, 6), MAX);
        assert_eq!(ceiling(BASE, MAX, 40), MAX);
        assert_eq!(ceiling(BASE, MAX, u32::MAX), MAX);
    }

    #[test]
    fn test_ceiling_non_decreasing() {
        let mut previous = Duration::ZERO;
        for attempt in 0..64 {
            let current = ceiling(BASE, MAX, attempt);
            assert!(current >= previous, "attempt {attempt} decreased");
            previous = current;
        }
    }

    #[test]
    fn test_delay_within_jitter_bounds() {
        let mut backoff = Backoff::new(MAX, THRESHOLD);
        let now = Instant::now();
        for expected_attempt in 1..20 {
            let delay = backoff.reconnect_delay_at(BASE, now);
            assert_eq!(backoff.attempt(), expected_attempt);

            let upper = ceiling(BASE, MAX, expected_attempt);
            assert!(delay <= upper, "{delay:?} > {upper:?}");
            assert!(delay >= upper / 2, "{delay:?} < {:?}", upper / 2);
            assert!(delay <= MAX);
        }
    }

    #[test]
    fn test_zero_base_yields_zero() {
        let mut backoff = Backoff::new(MAX, THRESHOLD);
        assert_eq!(backoff.reconnect_delay(Duration::ZERO), Duration::ZERO);
    }

    #[test]
    fn test_stable_connection_resets_attempts() {
        let mut backoff = Backoff::new(MAX, THRESHOLD);
        let start = Instant::now();
        for _ in 0..4 {
            backoff.reconnect_delay_at(BASE, start);
        }
        assert_eq!(backoff.attempt(), 4);

        backoff.set_connected_time(start);
        let delay = backoff.reconnect_delay_at(BASE, start + THRESHOLD);
        assert_eq!(backoff.attempt(), 0);
        assert!(delay <= BASE, "{delay:?} > {BASE:?}");
        assert!(delay >= BASE / 2, "{delay:?} < {:?}", BASE / 2);

        // Counting starts over from there.
        backoff.reconnect_delay_at(BASE, start + THRESHOLD);
        assert_eq!(backoff.attempt(), 1);
    }

    #[test]
    fn test_short_connection_keeps_counting() {
        let mut backoff = Backoff::new(MAX, THRESHOLD);
        let start = Instant::now();
        backoff.reconnect_delay_at(BASE, start);
        backoff.reconnect_delay_at(BASE, start);

        backoff.set_connected_time(start);
        backoff.reconnect_delay_at(BASE, start + Duration::from_secs(1));
        assert_eq!(backoff.attempt(), 3);
    }

    #[test]
    fn test_connected_time_consumed_once() {
        let mut backoff = Backoff::new(MAX, THRESHOLD);
        let start = Instant::now();
        backoff.reconnect_delay_at(BASE, start);
        backoff.set_connected_time(start);

        let later = start + THRESHOLD * 2;
        let delay = backoff.reconnect_delay_at(BASE, later);
        assert_eq!(backoff.attempt(), 0);
        assert!(delay <= BASE);

        // No new connected time recorded, so no further reset.
        backoff.reconnect_delay_at(BASE, later);
        assert_eq!(backoff.attempt(), 1);
    }
}
