//! Rolling window of connection attempts
//!
//! Opening a stream and losing one mid-way both count as an attempt. At most
//! `limit` attempts may fall inside any trailing `window`. Attempts under the
//! limit are not spaced out: a burst of `limit` attempts in a few milliseconds
//! is allowed, and the next one waits until the oldest leaves the window.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Timestamps of recent connection attempts, oldest first
#[derive(Clone, Debug)]
pub struct RetryHistory {
    attempts: VecDeque<Instant>,
    limit: usize,
    window: Duration,
}

impl RetryHistory {
    /// Allow `limit` attempts per `window` (a zero limit is treated as 1)
    #[must_use]
    pub fn new(limit: usize, window: Duration) -> Self {
        let limit = limit.max(1);
        Self {
            attempts: VecDeque::with_capacity(limit),
            limit,
            window,
        }
    }

    /// Forget attempts that are at least one window old
    pub fn prune(&mut self, now: Instant) {
        while let Some(&oldest) = self.attempts.front() {
            if now.saturating_duration_since(oldest) < self.window {
                break;
            }
            self.attempts.pop_front();
        }
    }

    /// Whether another attempt fits in the window
    #[must_use]
    pub fn has_capacity(&self) -> bool {
        self.attempts.len() < self.limit
    }

    /// Record an attempt made at `now`
    pub fn record(&mut self, now: Instant) {
        self.attempts.push_back(now);
    }

    /// Time until the oldest attempt leaves the window
    ///
    /// Zero when the history is empty or the oldest entry already expired.
    /// A window too long to add to an [`Instant`] waits the full window.
    #[must_use]
    pub fn wait_time(&self, now: Instant) -> Duration {
        self.attempts.front().map_or(Duration::ZERO, |&oldest| {
            oldest
                .checked_add(self.window)
                .map_or(self.window, |until| until.saturating_duration_since(now))
        })
    }

    /// Attempts currently in the window
    #[must_use]
    pub fn len(&self) -> usize {
        self.attempts.len()
    }

    /// Whether no attempt is in the window
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }

    /// Maximum attempts per window
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE: Duration = Duration::from_secs(60);

    #[test]
    fn test_burst_up_to_limit_is_allowed() {
        let start = Instant::now();
        let mut history = RetryHistory::new(3, MINUTE);

        for i in 0..3 {
            assert!(history.has_capacity());
            history.record(start + Duration::from_millis(i));
        }
        assert!(!history.has_capacity());
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn test_wait_time_counts_from_oldest_attempt() {
        let start = Instant::now();
        let mut history = RetryHistory::new(2, MINUTE);
        history.record(start);
        history.record(start + Duration::from_secs(10));

        let now = start + Duration::from_secs(15);
        assert_eq!(history.wait_time(now), Duration::from_secs(45));
    }

    #[test]
    fn test_prune_removes_entries_at_window_edge() {
        let start = Instant::now();
        let mut history = RetryHistory::new(2, MINUTE);
        history.record(start);
        history.record(start + Duration::from_secs(30));

        history.prune(start + Duration::from_secs(59));
        assert_eq!(history.len(), 2);

        history.prune(start + MINUTE);
        assert_eq!(history.len(), 1);
        assert!(history.has_capacity());
    }

    #[test]
    fn test_huge_window_does_not_overflow() {
        let start = Instant::now();
        let mut history = RetryHistory::new(1, Duration::MAX);
        history.record(start);
        history.prune(start + MINUTE);

        assert!(!history.has_capacity());
        assert_eq!(history.wait_time(start + MINUTE), Duration::MAX);
    }

    #[test]
    fn test_empty_history() {
        let history = RetryHistory::new(0, MINUTE);
        assert_eq!(history.limit(), 1);
        assert!(history.is_empty());
        assert_eq!(history.wait_time(Instant::now()), Duration::ZERO);
    }

    #[test]
    fn test_never_more_than_limit_in_any_window() {
        let start = Instant::now();
        let mut history = RetryHistory::new(2, MINUTE);
        let mut made = Vec::new();

        // Attempt every second for five simulated minutes
        for second in 0..300 {
            let now = start + Duration::from_secs(second);
            history.prune(now);
            if history.has_capacity() {
                history.record(now);
                made.push(second);
            }
        }

        for (i, &t) in made.iter().enumerate() {
            let in_window = made[i..].iter().take_while(|&&u| u < t + 60).count();
            assert!(in_window <= 2, "{in_window} attempts in window starting at {t}s");
        }
        assert_eq!(made.len(), 10);
    }
}
