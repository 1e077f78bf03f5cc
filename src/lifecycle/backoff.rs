use std::time::Duration;

/// Growing sleep interval between two polls.
///
/// Each call to [`Backoff::next_sleep()`] returns the current interval and
/// grows it by `growth`, never exceeding `max_sleep`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    interval: Duration,
    max_sleep: Duration,
    growth: f64,
}

impl Backoff {
    /// Create a new backoff. A growth factor below one (or not finite) is
    /// treated as one, and an initial interval larger than `max_sleep` is
    /// capped.
    pub fn new(initial: Duration, max_sleep: Duration, growth: f64) -> Self {
        let growth = if growth.is_finite() && growth >= 1.0 {
            growth
        } else {
            1.0
        };
        Self {
            interval: initial.min(max_sleep),
            max_sleep,
            growth,
        }
    }

    /// The interval the next call to [`Backoff::next_sleep()`] returns.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn max_sleep(&self) -> Duration {
        self.max_sleep
    }

    pub fn next_sleep(&mut self) -> Duration {
        let current = self.interval;
        let grown = current.as_secs_f64() * self.growth;
        self.interval = if grown >= self.max_sleep.as_secs_f64() {
            self.max_sleep
        } else {
            Duration::from_secs_f64(grown)
        };
        current
    }
}
