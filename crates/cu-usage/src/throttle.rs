use tokio::time::{Duration, Instant};

/// Minimum-interval gate between pipeline runs.
///
/// Tracks when the last run *started*; failed runs count the same as
/// successful ones.
#[derive(Debug)]
pub struct Throttle {
    min_interval: Duration,
    last_start: Option<Instant>,
}

impl Throttle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_start: None,
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub fn last_start(&self) -> Option<Instant> {
        self.last_start
    }

    /// Whether a run may start at `now`.
    pub fn is_ready(&self, now: Instant) -> bool {
        match self.last_start {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.min_interval,
        }
    }

    pub fn mark_started(&mut self, now: Instant) {
        self.last_start = Some(now);
    }
}
