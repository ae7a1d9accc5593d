use std::time::{Duration, Instant};

/// Minimum spacing between outbound requests of one fetcher
///
/// Tracks the instant of the last request. A zero period disables the
/// cooldown. The state lives as long as its fetcher and is never reset.
#[derive(Debug, Clone)]
pub struct Cooldown {
    period: Duration,
    last_request: Option<Instant>,
}

impl Cooldown {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            last_request: None,
        }
    }

    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Instant the last request was recorded, if any
    pub fn last_request(&self) -> Option<Instant> {
        self.last_request
    }

    /// Calculates the time until the next request may be issued
    ///
    /// Returns None if a request can be made now.
    pub fn time_until_ready(&self, now: Instant) -> Option<Duration> {
        let last = self.last_request?;
        let ready_at = last + self.period;
        if now < ready_at {
            Some(ready_at - now)
        } else {
            None
        }
    }

    /// Records that a request was made
    pub fn record_request(&mut self, now: Instant) {
        self.last_request = Some(now);
    }
}

impl Default for Cooldown {
    fn default() -> Self {
        Self::disabled()
    }
}
