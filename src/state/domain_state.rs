use std::time::{Duration, Instant};

/// Tracks per-host counters used by the frontier and the politeness delay
#[derive(Debug, Clone, Default)]
pub struct DomainState {
    /// URLs on this host accepted into the frontier
    pub pages_admitted: u32,

    /// URLs on this host dequeued for loading
    pub pages_visited: u32,

    /// When the engine last loaded a page on this host
    pub last_request_time: Option<Instant>,
}

impl DomainState {
    /// Creates a new DomainState with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks whether another page on this host may be admitted
    pub fn has_capacity(&self, max_pages: u32) -> bool {
        self.pages_admitted < max_pages
    }

    pub fn record_admission(&mut self) {
        self.pages_admitted += 1;
    }

    pub fn record_visit(&mut self) {
        self.pages_visited += 1;
    }

    /// Records that a page load was issued
    pub fn record_request(&mut self, now: Instant) {
        self.last_request_time = Some(now);
    }

    /// Time left before the next load is allowed, or `None` if allowed now
    pub fn time_until_next_request(&self, min_delay: Duration, now: Instant) -> Option<Duration> {
        let last = self.last_request_time?;
        let elapsed = now.duration_since(last);
        if elapsed < min_delay {
            Some(min_delay - elapsed)
        } else {
            None
        }
    }
}
