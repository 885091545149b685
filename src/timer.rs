use std::time::{Duration, Instant};

/// A cancellable, single-shot, resettable delay.
///
/// The timer never fires on its own: owners ask `expired(now)` from their
/// tick or key handler, which keeps every transition on the event loop thread
/// and lets tests drive time explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timer {
    duration: Duration,
    deadline: Option<Instant>,
}

impl Timer {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            deadline: None,
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Starts the delay from `now`. A deadline past what `Instant` can
    /// represent leaves the timer disarmed, so it never fires.
    pub fn arm(&mut self, now: Instant) {
        self.deadline = now.checked_add(self.duration);
    }

    /// Disarm and arm again from `now`.
    pub fn rearm(&mut self, now: Instant) {
        self.disarm();
        self.arm(now);
    }

    pub fn disarm(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// True once `now` has reached the deadline of an armed timer.
    pub fn expired(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }

    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(now))
    }
}
