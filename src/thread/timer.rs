use std::time::{Duration, Instant};

pub const MIN_INTERVAL: Duration = Duration::from_millis(80);

/// Period of the read check for a delay in seconds; `None` when checks run inline.
pub fn interval_for(delay: f64) -> Option<Duration> {
    if delay.is_nan() || delay <= 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(delay / 2.0)
        .ok()
        .map(|d| d.max(MIN_INTERVAL))
}

/// Repeating deadline for the read check.
#[derive(Debug, Clone, Copy)]
pub struct UnreadTimer {
    interval: Duration,
    due: Instant,
}

impl UnreadTimer {
    pub fn start(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            due: now + interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_due(&self, now: Instant) -> bool {
        now >= self.due
    }

    pub fn reschedule(&mut self, now: Instant) {
        self.due = now + self.interval;
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        self.due.saturating_duration_since(now)
    }
}
