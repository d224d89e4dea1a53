//! Sleep timer: counts down from a chosen duration and reports expiry.
//!
//! Time is passed in explicitly so the countdown can be driven by a frame
//! loop in the browser and by fixed instants in tests. Remaining time is
//! derived from the start instant on every query, so it does not drift with
//! frame timing.

use instant::Instant;
use std::time::Duration;

#[derive(Clone, Copy, Debug)]
pub struct SleepTimer {
    duration: Duration,
    started_at: Instant,
}

impl SleepTimer {
    pub fn start(duration: Duration, now: Instant) -> Self {
        Self {
            duration,
            started_at: now,
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        if now <= self.started_at {
            return self.duration;
        }
        self.duration
            .saturating_sub(now.duration_since(self.started_at))
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        self.remaining(now).is_zero()
    }
}

/// Countdown text: `H:MM:SS` once an hour or more remains, otherwise `M:SS`.
pub fn format_time(ms: u64) -> String {
    let total_seconds = ms / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

/// Label for a timer choice, e.g. "15 min", "1 hr", "2 hrs".
pub fn format_duration(ms: u64) -> String {
    let minutes = ms / (60 * 1000);
    let hours = minutes / 60;
    match hours {
        0 => format!("{} min", minutes),
        1 => "1 hr".to_string(),
        h => format!("{} hrs", h),
    }
}
