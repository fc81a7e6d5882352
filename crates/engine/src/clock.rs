//! Wall-clock sources and clock discontinuity detection.

use std::sync::Mutex;
use std::time::{Duration as StdDuration, Instant};

use chrono::{Duration, Local, NaiveDateTime};

/// Source of local wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<NaiveDateTime>,
}

impl ManualClock {
    pub fn new(start: NaiveDateTime) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, time: NaiveDateTime) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = time;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Detects wall-clock jumps by comparing elapsed wall time against elapsed
/// monotonic time between two checks.
pub struct ClockWatch {
    threshold: Duration,
    last_wall: NaiveDateTime,
    last_mono: Instant,
}

impl ClockWatch {
    pub fn new(threshold: StdDuration, wall: NaiveDateTime, mono: Instant) -> Self {
        Self {
            threshold: Duration::from_std(threshold).unwrap_or_else(|_| Duration::seconds(60)),
            last_wall: wall,
            last_mono: mono,
        }
    }

    /// Record a new sample. Returns the observed drift when it exceeds the
    /// threshold in either direction.
    pub fn check(&mut self, wall: NaiveDateTime, mono: Instant) -> Option<Duration> {
        let wall_elapsed = wall - self.last_wall;
        let mono_elapsed = Duration::from_std(mono.saturating_duration_since(self.last_mono))
            .unwrap_or_else(|_| Duration::zero());
        self.last_wall = wall;
        self.last_mono = mono;

        let drift = wall_elapsed - mono_elapsed;
        if drift > self.threshold || drift < -self.threshold {
            Some(drift)
        } else {
            None
        }
    }
}
