//! Time source and the per-question countdown.
//!
//! The countdown never decrements: it keeps the instant the question was shown
//! and asks the clock how long ago that was, so late or dropped ticks cannot
//! make it drift.

use std::time::{Duration, Instant};

pub trait Clock {
    fn now(&self) -> Instant;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Countdown for one question, identified by the state's question sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    pub question_seq: u64,
    started_at: Instant,
}

impl Countdown {
    pub fn start(question_seq: u64, clock: &dyn Clock) -> Self {
        Self {
            question_seq,
            started_at: clock.now(),
        }
    }

    pub fn elapsed(&self, clock: &dyn Clock) -> Duration {
        clock.now().saturating_duration_since(self.started_at)
    }

    /// Whole seconds since the question was shown
    pub fn elapsed_secs(&self, clock: &dyn Clock) -> u32 {
        u32::try_from(self.elapsed(clock).as_secs()).unwrap_or(u32::MAX)
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[cfg(test)]
#[derive(Clone)]
pub struct ManualClock {
    origin: Instant,
    offset: std::rc::Rc<std::cell::Cell<Duration>>,
}

#[cfg(test)]
impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Default::default(),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.offset.set(self.offset.get() + by);
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.offset.get()
    }
}
