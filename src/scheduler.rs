//! Deferred actions: a small timeline of (due instant, action).
//!
//! Cancelling drops everything pending, so nothing fires against a state
//! that has since moved on.

use std::time::{Duration, Instant};

use crate::clock::Clock;
use crate::game::Action;

/// One deferred event: at this instant, dispatch this action.
#[derive(Debug)]
pub struct ScheduledAction {
    pub due: Instant,
    pub action: Action,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    pending: Vec<ScheduledAction>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, clock: &dyn Clock, after: Duration, action: Action) {
        self.pending.push(ScheduledAction {
            due: clock.now() + after,
            action,
        });
        self.pending.sort_by_key(|s| s.due);
    }

    /// Drop everything scheduled so far
    pub fn cancel_all(&mut self) {
        if !self.pending.is_empty() {
            log::debug!("cancelling {} deferred action(s)", self.pending.len());
        }
        self.pending.clear();
    }

    #[cfg(test)]
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }

    /// Remove and return the actions whose time has come, earliest first.
    pub fn take_due(&mut self, clock: &dyn Clock) -> Vec<Action> {
        let now = clock.now();
        let split = self.pending.partition_point(|s| s.due <= now);
        self.pending.drain(..split).map(|s| s.action).collect()
    }
}
