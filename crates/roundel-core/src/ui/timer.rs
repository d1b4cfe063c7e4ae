//! Periodic UI timers, run by the render pump while it holds the guard.

use embassy_time::{Duration, Instant};
use heapless::Vec;

use super::UiError;

/// Handle returned by [`UiTimers::add`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u8);

#[derive(Debug, Clone, Copy)]
struct Entry {
    id: TimerId,
    period: Duration,
    next_due: Instant,
    paused: bool,
}

pub struct UiTimers<const N: usize> {
    entries: Vec<Entry, N>,
    next_id: u8,
}

impl<const N: usize> Default for UiTimers<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> UiTimers<N> {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
        }
    }

    /// Start a timer that first fires one `period` after `now`.
    pub fn add(&mut self, period: Duration, now: Instant) -> Result<TimerId, UiError> {
        let id = TimerId(self.next_id);
        self.entries
            .push(Entry {
                id,
                period,
                next_due: now + period,
                paused: false,
            })
            .map_err(|_| UiError::TimerTableFull)?;
        self.next_id = self.next_id.wrapping_add(1);
        Ok(id)
    }

    pub fn remove(&mut self, id: TimerId) -> bool {
        match self.entries.iter().position(|e| e.id == id) {
            Some(index) => {
                self.entries.swap_remove(index);
                true
            }
            None => false,
        }
    }

    pub fn pause(&mut self, id: TimerId) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.id == id) {
            entry.paused = true;
        }
    }

    /// Resume a paused timer; it next fires one period after `now`.
    pub fn resume(&mut self, id: TimerId, now: Instant) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.id == id) {
            entry.paused = false;
            entry.next_due = now + entry.period;
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Collect the timers due at `now` and reschedule them.
    ///
    /// A timer fires at most once per call even if several periods were
    /// missed (e.g. while the pump skipped ticks); it is then rescheduled
    /// one period after `now`.
    pub fn run_due(&mut self, now: Instant) -> Vec<TimerId, N> {
        let mut fired = Vec::new();
        for entry in self.entries.iter_mut().filter(|e| !e.paused) {
            if now >= entry.next_due {
                entry.next_due = now + entry.period;
                fired.push(entry.id).ok();
            }
        }
        fired
    }
}
