//! Deterministic sampler that replays scripted presses.
//!
//! Used by the simulator and the tests in place of the capacitive touch
//! peripheral. The sampler has no clock of its own: the caller moves it to a
//! point in time with [`ScriptedSampler::seek`] before polling.
//!
//! Only built for tests and with the `scripted` feature.

use embassy_time::Instant;

use super::{TouchPad, TouchSampler};

/// Raw level reported by an untouched pad
pub const SCRIPT_IDLE_LEVEL: u32 = 20_000;

/// Raw level reported by a touched pad
pub const SCRIPT_TOUCH_LEVEL: u32 = 60_000;

/// A pad held down for `duration_ms` starting at `start_ms` (relative to the
/// sampler origin).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Press {
    pub pad: TouchPad,
    pub start_ms: u64,
    pub duration_ms: u64,
}

impl Press {
    pub const fn new(pad: TouchPad, start_ms: u64, duration_ms: u64) -> Self {
        Self {
            pad,
            start_ms,
            duration_ms,
        }
    }

    fn covers(&self, pad: TouchPad, t_ms: u64) -> bool {
        self.pad == pad && t_ms >= self.start_ms && t_ms < self.start_ms + self.duration_ms
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptError {
    /// The script marks this pad unreadable at the current time
    Dropout(TouchPad),
}

pub struct ScriptedSampler<'a> {
    presses: &'a [Press],
    dropouts: &'a [Press],
    origin: Instant,
    position: Instant,
    idle_level: u32,
    touch_level: u32,
    reads: u32,
}

impl<'a> ScriptedSampler<'a> {
    pub const fn new(presses: &'a [Press]) -> Self {
        Self {
            presses,
            dropouts: &[],
            origin: Instant::from_ticks(0),
            position: Instant::from_ticks(0),
            idle_level: SCRIPT_IDLE_LEVEL,
            touch_level: SCRIPT_TOUCH_LEVEL,
            reads: 0,
        }
    }

    /// Windows during which reads of a pad fail.
    pub const fn with_dropouts(mut self, dropouts: &'a [Press]) -> Self {
        self.dropouts = dropouts;
        self
    }

    pub const fn with_levels(mut self, idle_level: u32, touch_level: u32) -> Self {
        self.idle_level = idle_level;
        self.touch_level = touch_level;
        self
    }

    /// Time that script offsets are measured from.
    pub const fn with_origin(mut self, origin: Instant) -> Self {
        self.origin = origin;
        self.position = origin;
        self
    }

    /// Move the script to `now`.
    pub fn seek(&mut self, now: Instant) {
        self.position = now;
    }

    /// Number of `read_raw` calls so far
    pub fn reads(&self) -> u32 {
        self.reads
    }

    fn elapsed_ms(&self) -> u64 {
        self.position.saturating_duration_since(self.origin).as_millis()
    }
}

impl TouchSampler for ScriptedSampler<'_> {
    type Error = ScriptError;

    fn read_raw(&mut self, pad: TouchPad) -> Result<u32, Self::Error> {
        self.reads += 1;
        let t_ms = self.elapsed_ms();

        if self.dropouts.iter().any(|d| d.covers(pad, t_ms)) {
            return Err(ScriptError::Dropout(pad));
        }

        if self.presses.iter().any(|p| p.covers(pad, t_ms)) {
            Ok(self.touch_level)
        } else {
            Ok(self.idle_level)
        }
    }
}
