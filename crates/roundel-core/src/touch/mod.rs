//! Capacitive touch input
//!
//! Raw pad intensities are sampled at a fixed cadence by a [`Debouncer`],
//! which turns them into clean [`TouchEvent`]s. Events are handed to an
//! [`EventSink`]; the sink decides both where events go and which detection
//! mode the debouncer runs in:
//!
//! - [`BusSink`] posts short/long presses to the app event bus
//!   ([`DetectionMode::LongPress`]).
//! - [`QueueSink`] pushes raw press/release edges to the bounded queue that
//!   feeds the UI input device ([`DetectionMode::Edges`]).

mod debouncer;
#[cfg(any(test, feature = "scripted"))]
mod scripted;
mod sink;
mod task;

pub use debouncer::{ChannelState, DebounceConfig, Debouncer, TickEvents};
#[cfg(any(test, feature = "scripted"))]
pub use scripted::{Press, SCRIPT_IDLE_LEVEL, SCRIPT_TOUCH_LEVEL, ScriptError, ScriptedSampler};
pub use sink::{BusSink, InputQueue, QueueSink, QueuedTouch};
pub use task::TouchInputTask;

use embassy_time::Instant;

/// Identifier of a physical touch pad on the sensor peripheral
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TouchPad(pub u8);

/// Kind of transition reported for a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchEventKind {
    /// Press edge (edge detection only)
    Pressed,
    /// Release edge, or a short press in long-press detection
    Released,
    /// Pad held beyond the long-press window
    LongPress,
}

/// A debounced transition on one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TouchEvent {
    /// Channel index (position in the pad list, not the pad number)
    pub channel: u8,
    pub kind: TouchEventKind,
    pub timestamp: Instant,
}

impl TouchEvent {
    pub const fn new(channel: u8, kind: TouchEventKind, timestamp: Instant) -> Self {
        Self {
            channel,
            kind,
            timestamp,
        }
    }
}

/// How the debouncer classifies presses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionMode {
    /// Report a short press on release, or a single long press while held
    LongPress,
    /// Report every press and release edge
    Edges,
}

/// Source of raw touch intensities.
pub trait TouchSampler {
    type Error: core::fmt::Debug;

    /// One-time configuration of the given pads before polling starts
    fn init(&mut self, _pads: &[TouchPad]) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Read the current raw intensity of a pad.
    ///
    /// Errors are treated as transient: the channel is simply not evaluated
    /// on this tick.
    fn read_raw(&mut self, pad: TouchPad) -> Result<u32, Self::Error>;
}

/// Destination of debounced touch events.
#[allow(async_fn_in_trait)]
pub trait EventSink {
    /// Detection mode the debouncer must run in to feed this sink
    const MODE: DetectionMode;

    /// Hand one event to the consumer side.
    async fn deliver(&mut self, event: TouchEvent);
}
