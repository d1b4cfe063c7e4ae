//! Hardware-independent core library for roundel
//!
//! This crate contains the platform-agnostic logic of the roundel touch
//! display firmware: the capacitive touch debouncer and its event sinks, the
//! application event bus, the render guard that serializes access to UI state,
//! the periodic render pump, a small UI toolkit, the persisted environment and
//! the console command parser.
//!
//! It is `#![no_std]` so it compiles on both the ESP32 target and desktop
//! hosts (for the simulator and tests).

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod app;
pub mod config;
pub mod console;
pub mod env;
pub mod event_bus;
pub mod framebuffer;
pub mod pump;
pub mod render_guard;
pub mod touch;
pub mod ui;
