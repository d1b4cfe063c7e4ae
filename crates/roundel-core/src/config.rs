//! Compile-time configuration for roundel
//!
//! Timing values are expressed in milliseconds and converted to
//! [`Duration`]s where the runtime needs them.

use embassy_time::Duration;

use crate::touch::TouchPad;

// =============================================================================
// Touch input
// =============================================================================

/// Number of capacitive touch buttons on the board.
pub const TOUCH_CHANNEL_COUNT: usize = 2;

/// Physical touch pads, in channel index order (0 = left, 1 = right).
pub const TOUCH_PADS: [TouchPad; TOUCH_CHANNEL_COUNT] = [TouchPad(2), TouchPad(1)];

/// Raw intensity above which a pad counts as pressed.
///
/// One threshold for every pad; there is no per-pad calibration.
pub const TOUCH_PRESSED_THRESHOLD: u32 = 35_000;

/// Quiet period after any transition before a pad is evaluated again.
pub const TOUCH_DEBOUNCE_MS: u64 = 100;

/// How long a pad must stay pressed before a long press is reported.
pub const TOUCH_LONG_PRESS_MS: u64 = 1_000;

/// Sleep between two polls of the touch pads.
pub const TOUCH_POLL_PERIOD_MS: u64 = 10;

/// Delay before the touch sensor is configured at task start.
pub const TOUCH_STARTUP_DELAY_MS: u64 = 1_000;

/// Delay after configuring the sensor so the first readings are valid.
pub const TOUCH_SETTLE_DELAY_MS: u64 = 250;

/// Capacity of the queue feeding the UI input device.
pub const INPUT_QUEUE_CAPACITY: usize = 8;

// =============================================================================
// App event bus
// =============================================================================

/// Depth of the application event channel
pub const APP_EVENT_CAPACITY: usize = 10;

/// Subscribers of the app event channel (the app event loop)
pub const APP_EVENT_SUBSCRIBERS: usize = 1;

/// Publishers of the app event channel (the touch input task)
pub const APP_EVENT_PUBLISHERS: usize = 1;

/// Maximum handlers registered on one app event loop
pub const APP_EVENT_HANDLERS: usize = 8;

/// How long the main loop lets the app event loop run per iteration
pub const APP_EVENT_LOOP_SLICE_MS: u64 = 1_000;

// =============================================================================
// Display and rendering
// =============================================================================

/// Round GC9A01 panel, 240x240.
pub const DISPLAY_WIDTH_PX: u16 = 240;
pub const DISPLAY_HEIGHT_PX: u16 = 240;

/// Period of the render pump loop.
pub const RENDER_PUMP_PERIOD_MS: u64 = 10;

/// How long the render pump waits for the render guard before skipping a tick.
pub const RENDER_ACQUIRE_TIMEOUT_MS: u64 = 10;

/// Maximum number of UI timers.
pub const UI_TIMER_CAPACITY: usize = 8;

/// Number of points kept by the scatter chart.
pub const CHART_POINT_COUNT: usize = 50;

/// Period of the chart's data timer.
pub const CHART_UPDATE_PERIOD_MS: u64 = 100;

// =============================================================================
// Environment
// =============================================================================

/// NTP server used when none is stored.
pub const DEFAULT_NTP_SERVER: &str = "pool.ntp.org";

/// Maximum length of any stored environment string.
pub const ENV_VALUE_LEN: usize = 64;

/// Size of the encoded environment record buffer.
pub const ENV_RECORD_LEN: usize = 2 * ENV_VALUE_LEN + 8;

// =============================================================================
// Console
// =============================================================================

/// Maximum length of a console command line.
pub const CONSOLE_MAX_LINE: usize = 256;

pub(crate) const fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}
