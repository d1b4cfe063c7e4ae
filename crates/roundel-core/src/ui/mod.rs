//! Minimal UI toolkit for the round display
//!
//! [`Ui`] owns everything the render pump touches: the framebuffer, the
//! panel, the UI timers, the scatter chart, the button indicators and the
//! backlight. It is meant to live inside a
//! [`RenderGuard`](crate::render_guard::RenderGuard); the pump calls
//! [`UiSurface::handle`](crate::pump::UiSurface::handle) on it every tick.

mod chart;
mod flush;
mod indev;
mod timer;

pub use chart::{CHART_X_MAX, CHART_Y_MAX, ChartPoint, ScatterChart, XorShift32};
pub use flush::FlushReady;
pub use indev::{ButtonInputDevice, ButtonState, InputData, InputDevice};
pub use timer::{TimerId, UiTimers};

use embassy_time::Instant;
use embedded_graphics::pixelcolor::{Rgb565, WebColors};
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Circle, PrimitiveStyle, Rectangle};
use log::{debug, error, info};
use thiserror_no_std::Error;

use crate::config::{
    CHART_POINT_COUNT, CHART_UPDATE_PERIOD_MS, DISPLAY_HEIGHT_PX, DISPLAY_WIDTH_PX,
    TOUCH_CHANNEL_COUNT, UI_TIMER_CAPACITY, ms,
};
use crate::framebuffer::FrameBuffer;
use crate::pump::UiSurface;

const CHART_SIZE: u32 = 150;
const INDICATOR_DIAMETER: u32 = 16;
const INDICATOR_OFFSET_X: i32 = 40;
const INDICATOR_Y: i32 = 212;
const INDICATOR_ON: Rgb565 = Rgb565::CSS_DODGER_BLUE;
const INDICATOR_OFF: Rgb565 = Rgb565::CSS_DIM_GRAY;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiError {
    #[error("UI timer table is full")]
    TimerTableFull,
}

/// Display backlight switch.
pub trait Backlight {
    fn set(&mut self, on: bool);
}

/// Backlight state as seen by UI mutators.
pub trait BacklightControl {
    fn backlight(&self) -> bool;

    fn set_backlight(&mut self, on: bool);

    fn toggle_backlight(&mut self) {
        let on = self.backlight();
        self.set_backlight(!on);
    }
}

/// What one pump tick did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UiWork {
    pub input_reads: usize,
    pub timers_fired: usize,
    pub redrawn: bool,
    pub flushed: Option<Rectangle>,
}

pub struct Ui<'a, P, B> {
    panel: P,
    backlight: B,
    backlight_on: bool,
    frame: FrameBuffer,
    flush_ready: &'a FlushReady,
    flush_in_flight: bool,
    timers: UiTimers<UI_TIMER_CAPACITY>,
    chart: ScatterChart<CHART_POINT_COUNT>,
    chart_timer: TimerId,
    input: Option<ButtonInputDevice<'a>>,
    buttons: [ButtonState; TOUCH_CHANNEL_COUNT],
    needs_redraw: bool,
}

impl<'a, P, B> Ui<'a, P, B>
where
    P: DrawTarget<Color = Rgb565>,
    B: Backlight,
{
    /// Build the demo screen: a centered scatter chart refreshed by a timer,
    /// plus one indicator per touch button. The backlight is switched on.
    pub fn new(
        panel: P,
        mut backlight: B,
        flush_ready: &'a FlushReady,
        seed: u32,
        now: Instant,
    ) -> Result<Self, UiError> {
        let screen = Rectangle::new(
            Point::zero(),
            Size::new(DISPLAY_WIDTH_PX as u32, DISPLAY_HEIGHT_PX as u32),
        );
        let chart_area = Rectangle::with_center(screen.center(), Size::new(CHART_SIZE, CHART_SIZE));

        let mut timers = UiTimers::new();
        let chart_timer = timers.add(ms(CHART_UPDATE_PERIOD_MS), now)?;

        backlight.set(true);
        info!(" UI ready, chart at {:?}", chart_area);

        Ok(Self {
            panel,
            backlight,
            backlight_on: true,
            frame: FrameBuffer::default(),
            flush_ready,
            flush_in_flight: false,
            timers,
            chart: ScatterChart::new(chart_area, seed),
            chart_timer,
            input: None,
            buttons: [ButtonState::Released; TOUCH_CHANNEL_COUNT],
            needs_redraw: true,
        })
    }

    /// Attach the queue-fed button input device.
    pub fn with_input(mut self, input: ButtonInputDevice<'a>) -> Self {
        self.input = Some(input);
        self
    }

    pub fn button(&self, key: usize) -> Option<ButtonState> {
        self.buttons.get(key).copied()
    }

    pub fn chart(&self) -> &ScatterChart<CHART_POINT_COUNT> {
        &self.chart
    }

    pub fn frame(&self) -> &FrameBuffer {
        &self.frame
    }

    pub fn panel(&self) -> &P {
        &self.panel
    }

    pub fn timers_mut(&mut self) -> &mut UiTimers<UI_TIMER_CAPACITY> {
        &mut self.timers
    }

    pub fn chart_timer(&self) -> TimerId {
        self.chart_timer
    }

    fn poll_input(&mut self) -> usize {
        let Some(device) = self.input.as_mut() else {
            return 0;
        };

        let mut reads = 0;
        let mut data = InputData::default();
        loop {
            device.read(&mut data);
            reads += 1;
            if let Some(state) = self.buttons.get_mut(data.key as usize)
                && *state != data.state
            {
                debug!(" Button {} {:?}", data.key, data.state);
                *state = data.state;
                self.needs_redraw = true;
            }
            if !data.continue_reading {
                break;
            }
        }
        reads
    }

    fn run_timers(&mut self, now: Instant) -> usize {
        let fired = self.timers.run_due(now);
        for id in &fired {
            if *id == self.chart_timer {
                self.chart.add_random();
                self.needs_redraw = true;
            }
        }
        fired.len()
    }

    fn indicator(&self, key: usize) -> Circle {
        let center_x = DISPLAY_WIDTH_PX as i32 / 2;
        let x = if key == 0 {
            center_x - INDICATOR_OFFSET_X
        } else {
            center_x + INDICATOR_OFFSET_X
        };
        Circle::with_center(Point::new(x, INDICATOR_Y), INDICATOR_DIAMETER)
    }

    fn redraw(&mut self) {
        // Drawing into RAM cannot fail
        let _ = self.chart.draw(&mut self.frame);
        for key in 0..TOUCH_CHANNEL_COUNT {
            let color = match self.buttons[key] {
                ButtonState::Pressed => INDICATOR_ON,
                ButtonState::Released => INDICATOR_OFF,
            };
            let _ = self
                .indicator(key)
                .into_styled(PrimitiveStyle::with_fill(color))
                .draw(&mut self.frame);
        }
        self.needs_redraw = false;
    }

    fn flush(&mut self) -> Option<Rectangle> {
        if self.flush_in_flight {
            if !self.flush_ready.take() {
                return None;
            }
            self.flush_in_flight = false;
        }

        match self.frame.flush(&mut self.panel) {
            Ok(Some(area)) => {
                self.flush_in_flight = true;
                Some(area)
            }
            Ok(None) => None,
            Err(_) => {
                error!(" Panel flush failed, keeping region dirty");
                None
            }
        }
    }
}

impl<P, B: Backlight> BacklightControl for Ui<'_, P, B> {
    fn backlight(&self) -> bool {
        self.backlight_on
    }

    fn set_backlight(&mut self, on: bool) {
        debug!(" Backlight {}", if on { "on" } else { "off" });
        self.backlight.set(on);
        self.backlight_on = on;
    }
}

impl<P, B> UiSurface for Ui<'_, P, B>
where
    P: DrawTarget<Color = Rgb565>,
    B: Backlight,
{
    type Work = UiWork;

    fn handle(&mut self, now: Instant) -> UiWork {
        let input_reads = self.poll_input();
        let timers_fired = self.run_timers(now);

        let redrawn = self.needs_redraw;
        if redrawn {
            self.redraw();
        }

        UiWork {
            input_reads,
            timers_fired,
            redrawn,
            flushed: self.flush(),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::touch::{InputQueue, QueuedTouch};
    use core::convert::Infallible;
    use embassy_time::Duration;

    /// Panel that records flushed areas and reports completion on demand
    pub(crate) struct TestPanel<'a> {
        pub flushes: std::vec::Vec<Rectangle>,
        pub ready: Option<&'a FlushReady>,
    }

    impl<'a> TestPanel<'a> {
        pub fn new() -> Self {
            Self {
                flushes: std::vec::Vec::new(),
                ready: None,
            }
        }

        /// Completes every transfer immediately
        pub fn signalling(ready: &'a FlushReady) -> Self {
            Self {
                flushes: std::vec::Vec::new(),
                ready: Some(ready),
            }
        }
    }

    impl OriginDimensions for TestPanel<'_> {
        fn size(&self) -> Size {
            Size::new(DISPLAY_WIDTH_PX as u32, DISPLAY_HEIGHT_PX as u32)
        }
    }

    impl DrawTarget for TestPanel<'_> {
        type Color = Rgb565;
        type Error = Infallible;

        fn draw_iter<I>(&mut self, _pixels: I) -> Result<(), Self::Error>
        where
            I: IntoIterator<Item = Pixel<Self::Color>>,
        {
            Ok(())
        }

        fn fill_contiguous<I>(&mut self, area: &Rectangle, _colors: I) -> Result<(), Self::Error>
        where
            I: IntoIterator<Item = Self::Color>,
        {
            self.flushes.push(*area);
            if let Some(ready) = self.ready {
                ready.notify();
            }
            Ok(())
        }
    }

    #[derive(Default)]
    pub(crate) struct TestBacklight {
        pub on: Option<bool>,
    }

    impl Backlight for TestBacklight {
        fn set(&mut self, on: bool) {
            self.on = Some(on);
        }
    }

    fn at(t_ms: u64) -> Instant {
        Instant::from_millis(t_ms)
    }

    #[test]
    fn test_first_tick_draws_and_flushes() {
        let ready = FlushReady::new();
        let mut ui = Ui::new(TestPanel::new(), TestBacklight::default(), &ready, 1, at(0)).unwrap();

        let work = ui.handle(at(0));

        assert!(work.redrawn);
        assert!(work.flushed.is_some());
        assert_eq!(ui.panel().flushes.len(), 1);
        assert!(!ui.frame().is_dirty());
        assert!(ui.backlight());
    }

    #[test]
    fn test_next_flush_waits_for_completion() {
        let ready = FlushReady::new();
        let queue = InputQueue::new();
        let mut ui = Ui::new(TestPanel::new(), TestBacklight::default(), &ready, 1, at(0))
            .unwrap()
            .with_input(ButtonInputDevice::new(&queue));
        ui.handle(at(0));

        queue
            .try_send(QueuedTouch {
                channel: 0,
                pressed: true,
            })
            .unwrap();
        let work = ui.handle(at(1));
        assert!(work.redrawn);
        assert_eq!(work.flushed, None);
        assert!(ui.frame().is_dirty());

        ready.notify();
        let work = ui.handle(at(2));
        assert!(work.flushed.is_some());
        assert_eq!(ui.panel().flushes.len(), 2);
    }

    #[test]
    fn test_input_updates_indicators() {
        let ready = FlushReady::new();
        let queue = InputQueue::new();
        let mut ui = Ui::new(
            TestPanel::signalling(&ready),
            TestBacklight::default(),
            &ready,
            1,
            at(0),
        )
        .unwrap()
        .with_input(ButtonInputDevice::new(&queue));

        for (channel, pressed) in [(1, true), (0, true), (1, false)] {
            queue.try_send(QueuedTouch { channel, pressed }).unwrap();
        }
        let work = ui.handle(at(0));

        assert_eq!(work.input_reads, 3);
        assert_eq!(ui.button(0), Some(ButtonState::Pressed));
        assert_eq!(ui.button(1), Some(ButtonState::Released));
    }

    #[test]
    fn test_chart_timer_adds_points() {
        let ready = FlushReady::new();
        let mut ui = Ui::new(
            TestPanel::signalling(&ready),
            TestBacklight::default(),
            &ready,
            9,
            at(0),
        )
        .unwrap();
        ui.handle(at(0));
        let before: std::vec::Vec<ChartPoint> = ui.chart().points().copied().collect();

        let work = ui.handle(at(0) + Duration::from_millis(CHART_UPDATE_PERIOD_MS));

        assert_eq!(work.timers_fired, 1);
        assert!(work.redrawn);
        let after: std::vec::Vec<ChartPoint> = ui.chart().points().copied().collect();
        assert_eq!(after.len(), CHART_POINT_COUNT);
        assert_eq!(&after[..CHART_POINT_COUNT - 1], &before[1..]);
    }

    #[test]
    fn test_paused_chart_timer_freezes_chart() {
        let ready = FlushReady::new();
        let mut ui = Ui::new(
            TestPanel::signalling(&ready),
            TestBacklight::default(),
            &ready,
            4,
            at(0),
        )
        .unwrap();
        ui.handle(at(0));
        let chart_timer = ui.chart_timer();
        ui.timers_mut().pause(chart_timer);

        let work = ui.handle(at(3 * CHART_UPDATE_PERIOD_MS));
        assert_eq!(work.timers_fired, 0);
        assert!(!work.redrawn);

        ui.timers_mut().resume(chart_timer, at(3 * CHART_UPDATE_PERIOD_MS));
        let work = ui.handle(at(4 * CHART_UPDATE_PERIOD_MS));
        assert_eq!(work.timers_fired, 1);
    }

    #[test]
    fn test_idle_tick_does_nothing() {
        let ready = FlushReady::new();
        let mut ui = Ui::new(
            TestPanel::signalling(&ready),
            TestBacklight::default(),
            &ready,
            1,
            at(0),
        )
        .unwrap();
        ui.handle(at(0));

        assert_eq!(ui.handle(at(5)), UiWork::default());
    }

    #[test]
    fn test_backlight_follows_ui_state() {
        let ready = FlushReady::new();
        let mut ui = Ui::new(TestPanel::new(), TestBacklight::default(), &ready, 1, at(0)).unwrap();

        ui.toggle_backlight();
        assert!(!ui.backlight());
        assert_eq!(ui.backlight.on, Some(false));

        ui.set_backlight(true);
        assert!(ui.backlight());
        assert_eq!(ui.backlight.on, Some(true));
    }
}
