use embassy_time::{Duration, Instant};
use heapless::Vec;
use log::{debug, trace};

use super::{DetectionMode, TouchEvent, TouchEventKind, TouchPad, TouchSampler};
use crate::config::{
    TOUCH_DEBOUNCE_MS, TOUCH_LONG_PRESS_MS, TOUCH_POLL_PERIOD_MS, TOUCH_PRESSED_THRESHOLD,
    TOUCH_SETTLE_DELAY_MS, TOUCH_STARTUP_DELAY_MS, ms,
};

/// Events produced by one poll tick, in ascending channel order.
///
/// Every channel emits at most one event per tick, so `N` slots always suffice.
pub type TickEvents<const N: usize> = Vec<TouchEvent, N>;

/// Debouncer timing and threshold configuration
#[derive(Debug, Clone, Copy)]
pub struct DebounceConfig {
    pressed_threshold: u32,
    debounce_window: Duration,
    long_press_window: Duration,
    poll_period: Duration,
    startup_delay: Duration,
    settle_delay: Duration,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            pressed_threshold: TOUCH_PRESSED_THRESHOLD,
            debounce_window: ms(TOUCH_DEBOUNCE_MS),
            long_press_window: ms(TOUCH_LONG_PRESS_MS),
            poll_period: ms(TOUCH_POLL_PERIOD_MS),
            startup_delay: ms(TOUCH_STARTUP_DELAY_MS),
            settle_delay: ms(TOUCH_SETTLE_DELAY_MS),
        }
    }
}

impl DebounceConfig {
    pub const fn with_pressed_threshold(mut self, pressed_threshold: u32) -> Self {
        self.pressed_threshold = pressed_threshold;
        self
    }

    pub const fn with_debounce_window(mut self, debounce_window: Duration) -> Self {
        self.debounce_window = debounce_window;
        self
    }

    pub const fn with_long_press_window(mut self, long_press_window: Duration) -> Self {
        self.long_press_window = long_press_window;
        self
    }

    pub const fn with_poll_period(mut self, poll_period: Duration) -> Self {
        self.poll_period = poll_period;
        self
    }

    /// Delays around sampler initialisation at task start.
    pub const fn with_startup_delays(mut self, startup: Duration, settle: Duration) -> Self {
        self.startup_delay = startup;
        self.settle_delay = settle;
        self
    }

    pub const fn pressed_threshold(&self) -> u32 {
        self.pressed_threshold
    }

    pub const fn debounce_window(&self) -> Duration {
        self.debounce_window
    }

    pub const fn long_press_window(&self) -> Duration {
        self.long_press_window
    }

    pub const fn poll_period(&self) -> Duration {
        self.poll_period
    }

    pub const fn startup_delay(&self) -> Duration {
        self.startup_delay
    }

    pub const fn settle_delay(&self) -> Duration {
        self.settle_delay
    }
}

/// Debounce state of one touch channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelState {
    pressed: bool,
    long_press_fired: bool,
    /// Time of the last press or release edge; `None` until the first edge
    last_transition: Option<Instant>,
}

impl ChannelState {
    pub const fn is_pressed(&self) -> bool {
        self.pressed
    }

    pub const fn long_press_fired(&self) -> bool {
        self.long_press_fired
    }

    pub const fn last_transition(&self) -> Option<Instant> {
        self.last_transition
    }

    fn in_quiet_period(&self, now: Instant, window: Duration) -> bool {
        matches!(self.last_transition, Some(t) if now.saturating_duration_since(t) < window)
    }

    fn held_for(&self, now: Instant) -> Duration {
        self.last_transition
            .map(|t| now.saturating_duration_since(t))
            .unwrap_or(Duration::from_ticks(0))
    }

    fn record_edge(&mut self, pressed: bool, now: Instant) {
        self.pressed = pressed;
        self.long_press_fired = false;
        self.last_transition = Some(now);
    }

    /// Short press on release, single long press while held.
    fn step_long_press(
        &mut self,
        channel: u8,
        pressed: bool,
        now: Instant,
        long_press_window: Duration,
    ) -> Option<TouchEvent> {
        match (self.pressed, pressed) {
            (false, true) => {
                self.record_edge(true, now);
                None
            }
            (true, true) => {
                if !self.long_press_fired && self.held_for(now) > long_press_window {
                    debug!(" [{}] Long press", channel);
                    self.long_press_fired = true;
                    Some(TouchEvent::new(channel, TouchEventKind::LongPress, now))
                } else {
                    None
                }
            }
            (true, false) => {
                let event = if self.long_press_fired {
                    None
                } else {
                    debug!(" [{}] Short press", channel);
                    Some(TouchEvent::new(channel, TouchEventKind::Released, now))
                };
                debug!(
                    " [{}] Released after {} ms",
                    channel,
                    self.held_for(now).as_millis()
                );
                self.record_edge(false, now);
                event
            }
            (false, false) => None,
        }
    }

    /// One event per edge.
    fn step_edges(&mut self, channel: u8, pressed: bool, now: Instant) -> Option<TouchEvent> {
        if pressed == self.pressed {
            return None;
        }

        self.record_edge(pressed, now);
        let kind = if pressed {
            TouchEventKind::Pressed
        } else {
            TouchEventKind::Released
        };
        debug!(" [{}] {:?}", channel, kind);
        Some(TouchEvent::new(channel, kind, now))
    }
}

/// Turns raw pad intensities into debounced transition events.
///
/// The debouncer owns the per-channel state; nothing else reads or writes it.
/// Call [`Debouncer::poll`] once per poll period with a monotonic timestamp.
///
/// Channel ids are `u8`, so `N` is limited to 256 channels at compile time.
pub struct Debouncer<S, const N: usize> {
    sampler: S,
    pads: [TouchPad; N],
    channels: [ChannelState; N],
    config: DebounceConfig,
    mode: DetectionMode,
}

impl<S, const N: usize> Debouncer<S, N>
where
    S: TouchSampler,
{
    pub fn new(sampler: S, pads: [TouchPad; N], config: DebounceConfig, mode: DetectionMode) -> Self {
        const { assert!(N <= u8::MAX as usize + 1, "touch channel ids must fit in a u8") };
        Self {
            sampler,
            pads,
            channels: [ChannelState::default(); N],
            config,
            mode,
        }
    }

    /// Configure the sampler for this debouncer's pads.
    pub fn init_sampler(&mut self) -> Result<(), S::Error> {
        self.sampler.init(&self.pads)
    }

    pub fn config(&self) -> &DebounceConfig {
        &self.config
    }

    pub fn mode(&self) -> DetectionMode {
        self.mode
    }

    pub fn channel(&self, index: usize) -> Option<&ChannelState> {
        self.channels.get(index)
    }

    pub fn sampler_mut(&mut self) -> &mut S {
        &mut self.sampler
    }

    /// Evaluate every channel once, in ascending index order.
    pub fn poll(&mut self, now: Instant) -> TickEvents<N> {
        let mut events = TickEvents::new();
        for index in 0..N {
            if let Some(event) = self.poll_channel(index, now) {
                events.push(event).ok();
            }
        }
        events
    }

    fn poll_channel(&mut self, index: usize, now: Instant) -> Option<TouchEvent> {
        if self.channels[index].in_quiet_period(now, self.config.debounce_window) {
            return None;
        }

        let pad = self.pads[index];
        let raw = match self.sampler.read_raw(pad) {
            Ok(raw) => raw,
            Err(e) => {
                trace!(" Touch pad {} read failed: {:?}", pad.0, e);
                return None;
            }
        };

        let pressed = raw > self.config.pressed_threshold;
        // Bounded by the assertion in `new`
        let channel = index as u8;
        let state = &mut self.channels[index];
        match self.mode {
            DetectionMode::LongPress => {
                state.step_long_press(channel, pressed, now, self.config.long_press_window)
            }
            DetectionMode::Edges => state.step_edges(channel, pressed, now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::touch::{Press, SCRIPT_TOUCH_LEVEL, ScriptedSampler};

    const LEFT: TouchPad = TouchPad(2);
    const RIGHT: TouchPad = TouchPad(1);
    const TICK_MS: u64 = 10;

    fn at(t_ms: u64) -> Instant {
        Instant::from_millis(t_ms)
    }

    fn replay<const N: usize>(
        mode: DetectionMode,
        pads: [TouchPad; N],
        sampler: ScriptedSampler<'_>,
        ticks: u64,
    ) -> std::vec::Vec<TouchEvent> {
        replay_with(DebounceConfig::default(), mode, pads, sampler, ticks)
    }

    fn replay_with<const N: usize>(
        config: DebounceConfig,
        mode: DetectionMode,
        pads: [TouchPad; N],
        sampler: ScriptedSampler<'_>,
        ticks: u64,
    ) -> std::vec::Vec<TouchEvent> {
        let mut debouncer = Debouncer::new(sampler, pads, config, mode);
        let mut events = std::vec::Vec::new();
        for tick in 0..ticks {
            let now = at(tick * TICK_MS);
            debouncer.sampler_mut().seek(now);
            events.extend(debouncer.poll(now));
        }
        events
    }

    /// Every press/release edge recorded on channel 0, whether or not it
    /// produced an event.
    fn edge_times(
        mode: DetectionMode,
        sampler: ScriptedSampler<'_>,
        ticks: u64,
    ) -> std::vec::Vec<Instant> {
        let mut debouncer = Debouncer::new(sampler, [LEFT], DebounceConfig::default(), mode);
        let mut edges = std::vec::Vec::new();
        for tick in 0..ticks {
            let now = at(tick * TICK_MS);
            debouncer.sampler_mut().seek(now);
            debouncer.poll(now);
            let last = debouncer.channel(0).and_then(|c| c.last_transition());
            if let Some(t) = last
                && edges.last() != Some(&t)
            {
                edges.push(t);
            }
        }
        edges
    }

    fn bouncing_contact() -> std::vec::Vec<Press> {
        // Contact bouncing on and off every 20 ms for two seconds
        (0..50).map(|i| Press::new(LEFT, i * 40, 20)).collect()
    }

    fn assert_spaced(times: &[Instant]) {
        for pair in times.windows(2) {
            let gap = pair[1].saturating_duration_since(pair[0]);
            assert!(
                gap >= Duration::from_millis(TOUCH_DEBOUNCE_MS),
                "transitions {:?} too close",
                pair
            );
        }
    }

    #[test]
    fn test_held_press_fires_single_long_press_and_nothing_on_release() {
        // [low]*5, [high]*120, [low]*5 sampled every 10 ms
        let presses = [Press::new(LEFT, 50, 1200)];
        let events = replay(
            DetectionMode::LongPress,
            [LEFT],
            ScriptedSampler::new(&presses),
            130,
        );

        assert_eq!(
            events,
            [TouchEvent::new(0, TouchEventKind::LongPress, at(1060))]
        );
    }

    #[test]
    fn test_held_press_reports_both_edges_in_edge_mode() {
        let presses = [Press::new(LEFT, 50, 1200)];
        let events = replay(
            DetectionMode::Edges,
            [LEFT],
            ScriptedSampler::new(&presses),
            130,
        );

        assert_eq!(
            events,
            [
                TouchEvent::new(0, TouchEventKind::Pressed, at(50)),
                TouchEvent::new(0, TouchEventKind::Released, at(1250)),
            ]
        );
    }

    #[test]
    fn test_replay_is_deterministic() {
        let presses = [Press::new(LEFT, 30, 420), Press::new(RIGHT, 200, 1700)];
        let first = replay(
            DetectionMode::Edges,
            [LEFT, RIGHT],
            ScriptedSampler::new(&presses),
            250,
        );
        let second = replay(
            DetectionMode::Edges,
            [LEFT, RIGHT],
            ScriptedSampler::new(&presses),
            250,
        );

        assert_eq!(first, second);
        assert_eq!(first.len(), 4);
    }

    #[test]
    fn test_short_press_reports_release_only() {
        let presses = [Press::new(RIGHT, 50, 300)];
        let events = replay(
            DetectionMode::LongPress,
            [LEFT, RIGHT],
            ScriptedSampler::new(&presses),
            100,
        );

        assert_eq!(
            events,
            [TouchEvent::new(1, TouchEventKind::Released, at(350))]
        );
    }

    #[test]
    fn test_press_at_exactly_long_press_window_is_short() {
        // Held for exactly 1000 ms: the window must be exceeded, not reached
        let presses = [Press::new(LEFT, 0, 1000)];
        let events = replay(
            DetectionMode::LongPress,
            [LEFT],
            ScriptedSampler::new(&presses),
            150,
        );

        assert_eq!(
            events,
            [TouchEvent::new(0, TouchEventKind::Released, at(1000))]
        );
    }

    #[test]
    fn test_long_press_repeats_only_after_repress() {
        let presses = [Press::new(LEFT, 0, 5000), Press::new(LEFT, 6000, 1500)];
        let events = replay(
            DetectionMode::LongPress,
            [LEFT],
            ScriptedSampler::new(&presses),
            800,
        );

        assert_eq!(
            events,
            [
                TouchEvent::new(0, TouchEventKind::LongPress, at(1010)),
                TouchEvent::new(0, TouchEventKind::LongPress, at(7010)),
            ]
        );
    }

    #[test]
    fn test_transitions_respect_debounce_window() {
        let presses = bouncing_contact();
        let events = replay(
            DetectionMode::Edges,
            [LEFT],
            ScriptedSampler::new(&presses),
            300,
        );

        assert!(events.len() >= 2);
        for pair in events.windows(2) {
            let gap = pair[1].timestamp.saturating_duration_since(pair[0].timestamp);
            assert!(
                gap >= Duration::from_millis(TOUCH_DEBOUNCE_MS),
                "transitions {:?} too close",
                pair
            );
            assert_ne!(pair[0].kind, pair[1].kind, "edges must alternate");
        }
    }

    #[test]
    fn test_long_press_mode_respects_debounce_window() {
        let presses = bouncing_contact();

        let edges = edge_times(DetectionMode::LongPress, ScriptedSampler::new(&presses), 300);
        assert!(edges.len() >= 10);
        assert_spaced(&edges);

        let events = replay(
            DetectionMode::LongPress,
            [LEFT],
            ScriptedSampler::new(&presses),
            300,
        );
        assert!(!events.is_empty());
        assert!(events.iter().all(|e| e.kind == TouchEventKind::Released));
        let times: std::vec::Vec<Instant> = events.iter().map(|e| e.timestamp).collect();
        assert_spaced(&times);
    }

    #[test]
    fn test_edge_mode_edges_match_recorded_transitions() {
        let presses = bouncing_contact();
        let edges = edge_times(DetectionMode::Edges, ScriptedSampler::new(&presses), 300);
        let events = replay(
            DetectionMode::Edges,
            [LEFT],
            ScriptedSampler::new(&presses),
            300,
        );

        let times: std::vec::Vec<Instant> = events.iter().map(|e| e.timestamp).collect();
        assert_eq!(times, edges);
        assert_spaced(&edges);
    }

    #[test]
    fn test_quiet_period_skips_sampling() {
        let presses = [Press::new(LEFT, 50, 1000)];
        let mut debouncer = Debouncer::new(
            ScriptedSampler::new(&presses),
            [LEFT],
            DebounceConfig::default(),
            DetectionMode::Edges,
        );

        // t = 0..=150 ms: reads at 0..=50, skipped 60..=140, read again at 150
        for tick in 0..16 {
            let now = at(tick * TICK_MS);
            debouncer.sampler_mut().seek(now);
            debouncer.poll(now);
        }

        assert_eq!(debouncer.sampler_mut().reads(), 7);
        let state = debouncer.channel(0).unwrap();
        assert!(state.is_pressed());
        assert_eq!(state.last_transition(), Some(at(50)));
    }

    #[test]
    fn test_simultaneous_edges_follow_channel_order() {
        // Script lists the right pad first; output must still be by channel index
        let presses = [Press::new(RIGHT, 100, 500), Press::new(LEFT, 100, 500)];
        let events = replay(
            DetectionMode::Edges,
            [LEFT, RIGHT],
            ScriptedSampler::new(&presses),
            20,
        );

        assert_eq!(
            events,
            [
                TouchEvent::new(0, TouchEventKind::Pressed, at(100)),
                TouchEvent::new(1, TouchEventKind::Pressed, at(100)),
            ]
        );
    }

    #[test]
    fn test_read_failure_defers_detection() {
        let presses = [Press::new(LEFT, 50, 400)];
        let dropouts = [Press::new(LEFT, 50, 30)];
        let events = replay(
            DetectionMode::Edges,
            [LEFT],
            ScriptedSampler::new(&presses).with_dropouts(&dropouts),
            60,
        );

        assert_eq!(
            events,
            [
                TouchEvent::new(0, TouchEventKind::Pressed, at(80)),
                TouchEvent::new(0, TouchEventKind::Released, at(450)),
            ]
        );
    }

    #[test]
    fn test_read_failure_defers_short_press() {
        let presses = [Press::new(LEFT, 50, 400)];
        let dropouts = [Press::new(LEFT, 50, 30)];
        let events = replay(
            DetectionMode::LongPress,
            [LEFT],
            ScriptedSampler::new(&presses).with_dropouts(&dropouts),
            60,
        );

        assert_eq!(
            events,
            [TouchEvent::new(0, TouchEventKind::Released, at(450))]
        );
    }

    #[test]
    fn test_read_failure_delays_long_press() {
        let presses = [Press::new(LEFT, 0, 1500)];
        let dropouts = [Press::new(LEFT, 1000, 200)];
        let events = replay(
            DetectionMode::LongPress,
            [LEFT],
            ScriptedSampler::new(&presses).with_dropouts(&dropouts),
            200,
        );

        // Long press is due at 1010 but the pad is unreadable until 1200;
        // the release after a fired long press stays silent
        assert_eq!(
            events,
            [TouchEvent::new(0, TouchEventKind::LongPress, at(1200))]
        );
    }

    #[test]
    fn test_custom_windows_and_threshold() {
        let presses = [Press::new(LEFT, 0, 1000)];
        let config = DebounceConfig::default()
            .with_debounce_window(Duration::from_millis(50))
            .with_long_press_window(Duration::from_millis(300));
        let events = replay_with(
            config,
            DetectionMode::LongPress,
            [LEFT],
            ScriptedSampler::new(&presses),
            150,
        );
        assert_eq!(
            events,
            [TouchEvent::new(0, TouchEventKind::LongPress, at(310))]
        );

        // Raising the threshold to the touch level hides the press entirely
        let config = DebounceConfig::default().with_pressed_threshold(SCRIPT_TOUCH_LEVEL);
        let events = replay_with(
            config,
            DetectionMode::Edges,
            [LEFT],
            ScriptedSampler::new(&presses),
            150,
        );
        assert!(events.is_empty());
    }

    #[test]
    fn test_channel_ids_cover_full_u8_range() {
        let pads: [TouchPad; 256] = core::array::from_fn(|i| TouchPad(i as u8));
        let presses = [Press::new(TouchPad(255), 0, 200)];
        let mut debouncer = Debouncer::new(
            ScriptedSampler::new(&presses),
            pads,
            DebounceConfig::default(),
            DetectionMode::Edges,
        );

        let events = debouncer.poll(at(0));

        assert_eq!(
            events.as_slice(),
            [TouchEvent::new(255, TouchEventKind::Pressed, at(0))]
        );
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let presses = [Press::new(LEFT, 0, 500)];
        let sampler = ScriptedSampler::new(&presses).with_levels(0, TOUCH_PRESSED_THRESHOLD);
        let events = replay(DetectionMode::Edges, [LEFT], sampler, 60);

        assert!(events.is_empty());
    }
}
