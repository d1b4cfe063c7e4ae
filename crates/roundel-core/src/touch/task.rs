use embassy_time::{Instant, Timer};
use log::{error, info};

use super::{DebounceConfig, Debouncer, EventSink, TouchPad, TouchSampler};

/// Long-running touch input task: owns a debouncer and the sink it feeds.
///
/// The detection mode is taken from the sink type, so a bus-fed task reports
/// short/long presses and a queue-fed task reports raw edges.
pub struct TouchInputTask<S, K, const N: usize> {
    debouncer: Debouncer<S, N>,
    sink: K,
}

impl<S, K, const N: usize> TouchInputTask<S, K, N>
where
    S: TouchSampler,
    K: EventSink,
{
    pub fn new(sampler: S, pads: [TouchPad; N], config: DebounceConfig, sink: K) -> Self {
        Self {
            debouncer: Debouncer::new(sampler, pads, config, K::MODE),
            sink,
        }
    }

    pub fn debouncer(&self) -> &Debouncer<S, N> {
        &self.debouncer
    }

    pub fn debouncer_mut(&mut self) -> &mut Debouncer<S, N> {
        &mut self.debouncer
    }

    /// Wait for the sensor to power up, configure the pads and let the first
    /// readings settle.
    pub async fn start(&mut self) {
        let config = *self.debouncer.config();
        Timer::after(config.startup_delay()).await;

        if let Err(e) = self.debouncer.init_sampler() {
            error!(" Touch sampler init failed: {:?}", e);
        }

        Timer::after(config.settle_delay()).await;
        info!(
            " Touch input ready on {} pads ({:?} detection)",
            N,
            self.debouncer.mode()
        );
    }

    /// Poll every channel once and deliver the resulting events.
    ///
    /// Returns the number of events delivered.
    pub async fn step(&mut self, now: Instant) -> usize {
        let events = self.debouncer.poll(now);
        for event in &events {
            self.sink.deliver(*event).await;
        }
        events.len()
    }

    pub async fn run(mut self) -> ! {
        self.start().await;
        let period = self.debouncer.config().poll_period();
        loop {
            self.step(Instant::now()).await;
            Timer::after(period).await;
        }
    }
}
