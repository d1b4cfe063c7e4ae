//! Periodic render pump
//!
//! The only task that drives rendering. Every period it tries to take the
//! render guard for a short time; if it gets it, it runs one unit of UI work,
//! otherwise the tick is skipped and retried on the next period.

use embassy_time::{Duration, Instant, Timer};
use log::{debug, trace};

use crate::config::{RENDER_ACQUIRE_TIMEOUT_MS, RENDER_PUMP_PERIOD_MS, ms};
use crate::render_guard::{RenderGuard, Timeout};

/// State the pump advances while holding the guard.
pub trait UiSurface {
    type Work;

    /// Run one unit of pending UI work.
    fn handle(&mut self, now: Instant) -> Self::Work;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PumpConfig {
    period: Duration,
    acquire_timeout: Duration,
}

impl Default for PumpConfig {
    fn default() -> Self {
        Self {
            period: ms(RENDER_PUMP_PERIOD_MS),
            acquire_timeout: ms(RENDER_ACQUIRE_TIMEOUT_MS),
        }
    }
}

impl PumpConfig {
    pub const fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    pub const fn with_acquire_timeout(mut self, acquire_timeout: Duration) -> Self {
        self.acquire_timeout = acquire_timeout;
        self
    }

    pub const fn period(&self) -> Duration {
        self.period
    }

    pub const fn acquire_timeout(&self) -> Duration {
        self.acquire_timeout
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpOutcome<W> {
    Ran(W),
    /// The guard was busy for the whole acquire timeout
    Skipped,
}

pub struct RenderPump<'a, T> {
    guard: &'a RenderGuard<T>,
    config: PumpConfig,
    ran: u32,
    skipped: u32,
}

impl<'a, T> RenderPump<'a, T>
where
    T: UiSurface,
{
    pub fn new(guard: &'a RenderGuard<T>, config: PumpConfig) -> Self {
        Self {
            guard,
            config,
            ran: 0,
            skipped: 0,
        }
    }

    /// Ticks that ran UI work
    pub fn ran(&self) -> u32 {
        self.ran
    }

    /// Ticks lost to guard contention
    pub fn skipped(&self) -> u32 {
        self.skipped
    }

    /// One pump iteration, without the period sleep.
    pub async fn pump_once(&mut self) -> PumpOutcome<T::Work> {
        match self
            .guard
            .acquire(Timeout::After(self.config.acquire_timeout))
            .await
        {
            Ok(mut surface) => {
                let work = surface.handle(Instant::now());
                surface.release();
                self.ran = self.ran.wrapping_add(1);
                PumpOutcome::Ran(work)
            }
            Err(_) => {
                self.skipped = self.skipped.wrapping_add(1);
                trace!(" Render guard busy, skipping pump tick");
                PumpOutcome::Skipped
            }
        }
    }

    pub async fn run(mut self) -> ! {
        debug!(" Render pump started, period {:?}", self.config.period);
        loop {
            Timer::after(self.config.period).await;
            self.pump_once().await;
        }
    }
}
