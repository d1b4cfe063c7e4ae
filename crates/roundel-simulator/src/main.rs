//! Desktop simulator for roundel.
//!
//! Runs the whole firmware core on the host with a single `block_on`
//! executor: two scripted touch input tasks (one per delivery mode), the
//! app event loop, the render pump and a console that reads commands from
//! stdin.
//!
//! The panel is an off-screen `SimulatorDisplay`; the last frame is written
//! to a PNG when the run ends.
//!
//! | Variable           | Effect                                   |
//! |--------------------|------------------------------------------|
//! | `ROUNDEL_SIM_SECS` | Run time in seconds (default 15)         |
//! | `ROUNDEL_SIM_PNG`  | Final frame output (default `roundel.png`)|
//! | `RUST_LOG`         | Log filter (default `info`)              |

use std::io::BufRead;
use std::time::{SystemTime, UNIX_EPOCH};

use core::convert::Infallible;

use embassy_futures::block_on;
use embassy_futures::join::join5;
use embassy_futures::select::select;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::{Duration, Instant, Timer};
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use embedded_graphics_simulator::{OutputSettingsBuilder, SimulatorDisplay};
use log::{debug, error, info, warn};

use roundel_core::app::App;
use roundel_core::config::{
    APP_EVENT_LOOP_SLICE_MS, CONSOLE_MAX_LINE, DISPLAY_HEIGHT_PX, DISPLAY_WIDTH_PX, TOUCH_PADS,
};
use roundel_core::console::Command;
use roundel_core::env::{EnvStore, MemoryBlobStore};
use roundel_core::event_bus::{AppEventChannel, AppEventLoop, EventBase, EventKey};
use roundel_core::pump::{PumpConfig, RenderPump};
use roundel_core::render_guard::{RenderGuard, Timeout};
use roundel_core::touch::{
    BusSink, DebounceConfig, InputQueue, Press, QueueSink, ScriptError, ScriptedSampler,
    TouchInputTask, TouchPad, TouchSampler,
};
use roundel_core::ui::{Backlight, BacklightControl, ButtonInputDevice, FlushReady, Ui};

/// Default simulated run time.
const DEFAULT_RUN_SECS: u64 = 15;

const DEFAULT_PNG_PATH: &str = "roundel.png";

/// Pixel scale of the saved frame
const OUTPUT_SCALE: u32 = 2;

const LEFT: TouchPad = TOUCH_PADS[0];
const RIGHT: TouchPad = TOUCH_PADS[1];

/// Presses fed to the bus-mode task (offsets from program start).
const BUS_SCRIPT: &[Press] = &[
    // Short left: logged
    Press::new(LEFT, 2_000, 300),
    // Long right: backlight off
    Press::new(RIGHT, 3_000, 1_500),
    // Short right: backlight back on
    Press::new(RIGHT, 6_000, 200),
    // Long left: logged only
    Press::new(LEFT, 8_000, 1_800),
];

/// Presses fed to the queue-mode task, shown by the on-screen indicators.
const QUEUE_SCRIPT: &[Press] = &[
    Press::new(LEFT, 2_500, 400),
    Press::new(RIGHT, 2_700, 900),
    Press::new(LEFT, 5_000, 2_000),
    Press::new(RIGHT, 9_000, 150),
];

static APP_EVENTS: AppEventChannel = AppEventChannel::new();
static INPUT_QUEUE: InputQueue = InputQueue::new();
static FLUSH_READY: FlushReady = FlushReady::new();
static CONSOLE_LINES: Channel<CriticalSectionRawMutex, String, 4> = Channel::new();

/// Scripted sampler that follows the host clock.
struct LiveScript<'a> {
    script: ScriptedSampler<'a>,
}

impl<'a> LiveScript<'a> {
    fn new(presses: &'a [Press], origin: Instant) -> Self {
        Self {
            script: ScriptedSampler::new(presses).with_origin(origin),
        }
    }
}

impl TouchSampler for LiveScript<'_> {
    type Error = ScriptError;

    fn init(&mut self, pads: &[TouchPad]) -> Result<(), Self::Error> {
        info!(" Scripted touch sensor configured for {} pads", pads.len());
        Ok(())
    }

    fn read_raw(&mut self, pad: TouchPad) -> Result<u32, Self::Error> {
        self.script.seek(Instant::now());
        self.script.read_raw(pad)
    }
}

/// Panel backed by an off-screen simulator display. Every transfer
/// completes immediately and reports it through `FLUSH_READY`.
struct HostPanel {
    display: SimulatorDisplay<Rgb565>,
    flushes: u32,
    pixels: u64,
}

impl HostPanel {
    fn new() -> Self {
        Self {
            display: SimulatorDisplay::new(Size::new(
                DISPLAY_WIDTH_PX as u32,
                DISPLAY_HEIGHT_PX as u32,
            )),
            flushes: 0,
            pixels: 0,
        }
    }

    fn save_png(&self, path: &str) {
        let settings = OutputSettingsBuilder::new().scale(OUTPUT_SCALE).build();
        match self.display.to_rgb_output_image(&settings).save_png(path) {
            Ok(()) => info!("Final frame written to {}", path),
            Err(e) => error!("Writing {} failed: {}", path, e),
        }
    }
}

impl OriginDimensions for HostPanel {
    fn size(&self) -> Size {
        self.display.size()
    }
}

impl DrawTarget for HostPanel {
    type Color = Rgb565;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let mut sent = 0u64;
        self.display.draw_iter(pixels.into_iter().inspect(|_| sent += 1))?;
        self.pixels += sent;
        Ok(())
    }

    fn fill_contiguous<I>(&mut self, area: &Rectangle, colors: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Self::Color>,
    {
        let mut sent = 0u64;
        self.display.fill_contiguous(area, colors.into_iter().inspect(|_| sent += 1))?;
        self.flushes += 1;
        self.pixels += sent;
        debug!(" Panel flush #{} {:?} ({} px)", self.flushes, area, sent);
        FLUSH_READY.notify();
        Ok(())
    }
}

struct HostBacklight;

impl Backlight for HostBacklight {
    fn set(&mut self, on: bool) {
        info!(" [backlight] {}", if on { "ON" } else { "OFF" });
    }
}

fn png_path() -> String {
    std::env::var("ROUNDEL_SIM_PNG").unwrap_or_else(|_| DEFAULT_PNG_PATH.to_string())
}

fn run_secs() -> u64 {
    std::env::var("ROUNDEL_SIM_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_RUN_SECS)
}

/// Forward stdin lines to the console task.
fn spawn_stdin_reader() {
    std::thread::spawn(|| {
        for line in std::io::stdin().lock().lines() {
            let Ok(mut line) = line else {
                break;
            };
            if line.len() > CONSOLE_MAX_LINE {
                warn!(" Console line truncated to {} bytes", CONSOLE_MAX_LINE);
                let mut cut = CONSOLE_MAX_LINE;
                while !line.is_char_boundary(cut) {
                    cut -= 1;
                }
                line.truncate(cut);
            }
            block_on(CONSOLE_LINES.send(line));
        }
    });
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let run_secs = run_secs();
    info!("Starting roundel simulator for {} s", run_secs);
    info!("Console commands: help, tz, ntp, backlight, env, uptime");

    let started = Instant::now();
    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(1);

    let ui = Ui::new(HostPanel::new(), HostBacklight, &FLUSH_READY, seed, started)
        .expect("UI timer table too small")
        .with_input(ButtonInputDevice::new(&INPUT_QUEUE));
    let ui = RenderGuard::new(ui);
    let app = App::new(&ui, EnvStore::open(MemoryBlobStore::new()));

    let mut event_loop = AppEventLoop::new(&APP_EVENTS).expect("app event loop already exists");
    event_loop
        .register(EventKey::any(EventBase::Input))
        .expect("handler table full");

    let bus_touch = TouchInputTask::new(
        LiveScript::new(BUS_SCRIPT, started),
        TOUCH_PADS,
        DebounceConfig::default(),
        BusSink::new(APP_EVENTS.publisher().expect("no publisher slot")),
    );
    let queue_touch = TouchInputTask::new(
        LiveScript::new(QUEUE_SCRIPT, started),
        TOUCH_PADS,
        DebounceConfig::default(),
        QueueSink::new(&INPUT_QUEUE),
    );
    let pump = RenderPump::new(&ui, PumpConfig::default());

    let app_loop = async {
        let mut handler = &app;
        loop {
            event_loop
                .run_for(Duration::from_millis(APP_EVENT_LOOP_SLICE_MS), &mut handler)
                .await;
            Timer::after(Duration::from_millis(1)).await;
        }
    };

    let console = async {
        loop {
            let line = CONSOLE_LINES.receive().await;
            match Command::parse(&line) {
                Ok(Some(command)) => match app.execute(command).await {
                    Ok(reply) => print!("{reply}"),
                    Err(e) => println!("error: {e}"),
                },
                Ok(None) => {}
                Err(e) => println!("error: {e}"),
            }
        }
    };

    spawn_stdin_reader();
    block_on(select(
        join5(
            bus_touch.run(),
            queue_touch.run(),
            pump.run(),
            app_loop,
            console,
        ),
        Timer::after(Duration::from_secs(run_secs)),
    ));

    match block_on(ui.acquire(Timeout::NonBlocking)) {
        Ok(ui) => {
            info!(
                "Simulation finished: {} flushes, {} px sent, backlight {}",
                ui.panel().flushes,
                ui.panel().pixels,
                if ui.backlight() { "on" } else { "off" }
            );
            ui.panel().save_png(&png_path());
        }
        Err(e) => warn!("Simulation finished with the render guard held: {}", e),
    }
}
