//! Application layer: reacts to button events and console commands.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex as AsyncMutex;
use embassy_time::Instant;
use log::info;

use crate::console::{BacklightAction, Command, ConsoleError, Reply};
use crate::env::{BlobStore, EnvStore};
use crate::event_bus::{AppEvent, Button, EventHandler, InputEventData};
use crate::render_guard::{RenderGuard, Timeout};
use crate::ui::BacklightControl;

/// Shared application state.
///
/// Methods take `&self` so the app event loop and the console can use the
/// same instance concurrently; UI access goes through the render guard and
/// the environment sits behind its own mutex.
pub struct App<'a, U, S> {
    ui: &'a RenderGuard<U>,
    env: AsyncMutex<CriticalSectionRawMutex, EnvStore<S>>,
    started: Instant,
}

impl<'a, U, S> App<'a, U, S>
where
    U: BacklightControl,
    S: BlobStore,
{
    pub fn new(ui: &'a RenderGuard<U>, env: EnvStore<S>) -> Self {
        Self {
            ui,
            env: AsyncMutex::new(env),
            started: Instant::now(),
        }
    }

    pub fn env(&self) -> &AsyncMutex<CriticalSectionRawMutex, EnvStore<S>> {
        &self.env
    }

    /// React to a short or long press of one of the buttons.
    pub async fn on_input(&self, button: Button, data: InputEventData) {
        let kind = if data.long_press { "long" } else { "short" };
        info!(" {:?} button {}", button, kind);

        if button != Button::Right {
            return;
        }

        let Ok(mut ui) = self.ui.acquire_for_mutation(Timeout::Forever).await else {
            return;
        };
        if data.long_press {
            info!(" Toggle backlight");
            ui.toggle_backlight();
        } else if !ui.backlight() {
            ui.set_backlight(true);
        }
    }

    pub async fn execute(&self, command: Command) -> Result<Reply, ConsoleError> {
        match command {
            Command::Help => Ok(Reply::Help),
            Command::SetTimezone(tz) => {
                self.env.lock().await.set_timezone(&tz)?;
                Ok(Reply::Done)
            }
            Command::SetNtpServer(server) => {
                self.env.lock().await.set_ntp_server(&server)?;
                Ok(Reply::Done)
            }
            Command::Backlight(action) => {
                let mut ui = self.ui.acquire_for_mutation(Timeout::Forever).await?;
                match action {
                    BacklightAction::Query => {}
                    BacklightAction::On => ui.set_backlight(true),
                    BacklightAction::Off => ui.set_backlight(false),
                    BacklightAction::Toggle => ui.toggle_backlight(),
                }
                Ok(Reply::Backlight(ui.backlight()))
            }
            Command::Env => Ok(Reply::Environment(
                self.env.lock().await.environment().clone(),
            )),
            Command::Uptime => Ok(Reply::Uptime(Instant::now() - self.started)),
        }
    }
}

impl<U, S> EventHandler for &App<'_, U, S>
where
    U: BacklightControl,
    S: BlobStore,
{
    async fn handle(&mut self, event: AppEvent) {
        match event {
            AppEvent::Input { button, data } => self.on_input(button, data).await,
        }
    }
}
