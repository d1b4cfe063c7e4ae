//! Application event bus
//!
//! Touch input posts [`AppEvent`]s on a bounded publish/subscribe channel.
//! The [`AppEventLoop`] drains the channel and dispatches the events whose
//! [`EventKey`] was registered to an [`EventHandler`].

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::pubsub::{self, PubSubChannel, Publisher, Subscriber, WaitResult};
use embassy_time::{Duration, Instant, with_timeout};
use heapless::Vec;
use log::{debug, trace, warn};
use thiserror_no_std::Error;

use crate::config::{
    APP_EVENT_CAPACITY, APP_EVENT_HANDLERS, APP_EVENT_PUBLISHERS, APP_EVENT_SUBSCRIBERS,
};

/// Family of an application event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventBase {
    Input,
}

/// Physical buttons, numbered by touch channel index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Left = 0,
    Right = 1,
}

impl Button {
    pub const fn from_channel(channel: u8) -> Option<Self> {
        match channel {
            0 => Some(Self::Left),
            1 => Some(Self::Right),
            _ => None,
        }
    }

    /// Event id of this button within [`EventBase::Input`]
    pub const fn id(self) -> i32 {
        self as i32
    }
}

/// Payload of an input event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEventData {
    pub timestamp: Instant,
    /// `true` for a long press, `false` for a short press
    pub long_press: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    Input { button: Button, data: InputEventData },
}

impl AppEvent {
    pub const fn base(&self) -> EventBase {
        match self {
            Self::Input { .. } => EventBase::Input,
        }
    }

    pub const fn id(&self) -> i32 {
        match self {
            Self::Input { button, .. } => button.id(),
        }
    }
}

/// Registration key: an event base and either one id or every id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventKey {
    pub base: EventBase,
    /// `None` matches any id
    pub id: Option<i32>,
}

impl EventKey {
    pub const fn new(base: EventBase, id: i32) -> Self {
        Self { base, id: Some(id) }
    }

    pub const fn any(base: EventBase) -> Self {
        Self { base, id: None }
    }

    pub fn matches(&self, event: &AppEvent) -> bool {
        self.base == event.base() && self.id.is_none_or(|id| id == event.id())
    }
}

pub type AppEventChannel = PubSubChannel<
    CriticalSectionRawMutex,
    AppEvent,
    APP_EVENT_CAPACITY,
    APP_EVENT_SUBSCRIBERS,
    APP_EVENT_PUBLISHERS,
>;

pub type AppPublisher<'a> = Publisher<
    'a,
    CriticalSectionRawMutex,
    AppEvent,
    APP_EVENT_CAPACITY,
    APP_EVENT_SUBSCRIBERS,
    APP_EVENT_PUBLISHERS,
>;

pub type AppSubscriber<'a> = Subscriber<
    'a,
    CriticalSectionRawMutex,
    AppEvent,
    APP_EVENT_CAPACITY,
    APP_EVENT_SUBSCRIBERS,
    APP_EVENT_PUBLISHERS,
>;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    #[error("Handler table is full")]
    HandlerTableFull,
    #[error("No subscriber slot left on the event channel")]
    NoSubscriberSlot,
    #[error("No publisher slot left on the event channel")]
    NoPublisherSlot,
}

impl From<pubsub::Error> for BusError {
    fn from(e: pubsub::Error) -> Self {
        match e {
            pubsub::Error::MaximumSubscribersReached => Self::NoSubscriberSlot,
            pubsub::Error::MaximumPublishersReached => Self::NoPublisherSlot,
        }
    }
}

/// Receiver of dispatched app events.
#[allow(async_fn_in_trait)]
pub trait EventHandler {
    async fn handle(&mut self, event: AppEvent);
}

/// Subscriber side of the app event channel plus the registered keys.
pub struct AppEventLoop<'a> {
    subscriber: AppSubscriber<'a>,
    keys: Vec<EventKey, APP_EVENT_HANDLERS>,
}

impl<'a> AppEventLoop<'a> {
    pub fn new(channel: &'a AppEventChannel) -> Result<Self, BusError> {
        Ok(Self {
            subscriber: channel.subscriber()?,
            keys: Vec::new(),
        })
    }

    /// Route events matching `key` to the handler.
    pub fn register(&mut self, key: EventKey) -> Result<(), BusError> {
        self.keys.push(key).map_err(|_| BusError::HandlerTableFull)?;
        debug!(" Registered app event handler for {:?}", key);
        Ok(())
    }

    fn is_registered(&self, event: &AppEvent) -> bool {
        self.keys.iter().any(|key| key.matches(event))
    }

    async fn dispatch<H: EventHandler>(&self, event: AppEvent, handler: &mut H) -> bool {
        if self.is_registered(&event) {
            handler.handle(event).await;
            true
        } else {
            trace!(" No handler for {:?}", event);
            false
        }
    }

    /// Dispatch events as they arrive until `slice` has elapsed.
    ///
    /// Returns the number of events handed to `handler`.
    pub async fn run_for<H: EventHandler>(&mut self, slice: Duration, handler: &mut H) -> usize {
        let deadline = Instant::now() + slice;
        let mut dispatched = 0;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining == Duration::from_ticks(0) {
                break;
            }

            match with_timeout(remaining, self.subscriber.next_message()).await {
                Ok(WaitResult::Message(event)) => {
                    if self.dispatch(event, handler).await {
                        dispatched += 1;
                    }
                }
                Ok(WaitResult::Lagged(missed)) => {
                    warn!(" App event loop lagged, {} events lost", missed);
                }
                Err(_) => break,
            }
        }

        dispatched
    }

    /// Dispatch every event already queued without waiting for more.
    pub async fn dispatch_pending<H: EventHandler>(&mut self, handler: &mut H) -> usize {
        let mut dispatched = 0;
        while let Some(result) = self.subscriber.try_next_message() {
            match result {
                WaitResult::Message(event) => {
                    if self.dispatch(event, handler).await {
                        dispatched += 1;
                    }
                }
                WaitResult::Lagged(missed) => {
                    warn!(" App event loop lagged, {} events lost", missed);
                }
            }
        }
        dispatched
    }
}
