use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Sender, TrySendError};
use log::{debug, warn};

use super::{DetectionMode, EventSink, TouchEvent, TouchEventKind};
use crate::config::INPUT_QUEUE_CAPACITY;
use crate::event_bus::{AppEvent, AppPublisher, Button, InputEventData};

/// Entry of the UI input queue: the new state of one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueuedTouch {
    pub channel: u8,
    pub pressed: bool,
}

/// Bounded queue between the touch task and the UI input device
pub type InputQueue = Channel<CriticalSectionRawMutex, QueuedTouch, INPUT_QUEUE_CAPACITY>;

/// Posts short and long presses to the app event bus.
///
/// Posting never waits: when the bus is full the event is dropped so the
/// touch task keeps its cadence.
pub struct BusSink<'a> {
    publisher: AppPublisher<'a>,
}

impl<'a> BusSink<'a> {
    pub fn new(publisher: AppPublisher<'a>) -> Self {
        Self { publisher }
    }
}

impl EventSink for BusSink<'_> {
    const MODE: DetectionMode = DetectionMode::LongPress;

    async fn deliver(&mut self, event: TouchEvent) {
        let Some(button) = Button::from_channel(event.channel) else {
            warn!(" No button mapped to touch channel {}", event.channel);
            return;
        };

        let data = InputEventData {
            timestamp: event.timestamp,
            long_press: event.kind == TouchEventKind::LongPress,
        };

        if self
            .publisher
            .try_publish(AppEvent::Input { button, data })
            .is_err()
        {
            warn!(" App event bus full, dropping {:?} button event", button);
        }
    }
}

/// Pushes raw press/release edges to the UI input queue.
///
/// Delivery waits for space without a timeout: if the UI stops draining the
/// queue, the touch task stalls here.
pub struct QueueSink<'a> {
    sender: Sender<'a, CriticalSectionRawMutex, QueuedTouch, INPUT_QUEUE_CAPACITY>,
}

impl<'a> QueueSink<'a> {
    pub fn new(queue: &'a InputQueue) -> Self {
        Self {
            sender: queue.sender(),
        }
    }
}

impl EventSink for QueueSink<'_> {
    const MODE: DetectionMode = DetectionMode::Edges;

    async fn deliver(&mut self, event: TouchEvent) {
        let item = QueuedTouch {
            channel: event.channel,
            pressed: event.kind == TouchEventKind::Pressed,
        };

        if let Err(TrySendError::Full(item)) = self.sender.try_send(item) {
            debug!(" Input queue full, waiting for the UI to drain it");
            self.sender.send(item).await;
        }
    }
}
