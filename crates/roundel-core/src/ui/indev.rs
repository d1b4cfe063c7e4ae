//! Button input device fed by the touch input queue.

use crate::touch::{InputQueue, QueuedTouch};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ButtonState {
    #[default]
    Released,
    Pressed,
}

/// One reading handed to the UI by an input device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputData {
    /// Button id (touch channel index)
    pub key: u8,
    pub state: ButtonState,
    /// More readings are waiting; call `read` again in the same cycle
    pub continue_reading: bool,
}

/// UI poll contract for input devices.
pub trait InputDevice {
    fn read(&mut self, data: &mut InputData);
}

/// Reads press/release edges pushed by the queue-fed touch task.
pub struct ButtonInputDevice<'a> {
    queue: &'a InputQueue,
    last: Option<QueuedTouch>,
}

impl<'a> ButtonInputDevice<'a> {
    pub fn new(queue: &'a InputQueue) -> Self {
        Self { queue, last: None }
    }
}

impl InputDevice for ButtonInputDevice<'_> {
    /// Pop at most one queued edge. With nothing queued the last known state
    /// is reported again.
    fn read(&mut self, data: &mut InputData) {
        if let Ok(touch) = self.queue.try_receive() {
            self.last = Some(touch);
        }

        if let Some(touch) = self.last {
            data.key = touch.channel;
            data.state = if touch.pressed {
                ButtonState::Pressed
            } else {
                ButtonState::Released
            };
        }
        data.continue_reading = !self.queue.is_empty();
    }
}
