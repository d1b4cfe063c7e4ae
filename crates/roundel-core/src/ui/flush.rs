use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;

/// Completion notice for panel transfers.
///
/// The panel driver calls [`FlushReady::notify`] from its transfer-done
/// interrupt; the render pump checks it before starting the next flush.
pub struct FlushReady {
    signal: Signal<CriticalSectionRawMutex, ()>,
}

impl Default for FlushReady {
    fn default() -> Self {
        Self::new()
    }
}

impl FlushReady {
    pub const fn new() -> Self {
        Self {
            signal: Signal::new(),
        }
    }

    /// Report that the last flush finished. Safe to call from interrupt context.
    pub fn notify(&self) {
        self.signal.signal(());
    }

    /// Consume a pending completion, if any.
    pub fn take(&self) -> bool {
        self.signal.try_take().is_some()
    }
}
