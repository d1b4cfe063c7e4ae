//! Exclusive access to the UI state.
//!
//! The render pump and every UI mutator (input handlers, the console) go
//! through one [`RenderGuard`]. Holding a [`RenderLock`] is the only way to
//! reach the protected value, and dropping the lock releases the guard on
//! every exit path.

use core::ops::{Deref, DerefMut};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::{Mutex, MutexGuard};
use embassy_time::{Duration, with_timeout};
use log::error;
use thiserror_no_std::Error;

/// How long [`RenderGuard::acquire`] may wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    /// Fail immediately if the guard is held
    NonBlocking,
    After(Duration),
    Forever,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardError {
    #[error("Render guard still held when the timeout expired")]
    Timeout,
    #[error("Render guard starved a UI mutator")]
    Starved,
}

pub struct RenderGuard<T> {
    inner: Mutex<CriticalSectionRawMutex, T>,
}

impl<T> RenderGuard<T> {
    pub const fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(value),
        }
    }

    pub async fn acquire(&self, timeout: Timeout) -> Result<RenderLock<'_, T>, GuardError> {
        let guard = match timeout {
            Timeout::NonBlocking => self.inner.try_lock().map_err(|_| GuardError::Timeout)?,
            Timeout::After(limit) => with_timeout(limit, self.inner.lock())
                .await
                .map_err(|_| GuardError::Timeout)?,
            Timeout::Forever => self.inner.lock().await,
        };
        Ok(RenderLock { guard })
    }

    /// Acquire on behalf of a UI mutator.
    ///
    /// Mutators expect the guard to be released promptly; a timeout here
    /// means a holder leaked the lock or the pump is starving everyone else.
    pub async fn acquire_for_mutation(
        &self,
        timeout: Timeout,
    ) -> Result<RenderLock<'_, T>, GuardError> {
        self.acquire(timeout).await.map_err(|_| {
            error!(
                " Render guard not acquired within {:?}, lock leaked or starved",
                timeout
            );
            GuardError::Starved
        })
    }
}

/// Scoped hold on a [`RenderGuard`]
pub struct RenderLock<'a, T> {
    guard: MutexGuard<'a, CriticalSectionRawMutex, T>,
}

impl<T> RenderLock<'_, T> {
    /// Give the guard back. Equivalent to dropping the lock.
    pub fn release(self) {}
}

impl<T> Deref for RenderLock<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T> DerefMut for RenderLock<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}
