//! Persisted device environment (timezone and NTP server).
//!
//! The whole environment is stored as one postcard-encoded record in a
//! [`BlobStore`]. Setters persist first and only then apply the new value,
//! so a failed write leaves the running configuration untouched.

use heapless::String;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;

use crate::config::{DEFAULT_NTP_SERVER, ENV_RECORD_LEN, ENV_VALUE_LEN};

/// Bounded string used for every environment value
pub type EnvValue = String<ENV_VALUE_LEN>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    /// POSIX TZ string; `None` keeps the system default (UTC)
    pub timezone: Option<EnvValue>,
    pub ntp_server: EnvValue,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            timezone: None,
            ntp_server: EnvValue::try_from(DEFAULT_NTP_SERVER).unwrap_or_default(),
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvError {
    #[error("Value is empty")]
    Empty,
    #[error("Value longer than {0} bytes")]
    TooLong(usize),
    #[error("Environment record could not be encoded")]
    Encode,
    #[error("Environment record could not be stored")]
    Storage,
}

/// Non-volatile storage for a single record.
pub trait BlobStore {
    type Error: core::fmt::Debug;

    /// Copy the stored record into `buf`; `Ok(None)` if nothing is stored.
    fn load(&mut self, buf: &mut [u8]) -> Result<Option<usize>, Self::Error>;

    fn store(&mut self, data: &[u8]) -> Result<(), Self::Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryStoreError {
    /// Writes were disabled with [`MemoryBlobStore::fail_writes`]
    WriteRejected,
    TooLarge,
}

/// RAM-backed store for the simulator and tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryBlobStore {
    record: Option<heapless::Vec<u8, ENV_RECORD_LEN>>,
    fail_writes: bool,
    writes: u32,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every subsequent write.
    pub fn fail_writes(mut self, fail: bool) -> Self {
        self.fail_writes = fail;
        self
    }

    pub fn writes(&self) -> u32 {
        self.writes
    }

    pub fn record(&self) -> Option<&[u8]> {
        self.record.as_deref()
    }
}

impl BlobStore for MemoryBlobStore {
    type Error = MemoryStoreError;

    fn load(&mut self, buf: &mut [u8]) -> Result<Option<usize>, Self::Error> {
        let Some(record) = &self.record else {
            return Ok(None);
        };
        let dst = buf
            .get_mut(..record.len())
            .ok_or(MemoryStoreError::TooLarge)?;
        dst.copy_from_slice(record);
        Ok(Some(record.len()))
    }

    fn store(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        if self.fail_writes {
            return Err(MemoryStoreError::WriteRejected);
        }
        let record = heapless::Vec::from_slice(data).map_err(|_| MemoryStoreError::TooLarge)?;
        self.record = Some(record);
        self.writes += 1;
        Ok(())
    }
}

fn validate(value: &str) -> Result<EnvValue, EnvError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(EnvError::Empty);
    }
    EnvValue::try_from(value).map_err(|_| EnvError::TooLong(ENV_VALUE_LEN))
}

/// Live environment plus the store it is persisted to.
pub struct EnvStore<S> {
    store: S,
    env: Environment,
}

impl<S: BlobStore> EnvStore<S> {
    /// Load the stored environment, falling back to defaults when nothing
    /// usable is stored.
    pub fn open(mut store: S) -> Self {
        let mut buf = [0u8; ENV_RECORD_LEN];
        let env = match store.load(&mut buf) {
            Ok(Some(len)) => match postcard::from_bytes::<Environment>(&buf[..len]) {
                Ok(env) => env,
                Err(e) => {
                    warn!(" Stored environment unreadable ({:?}), using defaults", e);
                    Environment::default()
                }
            },
            Ok(None) => {
                info!(" No stored environment, using defaults");
                Environment::default()
            }
            Err(e) => {
                warn!(" Environment load failed: {:?}", e);
                Environment::default()
            }
        };

        if let Some(tz) = &env.timezone {
            info!(" Timezone: {}", tz);
        }
        info!(" NTP server: {}", env.ntp_server);

        Self { store, env }
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    pub fn timezone(&self) -> Option<&str> {
        self.env.timezone.as_deref()
    }

    pub fn ntp_server(&self) -> &str {
        &self.env.ntp_server
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn set_timezone(&mut self, timezone: &str) -> Result<(), EnvError> {
        let mut next = self.env.clone();
        next.timezone = Some(validate(timezone)?);
        self.commit(next)?;
        info!(" Timezone set to '{}'", timezone.trim());
        Ok(())
    }

    pub fn set_ntp_server(&mut self, server: &str) -> Result<(), EnvError> {
        let mut next = self.env.clone();
        next.ntp_server = validate(server)?;
        self.commit(next)?;
        info!(" NTP server set to '{}'", server.trim());
        Ok(())
    }

    fn commit(&mut self, next: Environment) -> Result<(), EnvError> {
        let mut buf = [0u8; ENV_RECORD_LEN];
        let encoded = postcard::to_slice(&next, &mut buf).map_err(|_| EnvError::Encode)?;
        self.store.store(encoded).map_err(|e| {
            warn!(" Storing environment failed: {:?}", e);
            EnvError::Storage
        })?;
        self.env = next;
        Ok(())
    }
}
