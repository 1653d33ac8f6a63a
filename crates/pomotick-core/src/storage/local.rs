//! Key-value storage that survives restarts of the host process.
//!
//! The engine writes the running deadline here on start and removes it on
//! pause or expiry, so a fresh engine can pick up a countdown that was
//! still in flight.

use std::collections::HashMap;

use tracing::debug;

use crate::error::PersistenceError;

/// Epoch-millisecond deadline of the running countdown, as a decimal string.
pub const DEADLINE_KEY: &str = "pomodoroEndTime";
/// Mode the stored deadline belongs to.
pub const MODE_KEY: &str = "pomodoroMode";

pub trait LocalPersistence: Send {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistenceError>;
    fn remove(&mut self, key: &str) -> Result<(), PersistenceError>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryPersistence {
    entries: HashMap<String, String>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, key: &str, value: &str) -> Self {
        self.entries.insert(key.to_string(), value.to_string());
        self
    }
}

impl LocalPersistence for MemoryPersistence {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), PersistenceError> {
        self.entries.remove(key);
        Ok(())
    }
}

impl<P: LocalPersistence + ?Sized> LocalPersistence for Box<P> {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistenceError> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), PersistenceError> {
        (**self).remove(key)
    }
}

/// Reads pass through; writes are dropped. Lets a one-shot query such as
/// a status check bootstrap an engine without touching stored state.
#[derive(Debug, Default, Clone)]
pub struct ReadOnly<P> {
    inner: P,
}

impl<P: LocalPersistence> ReadOnly<P> {
    pub fn new(inner: P) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> P {
        self.inner
    }
}

impl<P: LocalPersistence> LocalPersistence for ReadOnly<P> {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        self.inner.get(key)
    }

    fn set(&mut self, key: &str, _value: &str) -> Result<(), PersistenceError> {
        debug!(key, "read-only persistence, write skipped");
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), PersistenceError> {
        debug!(key, "read-only persistence, remove skipped");
        Ok(())
    }
}
