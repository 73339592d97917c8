//! Key-value persistence substrate
//!
//! The local table store only ever needs three primitives from the platform:
//! read a string, write a string, remove a string. Anything that offers those
//! (AsyncStorage, SharedPreferences, NSUserDefaults, a SQLite file) can back it.

use crate::Result;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Flat string-to-string persistence.
///
/// Implementations must be durable enough that a successful `set_string` is
/// visible to every subsequent `get_string` on the same substrate.
pub trait KvSubstrate: Send + Sync {
    /// Read the value stored under `key`, `None` when absent.
    fn get_string(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    fn set_string(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. Removing an absent key is not an error.
    fn remove_string(&self, key: &str) -> Result<()>;
}

/// In-memory substrate for tests and throwaway sessions
#[derive(Default)]
pub struct MemorySubstrate {
    entries: RwLock<HashMap<String, String>>,
}

impl MemorySubstrate {
    /// Create an empty substrate
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// True when nothing is stored
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Snapshot of all stored keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.read().keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl KvSubstrate for MemorySubstrate {
    fn get_string(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set_string(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_string(&self, key: &str) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }
}
