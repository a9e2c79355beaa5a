use std::sync::Mutex;

use anyhow::{anyhow, Result};
use serde_json::{Map, Value};

use super::KeyValueStore;

/// Store kept entirely in process memory. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<Map<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: Map<String, Value>) -> Self {
        Self {
            entries: Mutex::new(entries),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Map<String, Value>>> {
        self.entries
            .lock()
            .map_err(|_| anyhow!("Memory store lock poisoned"))
    }
}

impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.lock()?.get(key).cloned())
    }

    async fn get_all(&self) -> Result<Map<String, Value>> {
        Ok(self.lock()?.clone())
    }

    async fn set(&self, entries: Map<String, Value>) -> Result<()> {
        self.lock()?.extend(entries);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.lock()?.clear();
        Ok(())
    }
}
