//! The flat key-value store shared by the tracker host and the dashboard.
//!
//!  - Every key that is not reserved is a hostname mapped to cumulative active seconds.
//!  - [HOURLY_WAGE_KEY] holds the user configured wage, [SWITCH_COUNT_KEY] the number of tab
//!    switches since the last clear.
//!  - Values are plain JSON, so the file stays readable and editable by hand.

pub mod json_file;
pub mod memory;

use std::{future::Future, ops::Deref};

use anyhow::Result;
use serde_json::{Map, Value};

pub const HOURLY_WAGE_KEY: &str = "hourlyWage";
pub const SWITCH_COUNT_KEY: &str = "totalSwitchCount";

/// Keys that never describe a tracked domain. Any new reserved key has to be listed here or
/// the dashboard will render it as a site.
pub const RESERVED_KEYS: [&str; 2] = [HOURLY_WAGE_KEY, SWITCH_COUNT_KEY];

pub fn is_reserved_key(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}

/// Interface of the key-value store. Writes merge into the existing contents.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Value>>>;

    fn get_all(&self) -> impl Future<Output = Result<Map<String, Value>>>;

    /// Inserts or overwrites every entry, leaving other keys untouched.
    fn set(&self, entries: Map<String, Value>) -> impl Future<Output = Result<()>>;

    /// Removes every key, reserved ones included.
    fn clear(&self) -> impl Future<Output = Result<()>>;
}

impl<T: Deref> KeyValueStore for T
where
    T::Target: KeyValueStore,
{
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Value>>> {
        self.deref().get(key)
    }

    fn get_all(&self) -> impl Future<Output = Result<Map<String, Value>>> {
        self.deref().get_all()
    }

    fn set(&self, entries: Map<String, Value>) -> impl Future<Output = Result<()>> {
        self.deref().set(entries)
    }

    fn clear(&self) -> impl Future<Output = Result<()>> {
        self.deref().clear()
    }
}

/// Reads a stored counter the way the browser scripts do: anything missing or unusable counts
/// as zero. Fractions are floored.
pub fn value_as_count(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|v| *v > 0.).map(|v| v.floor() as u64))
            .unwrap_or(0),
        _ => 0,
    }
}

/// Single entry map, the common shape of a write.
pub fn entry(key: impl Into<String>, value: impl Into<Value>) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert(key.into(), value.into());
    map
}
