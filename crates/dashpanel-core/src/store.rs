//! Key/value persistence capability.
//!
//! The dashboard core never knows which backend holds its state. It sees one
//! injected [`KeyValueStore`]; values are opaque JSON.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::StoreError;

/// To-do task sequence
pub const KEY_TODO: &str = "todo";
/// Subscribed feed URL sequence
pub const KEY_FEEDS: &str = "feeds";
/// Last good weather reading per location prefix
pub const KEY_LAST_WEATHER: &str = "lastWeather";
/// Last good market batch
pub const KEY_LAST_MARKET: &str = "lastMarket";
/// User-supplied weather API key
pub const KEY_WEATHER_API: &str = "openweather_key";
/// User-supplied market API key
pub const KEY_MARKET_API: &str = "alpha_vantage_key";

pub type StoreResult<T> = Result<T, StoreError>;

/// Trait for key/value storage backends.
///
/// `set` and `remove` must be durable when they return.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> StoreResult<Option<Value>>;

    fn set(&self, key: &str, value: Value) -> StoreResult<()>;

    fn remove(&self, key: &str) -> StoreResult<()>;
}

/// Read a typed value. A stored value of the wrong shape is an error.
pub fn get_as<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> StoreResult<Option<T>> {
    match store.get(key)? {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| StoreError::Shape {
                key: key.to_string(),
                message: e.to_string(),
            }),
    }
}

/// Write a typed value.
pub fn set_as<T: Serialize + ?Sized>(store: &dyn KeyValueStore, key: &str, value: &T) -> StoreResult<()> {
    let value = serde_json::to_value(value).map_err(|e| StoreError::Shape {
        key: key.to_string(),
        message: e.to_string(),
    })?;
    store.set(key, value)
}

/// Resolve an API key: a non-blank stored override wins over the configured key.
pub fn resolve_api_key(
    store: &dyn KeyValueStore,
    store_key: &str,
    configured: Option<&str>,
) -> Option<String> {
    let stored = match get_as::<String>(store, store_key) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("Ignoring unreadable stored key '{}': {}", store_key, e);
            None
        }
    };

    let key = [stored.as_deref(), configured]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|k| !k.is_empty())
        .map(str::to_string);
    key
}

/// JSON file store. Every write is flushed to disk before returning.
pub struct JsonFileStore {
    path: PathBuf,
    data: Mutex<HashMap<String, Value>>,
}

impl JsonFileStore {
    /// Open the store at `path`, starting empty if the file does not exist.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();

        let data = if path.exists() {
            let json = std::fs::read_to_string(&path)
                .map_err(|e| StoreError::Read(format!("{}: {}", path.display(), e)))?;
            if json.trim().is_empty() {
                HashMap::new()
            } else {
                serde_json::from_str(&json)
                    .map_err(|e| StoreError::Read(format!("{}: {}", path.display(), e)))?
            }
        } else {
            HashMap::new()
        };

        tracing::info!("Opened state store at {:?} ({} keys)", path, data.len());
        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, data: &HashMap<String, Value>) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Write(e.to_string()))?;
        }

        let json =
            serde_json::to_string_pretty(data).map_err(|e| StoreError::Write(e.to_string()))?;

        // Write-then-rename; a crash mid-write must not truncate the state file.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| StoreError::Write(e.to_string()))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| StoreError::Write(e.to_string()))?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        Ok(self.data.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> StoreResult<()> {
        let mut data = self.data.lock();
        let mut next = data.clone();
        next.insert(key.to_string(), value);
        self.flush(&next)?;
        *data = next;
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        let mut data = self.data.lock();
        if !data.contains_key(key) {
            return Ok(());
        }

        let mut next = data.clone();
        next.remove(key);
        self.flush(&next)?;
        *data = next;
        Ok(())
    }
}

/// In-memory store for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryStore {
    data: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        Ok(self.data.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> StoreResult<()> {
        self.data.lock().insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        self.data.lock().remove(key);
        Ok(())
    }
}
