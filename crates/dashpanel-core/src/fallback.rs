//! Live → cached → mock resolution for polled readings.
//!
//! A poll is attempted exactly once. A successful value is written to its
//! cache slot and returned as [`Resolved::Live`]. On failure the last known
//! good value is returned as [`Resolved::Cached`]; with no cached value the
//! static mock (if the domain has one) is returned as [`Resolved::Mock`];
//! otherwise the error itself surfaces as [`Resolved::Unavailable`].
//! Retrying is left to the next scheduled tick.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{FetchError, StoreError};
use crate::store::{get_as, set_as, KeyValueStore, StoreResult};

/// Which source a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Freshness {
    Live,
    Cached,
    Mock,
    Unavailable,
}

/// The single authoritative value for a reading.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved<T> {
    Live(T),
    /// Last known good value; the live attempt failed
    Cached(T),
    /// Static placeholder data; nothing was ever cached
    Mock(T),
    /// No value at all; render the error sentinel
    Unavailable(FetchError),
}

impl<T> Resolved<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Resolved::Live(v) | Resolved::Cached(v) | Resolved::Mock(v) => Some(v),
            Resolved::Unavailable(_) => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Resolved::Live(v) | Resolved::Cached(v) | Resolved::Mock(v) => Some(v),
            Resolved::Unavailable(_) => None,
        }
    }

    pub fn error(&self) -> Option<&FetchError> {
        match self {
            Resolved::Unavailable(e) => Some(e),
            _ => None,
        }
    }

    pub fn freshness(&self) -> Freshness {
        match self {
            Resolved::Live(_) => Freshness::Live,
            Resolved::Cached(_) => Freshness::Cached,
            Resolved::Mock(_) => Freshness::Mock,
            Resolved::Unavailable(_) => Freshness::Unavailable,
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, Resolved::Live(_))
    }
}

/// Read/write capability for the last known good value of one reading.
pub trait CacheSlot<T>: Send + Sync {
    fn read(&self) -> StoreResult<Option<T>>;

    fn write(&self, value: &T) -> StoreResult<()>;
}

/// Cache slot occupying a whole store key.
pub struct StoreSlot<T> {
    store: Arc<dyn KeyValueStore>,
    key: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> StoreSlot<T> {
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            _marker: PhantomData,
        }
    }
}

impl<T> CacheSlot<T> for StoreSlot<T>
where
    T: Serialize + DeserializeOwned,
{
    fn read(&self) -> StoreResult<Option<T>> {
        get_as(self.store.as_ref(), &self.key)
    }

    fn write(&self, value: &T) -> StoreResult<()> {
        set_as(self.store.as_ref(), &self.key, value)
    }
}

/// Cache slot occupying one entry of a JSON object stored under a key.
///
/// Writes are read-modify-write on the whole object; callers must not write
/// two entries of the same key concurrently.
pub struct MapEntrySlot<T> {
    store: Arc<dyn KeyValueStore>,
    key: String,
    entry: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> MapEntrySlot<T> {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        key: impl Into<String>,
        entry: impl Into<String>,
    ) -> Self {
        Self {
            store,
            key: key.into(),
            entry: entry.into(),
            _marker: PhantomData,
        }
    }

    fn load_map(&self) -> StoreResult<Map<String, Value>> {
        match self.store.get(&self.key)? {
            Some(Value::Object(map)) => Ok(map),
            None | Some(Value::Null) => Ok(Map::new()),
            Some(_) => Err(StoreError::Shape {
                key: self.key.clone(),
                message: "expected an object".to_string(),
            }),
        }
    }
}

impl<T> CacheSlot<T> for MapEntrySlot<T>
where
    T: Serialize + DeserializeOwned,
{
    fn read(&self) -> StoreResult<Option<T>> {
        let mut map = self.load_map()?;
        match map.remove(&self.entry) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| StoreError::Shape {
                    key: format!("{}.{}", self.key, self.entry),
                    message: e.to_string(),
                }),
        }
    }

    fn write(&self, value: &T) -> StoreResult<()> {
        // A corrupt object is replaced rather than blocking every future write.
        let mut map = self.load_map().unwrap_or_default();
        let value = serde_json::to_value(value).map_err(|e| StoreError::Shape {
            key: format!("{}.{}", self.key, self.entry),
            message: e.to_string(),
        })?;
        map.insert(self.entry.clone(), value);
        self.store.set(&self.key, Value::Object(map))
    }
}

/// Attempt `operation` once and resolve to live, cached, mock or unavailable.
///
/// Cache errors are logged and treated as a cache miss; they never escalate.
pub async fn fetch_with_fallback<T, Fut>(
    label: &str,
    operation: Fut,
    cache: &dyn CacheSlot<T>,
    mock: Option<T>,
) -> Resolved<T>
where
    Fut: Future<Output = Result<T, FetchError>>,
{
    let error = match operation.await {
        Ok(value) => {
            if let Err(e) = cache.write(&value) {
                tracing::warn!("{}: failed to cache live value: {}", label, e);
            }
            return Resolved::Live(value);
        }
        Err(e) => e,
    };

    tracing::warn!("{}: live fetch failed ({:?}): {}", label, error.kind(), error);

    match cache.read() {
        Ok(Some(cached)) => {
            tracing::info!("{}: using cached value", label);
            return Resolved::Cached(cached);
        }
        Ok(None) => {}
        Err(e) => tracing::warn!("{}: cache unreadable: {}", label, e),
    }

    match mock {
        Some(mock) => {
            tracing::info!("{}: using mock data", label);
            Resolved::Mock(mock)
        }
        None => Resolved::Unavailable(error),
    }
}
