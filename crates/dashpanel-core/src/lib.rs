pub mod config;
pub mod error;
pub mod fallback;
pub mod store;

pub use config::{
    ClockConfig, Config, FeedsConfig, Location, MarketConfig, MarketIndex, Units,
    ValidationResult, WeatherConfig,
};
pub use error::{AppError, ConfigError, ErrorKind, FetchError, ReqwestErrorExt, StoreError};
pub use fallback::{fetch_with_fallback, CacheSlot, Freshness, MapEntrySlot, Resolved, StoreSlot};
pub use store::{JsonFileStore, KeyValueStore, MemoryStore};

use anyhow::Result;

/// Initialize logging for the process
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    tracing::info!("dashpanel core initialized");
    Ok(())
}
