use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::error::ConfigError;

/// Environment variable overriding the weather API key
pub const WEATHER_KEY_ENV: &str = "OPENWEATHER_API_KEY";
/// Environment variable overriding the market API key
pub const MARKET_KEY_ENV: &str = "ALPHA_VANTAGE_API_KEY";
/// Longest accepted refresh interval: one week
pub const MAX_REFRESH_MINUTES: u64 = 7 * 24 * 60;

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Measurement units requested from the weather API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Imperial,
    Metric,
}

impl Units {
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Imperial => "imperial",
            Units::Metric => "metric",
        }
    }
}

/// A fixed weather location. Immutable at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Unique key of the display slot for this location
    pub id_prefix: String,
    /// Geocoding query sent to the weather API (e.g. "Dublin,IE")
    pub query: String,
    #[serde(default)]
    pub units: Units,
    /// IANA time zone name
    pub time_zone: String,
}

impl Location {
    pub fn new(id_prefix: &str, query: &str, units: Units, time_zone: &str) -> Self {
        Self {
            id_prefix: id_prefix.to_string(),
            query: query.to_string(),
            units,
            time_zone: time_zone.to_string(),
        }
    }
}

/// A market index approximated through a proxy instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketIndex {
    /// Proxy instrument ticker
    pub symbol: String,
    /// Display name of the index
    pub name: String,
    /// Proxy price to index value scale factor (approximate)
    pub multiplier: f64,
}

impl MarketIndex {
    pub fn new(symbol: &str, name: &str, multiplier: f64) -> Self {
        Self {
            symbol: symbol.to_string(),
            name: name.to_string(),
            multiplier,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application configuration directory
    #[serde(default = "default_config_dir")]
    pub config_dir: PathBuf,

    #[serde(default)]
    pub clock: ClockConfig,

    #[serde(default)]
    pub weather: WeatherConfig,

    #[serde(default)]
    pub market: MarketConfig,

    #[serde(default)]
    pub feeds: FeedsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClockConfig {
    /// Tick interval in milliseconds
    pub tick_millis: u64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self { tick_millis: 1000 }
    }
}

impl ClockConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.tick_millis)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    pub base_url: String,

    /// API key; a user override in the store takes precedence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Refresh interval in seconds
    pub refresh_seconds: u64,

    pub locations: Vec<Location>,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openweathermap.org/data/2.5/weather".to_string(),
            api_key: None,
            refresh_seconds: 10,
            locations: vec![
                Location::new("local", "West Chester,US", Units::Imperial, "America/New_York"),
                Location::new("delhi", "New Delhi,IN", Units::Imperial, "Asia/Kolkata"),
                Location::new("ireland", "Dublin,IE", Units::Imperial, "Europe/Dublin"),
            ],
        }
    }
}

impl WeatherConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    pub base_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Refresh interval in minutes
    pub refresh_minutes: u64,

    /// Mandatory pause between successive quote requests, in seconds
    pub request_delay_seconds: u64,

    pub indices: Vec<MarketIndex>,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.alphavantage.co/query".to_string(),
            api_key: None,
            refresh_minutes: 15,
            request_delay_seconds: 12,
            indices: vec![
                MarketIndex::new("SPY", "S&P 500", 10.0),
                MarketIndex::new("DIA", "Dow Jones", 100.0),
                MarketIndex::new("QQQ", "NASDAQ", 30.0),
            ],
        }
    }
}

impl MarketConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_minutes.saturating_mul(60))
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_secs(self.request_delay_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedsConfig {
    /// Read-through relay used when a direct fetch fails
    pub proxy_base_url: String,

    /// Subscriptions seeded on first run
    pub default_feeds: Vec<String>,

    /// Refresh interval in minutes
    pub refresh_minutes: u64,

    /// How long the relay advisory stays visible, in seconds
    pub advisory_seconds: u64,
}

impl Default for FeedsConfig {
    fn default() -> Self {
        Self {
            proxy_base_url: "https://api.allorigins.win/raw".to_string(),
            default_feeds: vec!["https://www.makeuseof.com/feed/".to_string()],
            refresh_minutes: 30,
            advisory_seconds: 7,
        }
    }
}

impl FeedsConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_minutes.saturating_mul(60))
    }

    pub fn advisory_ttl(&self) -> Duration {
        Duration::from_secs(self.advisory_seconds)
    }
}

fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("dashpanel")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_dir: default_config_dir(),
            clock: ClockConfig::default(),
            weather: WeatherConfig::default(),
            market: MarketConfig::default(),
            feeds: FeedsConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the user config dir, creating a default file if missing
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from an explicit path, creating a default file if missing
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            let config = Self::default();
            config.save_to(config_path)?;
            return Ok(config);
        }

        let contents =
            std::fs::read_to_string(config_path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(format!("{}: {}", config_path.display(), e)))?;

        Ok(config)
    }

    /// Load configuration and validate it, logging warnings
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        Self::load()?.into_validated()
    }

    /// Validate, failing with [`ConfigError::Invalid`] if any errors were found
    pub fn into_validated(self) -> Result<(Self, ValidationResult)> {
        let validation = self.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((self, validation))
    }

    /// Keys from the environment replace keys from the file
    pub fn apply_env_overrides(&mut self) {
        if let Some(key) = non_blank_env(WEATHER_KEY_ENV) {
            self.weather.api_key = Some(key);
        }
        if let Some(key) = non_blank_env(MARKET_KEY_ENV) {
            self.market.api_key = Some(key);
        }
    }

    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.clock.tick_millis == 0 {
            result.add_error("clock.tick_millis", "Clock tick must be greater than 0");
        }

        // Weather
        validate_url(&self.weather.base_url, "weather.base_url", &mut result);
        if self.weather.refresh_seconds == 0 {
            result.add_error(
                "weather.refresh_seconds",
                "Weather refresh interval must be greater than 0",
            );
        } else if self.weather.refresh_seconds > MAX_REFRESH_MINUTES * 60 {
            result.add_error(
                "weather.refresh_seconds",
                "Weather refresh interval must be at most one week",
            );
        }
        if self.weather.locations.is_empty() {
            result.add_warning("weather.locations", "No weather locations configured");
        }
        let mut prefixes = std::collections::HashSet::new();
        for (i, location) in self.weather.locations.iter().enumerate() {
            let field = format!("weather.locations[{}]", i);
            if location.id_prefix.trim().is_empty() {
                result.add_error(&field, "id_prefix must not be empty");
            } else if !prefixes.insert(location.id_prefix.as_str()) {
                result.add_error(&field, format!("Duplicate id_prefix: {}", location.id_prefix));
            }
            if location.query.trim().is_empty() {
                result.add_error(&field, "query must not be empty");
            }
            if location.time_zone.parse::<chrono_tz::Tz>().is_err() {
                result.add_error(
                    &field,
                    format!("Unknown time zone: {}", location.time_zone),
                );
            }
        }
        if self.weather.api_key.is_none() {
            result.add_warning(
                "weather.api_key",
                "Weather API key not configured - readings need a stored key",
            );
        }

        // Market
        validate_url(&self.market.base_url, "market.base_url", &mut result);
        if self.market.refresh_minutes == 0 {
            result.add_error(
                "market.refresh_minutes",
                "Market refresh interval must be greater than 0",
            );
        } else if self.market.refresh_minutes > MAX_REFRESH_MINUTES {
            result.add_error(
                "market.refresh_minutes",
                "Market refresh interval must be at most one week",
            );
        }
        if self.market.request_delay_seconds == 0 {
            result.add_warning(
                "market.request_delay_seconds",
                "No delay between quote requests - the provider may throttle",
            );
        }
        for (i, index) in self.market.indices.iter().enumerate() {
            if !index.multiplier.is_finite() || index.multiplier <= 0.0 {
                result.add_error(
                    format!("market.indices[{}]", i),
                    "multiplier must be a positive number",
                );
            }
        }

        // Feeds
        validate_url(&self.feeds.proxy_base_url, "feeds.proxy_base_url", &mut result);
        for (i, feed) in self.feeds.default_feeds.iter().enumerate() {
            validate_url(feed, &format!("feeds.default_feeds[{}]", i), &mut result);
        }
        if self.feeds.refresh_minutes == 0 {
            result.add_error(
                "feeds.refresh_minutes",
                "Feed refresh interval must be greater than 0",
            );
        } else if self.feeds.refresh_minutes > MAX_REFRESH_MINUTES {
            result.add_error(
                "feeds.refresh_minutes",
                "Feed refresh interval must be at most one week",
            );
        }

        result
    }

    /// Save configuration to the user config dir
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(config_path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Path of the persisted key/value state file
    pub fn state_path(&self) -> PathBuf {
        self.config_dir.join("state.json")
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("dashpanel");

        Ok(config_dir.join("config.toml"))
    }
}

fn non_blank_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Validate an http(s) URL field
pub fn validate_url(url_str: &str, field_name: &str, result: &mut ValidationResult) {
    match Url::parse(url_str) {
        Ok(url) => {
            if url.scheme() != "http" && url.scheme() != "https" {
                result.add_error(
                    field_name,
                    format!("URL must use http or https scheme, got: {}", url.scheme()),
                );
            }
            if url.host().is_none() {
                result.add_error(field_name, "URL must have a host");
            }
        }
        Err(e) => {
            result.add_error(field_name, format!("Invalid URL: {}", e));
        }
    }
}
