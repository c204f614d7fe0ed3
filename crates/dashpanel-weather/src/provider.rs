//! OpenWeather current-conditions client.

use std::time::Duration;

use dashpanel_core::{FetchError, Location, ReqwestErrorExt};
use reqwest::Client;
use tracing::instrument;

use crate::types::{CurrentWeatherResponse, WeatherReading};

#[derive(Debug, Clone)]
pub struct WeatherProvider {
    client: Client,
    base_url: String,
}

impl WeatherProvider {
    pub fn new(base_url: &str) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
        })
    }

    /// Fetch current conditions for one location.
    ///
    /// A missing or blank key fails with `NoCredential` before any request is made.
    #[instrument(skip(self, api_key), fields(location = %location.id_prefix), level = "debug")]
    pub async fn fetch(
        &self,
        location: &Location,
        api_key: Option<&str>,
    ) -> Result<WeatherReading, FetchError> {
        let key = match api_key.map(str::trim).filter(|k| !k.is_empty()) {
            Some(key) => key,
            None => return Err(FetchError::no_credential("weather")),
        };

        tracing::debug!("Fetching weather for {}", location.query);

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("q", location.query.as_str()),
                ("units", location.units.as_str()),
                ("appid", key),
            ])
            .send()
            .await
            .map_err(|e| e.into_fetch_error())?;

        let status = response.status();
        let body = response.text().await.map_err(|e| e.into_fetch_error())?;

        if !status.is_success() {
            tracing::error!("Weather API error for {}: {} {}", location.id_prefix, status, body);
            return Err(FetchError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: CurrentWeatherResponse = serde_json::from_str(&body)
            .map_err(|e| FetchError::parse(format!("weather response: {}", e)))?;

        Ok(WeatherReading::from(parsed))
    }
}
