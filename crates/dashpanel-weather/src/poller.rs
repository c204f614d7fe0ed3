//! Concurrent weather polling across all configured locations.

use std::sync::Arc;

use dashpanel_core::{FetchError, Location};
use tokio::task::JoinSet;

use crate::provider::WeatherProvider;
use crate::types::WeatherReading;

/// Outcome of one location's poll, keyed by its display slot
#[derive(Debug, Clone)]
pub struct LocationReading {
    pub location: Location,
    pub result: Result<WeatherReading, FetchError>,
}

impl LocationReading {
    pub fn id_prefix(&self) -> &str {
        &self.location.id_prefix
    }
}

pub struct WeatherPoller {
    provider: Arc<WeatherProvider>,
    locations: Arc<Vec<Location>>,
}

impl WeatherPoller {
    pub fn new(provider: Arc<WeatherProvider>, locations: Vec<Location>) -> Self {
        Self {
            provider,
            locations: Arc::new(locations),
        }
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    /// Poll every location concurrently.
    ///
    /// Results come back in configuration order. One location failing (or
    /// its task panicking) never affects another.
    pub async fn poll_all(&self, api_key: Option<&str>) -> Vec<LocationReading> {
        let key = api_key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string);

        if key.is_none() {
            tracing::warn!("No weather API key; skipping {} locations", self.locations.len());
            return self
                .locations
                .iter()
                .map(|location| LocationReading {
                    location: location.clone(),
                    result: Err(FetchError::no_credential("weather")),
                })
                .collect();
        }

        let mut tasks = JoinSet::new();
        for (slot, location) in self.locations.iter().enumerate() {
            let provider = self.provider.clone();
            let location = location.clone();
            let key = key.clone();
            tasks.spawn(async move {
                let result = provider.fetch(&location, key.as_deref()).await;
                (slot, result)
            });
        }

        let mut results: Vec<Option<Result<WeatherReading, FetchError>>> =
            vec![None; self.locations.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((slot, result)) => results[slot] = Some(result),
                Err(e) => tracing::error!("Weather task failed: {}", e),
            }
        }

        self.locations
            .iter()
            .zip(results)
            .map(|(location, result)| LocationReading {
                location: location.clone(),
                result: result.unwrap_or_else(|| {
                    Err(FetchError::Network("weather task aborted".to_string()))
                }),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashpanel_core::{ErrorKind, Units};
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn locations() -> Vec<Location> {
        vec![
            Location::new("local", "West Chester,US", Units::Imperial, "America/New_York"),
            Location::new("delhi", "New Delhi,IN", Units::Imperial, "Asia/Kolkata"),
            Location::new("ireland", "Dublin,IE", Units::Imperial, "Europe/Dublin"),
        ]
    }

    fn body(name: &str, temp: f64) -> serde_json::Value {
        serde_json::json!({
            "main": {"temp": temp},
            "weather": [{"id": 800, "icon": "01d", "main": "Clear"}],
            "name": name
        })
    }

    fn poller(base_url: &str) -> WeatherPoller {
        let provider = Arc::new(WeatherProvider::new(base_url).unwrap());
        WeatherPoller::new(provider, locations())
    }

    #[tokio::test]
    async fn test_missing_key_issues_no_requests() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body("x", 1.0)))
            .expect(0)
            .mount(&mock_server)
            .await;

        let poller = poller(&mock_server.uri());

        for key in [None, Some(""), Some("  ")] {
            let readings = poller.poll_all(key).await;
            assert_eq!(readings.len(), 3);
            for reading in &readings {
                let err = reading.result.as_ref().unwrap_err();
                assert_eq!(err.kind(), ErrorKind::NoCredential);
            }
        }
    }

    #[tokio::test]
    async fn test_one_failure_does_not_affect_siblings() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(query_param("q", "West Chester,US"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body("West Chester", 70.0)))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("q", "New Delhi,IN"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("q", "Dublin,IE"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body("Dublin", 50.0)))
            .mount(&mock_server)
            .await;

        let readings = poller(&mock_server.uri()).poll_all(Some("key")).await;

        let prefixes: Vec<&str> = readings.iter().map(|r| r.id_prefix()).collect();
        assert_eq!(prefixes, vec!["local", "delhi", "ireland"]);

        assert_eq!(readings[0].result.as_ref().unwrap().location_name, "West Chester");
        assert_eq!(
            readings[1].result.as_ref().unwrap_err(),
            &FetchError::Http {
                status: 500,
                body: "upstream down".to_string()
            }
        );
        assert_eq!(readings[2].result.as_ref().unwrap().location_name, "Dublin");
    }

    #[tokio::test]
    async fn test_all_locations_requested_once() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body("Anywhere", 60.0)))
            .expect(3)
            .mount(&mock_server)
            .await;

        let readings = poller(&mock_server.uri()).poll_all(Some("key")).await;
        assert!(readings.iter().all(|r| r.result.is_ok()));
    }
}
