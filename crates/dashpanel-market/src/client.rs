//! Alpha Vantage GLOBAL_QUOTE client.

use std::time::Duration;

use dashpanel_core::{FetchError, ReqwestErrorExt};
use reqwest::Client;
use serde::Deserialize;
use tracing::instrument;

use crate::types::ProxyQuote;

/// Result of a single quote request that reached the provider
#[derive(Debug, Clone, PartialEq)]
pub enum QuoteResponse {
    Quote(ProxyQuote),
    /// The provider answered with a rate-limit or quota notice
    Throttled(String),
}

#[derive(Debug, Deserialize)]
struct GlobalQuoteEnvelope {
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
    #[serde(rename = "Global Quote")]
    global_quote: Option<GlobalQuote>,
}

#[derive(Debug, Deserialize)]
struct GlobalQuote {
    #[serde(rename = "05. price")]
    price: Option<String>,
    #[serde(rename = "09. change")]
    change: Option<String>,
    #[serde(rename = "10. change percent")]
    change_percent: Option<String>,
}

impl GlobalQuote {
    fn into_proxy(self, symbol: &str) -> Result<ProxyQuote, FetchError> {
        let price = parse_number(self.price.as_deref())
            .ok_or_else(|| FetchError::parse(format!("{}: missing price", symbol)))?;
        let change = parse_number(self.change.as_deref()).unwrap_or(0.0);
        let change_percent = parse_number(
            self.change_percent
                .as_deref()
                .map(|p| p.trim().trim_end_matches('%')),
        )
        .unwrap_or(0.0);

        Ok(ProxyQuote {
            price,
            change,
            change_percent,
        })
    }
}

fn parse_number(raw: Option<&str>) -> Option<f64> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|n| n.is_finite())
}

#[derive(Debug, Clone)]
pub struct QuoteClient {
    client: Client,
    base_url: String,
}

impl QuoteClient {
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

    /// Request the latest quote for one proxy symbol.
    ///
    /// A `Note` or `Information` field takes precedence over any quote data
    /// in the same body.
    #[instrument(skip(self, api_key), level = "debug")]
    pub async fn fetch_quote(
        &self,
        symbol: &str,
        api_key: &str,
    ) -> Result<QuoteResponse, FetchError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("function", "GLOBAL_QUOTE"),
                ("symbol", symbol),
                ("apikey", api_key),
            ])
            .send()
            .await
            .map_err(|e| e.into_fetch_error())?;

        let status = response.status();
        let body = response.text().await.map_err(|e| e.into_fetch_error())?;

        if !status.is_success() {
            return Err(FetchError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: GlobalQuoteEnvelope = serde_json::from_str(&body)
            .map_err(|e| FetchError::parse(format!("quote response for {}: {}", symbol, e)))?;

        if let Some(notice) = envelope.note.or(envelope.information) {
            return Ok(QuoteResponse::Throttled(notice));
        }

        let quote = envelope
            .global_quote
            .ok_or_else(|| FetchError::parse(format!("{}: no Global Quote in response", symbol)))?;

        quote.into_proxy(symbol).map(QuoteResponse::Quote)
    }
}
