//! Sequential, rate-limited market polling.
//!
//! The free quote tier allows a handful of requests per minute, so indices are
//! requested one at a time with a fixed pause between requests. A throttle
//! notice stops the batch; there is no point spending more quota on it.

use std::sync::Arc;
use std::time::Duration;

use dashpanel_core::{FetchError, MarketIndex};

use crate::client::{QuoteClient, QuoteResponse};
use crate::types::MarketQuote;

/// Key value that the provider accepts but rate limits into uselessness
const DEMO_KEY: &str = "demo";

/// What one pass over the configured indices produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarketBatch {
    pub quotes: Vec<MarketQuote>,
    /// Throttle notice that ended the batch early, if any
    pub throttled: Option<String>,
    /// Requests actually issued
    pub requests: usize,
}

impl MarketBatch {
    /// Collapse the batch into a single result for the fallback layer.
    pub fn into_result(self) -> Result<Vec<MarketQuote>, FetchError> {
        if !self.quotes.is_empty() {
            return Ok(self.quotes);
        }

        match self.throttled {
            Some(notice) => Err(FetchError::Throttled(notice)),
            None => Err(FetchError::parse("no quotes in market batch")),
        }
    }
}

pub struct MarketPoller {
    client: Arc<QuoteClient>,
    indices: Vec<MarketIndex>,
    request_delay: Duration,
}

impl MarketPoller {
    pub fn new(client: Arc<QuoteClient>, indices: Vec<MarketIndex>, request_delay: Duration) -> Self {
        Self {
            client,
            indices,
            request_delay,
        }
    }

    pub fn indices(&self) -> &[MarketIndex] {
        &self.indices
    }

    /// Request each index in order, pausing between requests.
    ///
    /// Failed requests are logged and skipped. The pause still applies after
    /// a failure but never after the last request.
    pub async fn fetch_batch(&self, api_key: &str) -> MarketBatch {
        let mut batch = MarketBatch::default();

        for (position, index) in self.indices.iter().enumerate() {
            if position > 0 && !self.request_delay.is_zero() {
                tokio::time::sleep(self.request_delay).await;
            }

            batch.requests += 1;
            tracing::debug!("Fetching quote for {}", index.symbol);

            match self.client.fetch_quote(&index.symbol, api_key).await {
                Ok(QuoteResponse::Quote(proxy)) => {
                    batch.quotes.push(MarketQuote::from_proxy(index, &proxy));
                }
                Ok(QuoteResponse::Throttled(notice)) => {
                    tracing::warn!("Market API limit reached at {}: {}", index.symbol, notice);
                    batch.throttled = Some(notice);
                    break;
                }
                Err(e) => {
                    tracing::error!("Market fetch failed for {}: {}", index.symbol, e);
                }
            }
        }

        tracing::info!(
            "Market batch complete: {} quotes from {} requests",
            batch.quotes.len(),
            batch.requests
        );
        batch
    }

    /// Poll all indices.
    ///
    /// A missing, blank or demo key fails with `NoCredential` and no request
    /// is made. An empty batch is an error so the caller falls back.
    pub async fn poll(&self, api_key: Option<&str>) -> Result<Vec<MarketQuote>, FetchError> {
        let key = match api_key.map(str::trim) {
            Some(key) if !key.is_empty() && !key.eq_ignore_ascii_case(DEMO_KEY) => key,
            _ => {
                tracing::warn!("No market API key; skipping quote requests");
                return Err(FetchError::no_credential("market"));
            }
        };

        self.fetch_batch(key).await.into_result()
    }
}
