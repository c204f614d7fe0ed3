//! Feed retrieval with a relay fallback.

use std::sync::Arc;
use std::time::Duration;

use dashpanel_core::{FetchError, ReqwestErrorExt};
use reqwest::Client;
use tracing::instrument;

use crate::advisory::AdvisoryBoard;
use crate::parser::{parse_feed, FeedItem};

/// Notice posted when a feed only loaded through the relay
pub const RELAY_ADVISORY: &str = "Proxy used to fetch feeds (CORS blocked).";

/// Which path produced a feed's items
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchRoute {
    Direct,
    Relay,
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedFetch {
    pub items: Vec<FeedItem>,
    pub route: FetchRoute,
}

impl FeedFetch {
    fn failed() -> Self {
        Self {
            items: Vec::new(),
            route: FetchRoute::Failed,
        }
    }
}

pub struct FeedFetcher {
    client: Client,
    proxy_base_url: String,
    advisory: Arc<AdvisoryBoard>,
}

impl FeedFetcher {
    pub fn new(proxy_base_url: &str, advisory: Arc<AdvisoryBoard>) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(Self {
            client,
            proxy_base_url: proxy_base_url.to_string(),
            advisory,
        })
    }

    pub fn advisory(&self) -> &Arc<AdvisoryBoard> {
        &self.advisory
    }

    /// Relay address for `target`, e.g. `<proxy>?url=https%3A%2F%2F...`
    pub fn relay_url(&self, target: &str) -> String {
        let separator = if self.proxy_base_url.contains('?') { '&' } else { '?' };
        format!(
            "{}{}url={}",
            self.proxy_base_url,
            separator,
            urlencoding::encode(target)
        )
    }

    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
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
        Ok(body)
    }

    /// Fetch and parse one feed.
    ///
    /// The relay is tried once when the direct request fails or yields no
    /// items. A relay failure gives an empty result; there is no third attempt.
    #[instrument(skip(self), level = "debug")]
    pub async fn fetch(&self, url: &str) -> FeedFetch {
        match self.get_text(url).await {
            Ok(body) => {
                let items = parse_feed(&body, url);
                if !items.is_empty() {
                    return FeedFetch {
                        items,
                        route: FetchRoute::Direct,
                    };
                }
                tracing::warn!("Direct fetch of {} parsed no items, trying relay", url);
            }
            Err(e) => tracing::warn!("Direct fetch failed for {}, trying relay: {}", url, e),
        }

        match self.get_text(&self.relay_url(url)).await {
            Ok(body) => {
                let items = parse_feed(&body, url);
                if items.is_empty() {
                    tracing::warn!("Relay returned no items for {}", url);
                    return FeedFetch::failed();
                }
                self.advisory.post(RELAY_ADVISORY);
                FeedFetch {
                    items,
                    route: FetchRoute::Relay,
                }
            }
            Err(e) => {
                tracing::warn!("Relay fetch also failed for {}: {}", url, e);
                FeedFetch::failed()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FEED: &str = r#"<rss version="2.0"><channel>
        <item><title>One</title><link>https://example.com/1</link></item>
        <item><title>Two</title><link>https://example.com/2</link></item>
    </channel></rss>"#;

    fn fetcher(proxy: &str) -> FeedFetcher {
        FeedFetcher::new(proxy, Arc::new(AdvisoryBoard::new(Duration::from_secs(7)))).unwrap()
    }

    #[tokio::test]
    async fn test_direct_success_skips_relay() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/feed"))
            .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/relay"))
            .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
            .expect(0)
            .mount(&mock_server)
            .await;

        let fetcher = fetcher(&format!("{}/relay", mock_server.uri()));
        let result = fetcher.fetch(&format!("{}/feed", mock_server.uri())).await;

        assert_eq!(result.route, FetchRoute::Direct);
        assert_eq!(result.items.len(), 2);
        assert_eq!(fetcher.advisory().current(), None);
    }

    #[tokio::test]
    async fn test_unreachable_origin_uses_relay_and_posts_advisory() {
        let mock_server = MockServer::start().await;
        // Nothing listens on port 1
        let target = "http://127.0.0.1:1/feed/";

        Mock::given(method("GET"))
            .and(path("/raw"))
            .and(query_param("url", target))
            .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
            .expect(1)
            .mount(&mock_server)
            .await;

        let fetcher = fetcher(&format!("{}/raw", mock_server.uri()));
        let result = fetcher.fetch(target).await;

        assert_eq!(result.route, FetchRoute::Relay);
        assert_eq!(result.items[0].title, "One");
        assert_eq!(fetcher.advisory().current().as_deref(), Some(RELAY_ADVISORY));
    }

    #[tokio::test]
    async fn test_empty_direct_body_falls_back_to_relay() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/feed"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>blocked</html>"))
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/relay"))
            .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
            .expect(1)
            .mount(&mock_server)
            .await;

        let fetcher = fetcher(&format!("{}/relay", mock_server.uri()));
        let result = fetcher.fetch(&format!("{}/feed", mock_server.uri())).await;

        assert_eq!(result.route, FetchRoute::Relay);
    }

    #[tokio::test]
    async fn test_both_paths_failing_is_empty_after_two_requests() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/feed"))
            .respond_with(ResponseTemplate::new(403))
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/relay"))
            .respond_with(ResponseTemplate::new(502))
            .expect(1)
            .mount(&mock_server)
            .await;

        let fetcher = fetcher(&format!("{}/relay", mock_server.uri()));
        let result = fetcher.fetch(&format!("{}/feed", mock_server.uri())).await;

        assert_eq!(result, FeedFetch::failed());
        assert_eq!(fetcher.advisory().current(), None);
    }

    #[test]
    fn test_relay_url_encodes_target() {
        let plain = fetcher("https://relay.example/raw");
        assert_eq!(
            plain.relay_url("https://www.makeuseof.com/feed/?a=1&b=2"),
            "https://relay.example/raw?url=https%3A%2F%2Fwww.makeuseof.com%2Ffeed%2F%3Fa%3D1%26b%3D2"
        );

        let with_query = fetcher("https://relay.example/get?format=raw");
        assert!(with_query
            .relay_url("https://a.example/")
            .starts_with("https://relay.example/get?format=raw&url="));
    }
}
