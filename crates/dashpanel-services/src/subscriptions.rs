//! The user's list of feed URLs.

use std::sync::Arc;

use dashpanel_core::store::{get_as, set_as, KEY_FEEDS};
use dashpanel_core::{KeyValueStore, StoreError};
use url::Url;

use crate::error::{ListError, ListResult};

pub struct FeedSubscriptions {
    store: Arc<dyn KeyValueStore>,
    feeds: Vec<String>,
}

impl FeedSubscriptions {
    /// Load subscriptions, seeding `defaults` when none have ever been saved.
    pub fn load(store: Arc<dyn KeyValueStore>, defaults: &[String]) -> Result<Self, StoreError> {
        let stored = match get_as::<Vec<String>>(store.as_ref(), KEY_FEEDS) {
            Ok(stored) => stored,
            Err(e @ StoreError::Shape { .. }) => {
                tracing::warn!("Discarding unreadable feed list: {}", e);
                None
            }
            Err(e) => return Err(e),
        };

        let feeds = match stored {
            Some(feeds) => feeds,
            None => {
                tracing::info!("Seeding {} default feed(s)", defaults.len());
                set_as(store.as_ref(), KEY_FEEDS, defaults)?;
                defaults.to_vec()
            }
        };

        Ok(Self { store, feeds })
    }

    pub fn feeds(&self) -> &[String] {
        &self.feeds
    }

    /// Subscribe to `url`, placing it first.
    ///
    /// Returns `false` when already subscribed; nothing changes in that case.
    pub fn add(&mut self, url: &str) -> ListResult<bool> {
        let url = url.trim();
        validate_feed_url(url)?;

        if self.feeds.iter().any(|f| f == url) {
            return Ok(false);
        }

        let mut next = self.feeds.clone();
        next.insert(0, url.to_string());
        self.save(next)?;
        Ok(true)
    }

    /// Returns `false` when `url` was not subscribed.
    pub fn remove(&mut self, url: &str) -> ListResult<bool> {
        let url = url.trim();
        if !self.feeds.iter().any(|f| f == url) {
            return Ok(false);
        }

        let next = self.feeds.iter().filter(|f| *f != url).cloned().collect();
        self.save(next)?;
        Ok(true)
    }

    fn save(&mut self, next: Vec<String>) -> ListResult<()> {
        set_as(self.store.as_ref(), KEY_FEEDS, &next)?;
        self.feeds = next;
        Ok(())
    }
}

fn validate_feed_url(raw: &str) -> ListResult<()> {
    if raw.is_empty() {
        return Err(ListError::validation("feed URL is empty"));
    }

    match Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.host_str().is_some() => Ok(()),
        Ok(url) => Err(ListError::validation(format!(
            "unsupported feed URL scheme '{}'",
            url.scheme()
        ))),
        Err(e) => Err(ListError::validation(format!("invalid feed URL: {}", e))),
    }
}
