//! The dashboard context: pollers, persisted lists and the render sink.

use std::sync::Arc;

use dashpanel_core::store::{
    resolve_api_key, KEY_LAST_MARKET, KEY_LAST_WEATHER, KEY_MARKET_API, KEY_WEATHER_API,
};
use dashpanel_core::{fetch_with_fallback, AppError, Config, KeyValueStore, MapEntrySlot, StoreSlot};
use dashpanel_feeds::{AdvisoryBoard, FeedFetcher};
use dashpanel_market::{mock_quotes, MarketPoller, MarketQuote, QuoteClient};
use dashpanel_weather::{LocationReading, WeatherPoller, WeatherProvider, WeatherReading};
use parking_lot::{Mutex, MutexGuard};

use crate::clock::Clock;
use crate::error::ListError;
use crate::scheduler::{Domain, Scheduler};
use crate::sink::RenderSink;
use crate::subscriptions::FeedSubscriptions;
use crate::todo::TodoList;

pub struct Dashboard {
    config: Config,
    store: Arc<dyn KeyValueStore>,
    sink: Arc<dyn RenderSink>,
    clock: Clock,
    weather: WeatherPoller,
    market: MarketPoller,
    feeds: FeedFetcher,
    advisory: Arc<AdvisoryBoard>,
    /// Last advisory handed to the sink
    shown_advisory: Mutex<Option<String>>,
    todos: Mutex<TodoList>,
    subscriptions: Mutex<FeedSubscriptions>,
}

impl Dashboard {
    pub fn new(
        config: Config,
        store: Arc<dyn KeyValueStore>,
        sink: Arc<dyn RenderSink>,
    ) -> Result<Self, AppError> {
        let provider = Arc::new(WeatherProvider::new(&config.weather.base_url)?);
        let weather = WeatherPoller::new(provider, config.weather.locations.clone());

        let quotes = Arc::new(QuoteClient::new(&config.market.base_url)?);
        let market = MarketPoller::new(
            quotes,
            config.market.indices.clone(),
            config.market.request_delay(),
        );

        let advisory = Arc::new(AdvisoryBoard::new(config.feeds.advisory_ttl()));
        let feeds = FeedFetcher::new(&config.feeds.proxy_base_url, advisory.clone())?;

        let todos = TodoList::load(store.clone())?;
        let subscriptions = FeedSubscriptions::load(store.clone(), &config.feeds.default_feeds)?;

        Ok(Self {
            clock: Clock::new(&config.weather.locations),
            config,
            store,
            sink,
            weather,
            market,
            feeds,
            advisory,
            shown_advisory: Mutex::new(None),
            todos: Mutex::new(todos),
            subscriptions: Mutex::new(subscriptions),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn todos(&self) -> MutexGuard<'_, TodoList> {
        self.todos.lock()
    }

    pub fn subscriptions(&self) -> MutexGuard<'_, FeedSubscriptions> {
        self.subscriptions.lock()
    }

    /// Render the clock and expire the feed advisory when due.
    pub fn tick_clock(&self) {
        self.sink.clock(&self.clock.snapshot());
        self.publish_advisory();
    }

    /// Poll every location and render each one with its fallback applied.
    pub async fn refresh_weather(&self) {
        let key = resolve_api_key(
            self.store.as_ref(),
            KEY_WEATHER_API,
            self.config.weather.api_key.as_deref(),
        );

        let readings = self.weather.poll_all(key.as_deref()).await;

        // Cache entries share one stored object, so resolve them one at a time.
        for LocationReading { location, result } in readings {
            let slot = MapEntrySlot::<WeatherReading>::new(
                self.store.clone(),
                KEY_LAST_WEATHER,
                location.id_prefix.clone(),
            );
            let label = format!("weather:{}", location.id_prefix);
            let resolved = fetch_with_fallback(&label, async move { result }, &slot, None).await;
            self.sink.weather(&location, &resolved);
        }
    }

    pub async fn refresh_market(&self) {
        let key = resolve_api_key(
            self.store.as_ref(),
            KEY_MARKET_API,
            self.config.market.api_key.as_deref(),
        );

        let slot = StoreSlot::<Vec<MarketQuote>>::new(self.store.clone(), KEY_LAST_MARKET);
        let resolved = fetch_with_fallback(
            "market",
            self.market.poll(key.as_deref()),
            &slot,
            Some(mock_quotes()),
        )
        .await;
        self.sink.market(&resolved);
    }

    /// Fetch and render each subscribed feed in list order.
    pub async fn refresh_feeds(&self) {
        let urls = self.subscriptions.lock().feeds().to_vec();
        if urls.is_empty() {
            tracing::debug!("No feed subscriptions");
        }

        for url in urls {
            let fetch = self.feeds.fetch(&url).await;
            self.sink.feed(&url, &fetch);
        }
        self.publish_advisory();
    }

    /// Subscribe to a feed and render it right away.
    pub async fn add_feed(&self, url: &str) -> Result<bool, ListError> {
        let added = self.subscriptions.lock().add(url)?;
        if added {
            let url = url.trim();
            let fetch = self.feeds.fetch(url).await;
            self.sink.feed(url, &fetch);
            self.publish_advisory();
        }
        Ok(added)
    }

    /// Start all periodic updates on `scheduler`.
    pub fn start(self: &Arc<Self>, scheduler: &mut Scheduler) {
        let dashboard = self.clone();
        scheduler.start(Domain::Clock, self.config.clock.interval(), move || {
            let dashboard = dashboard.clone();
            async move { dashboard.tick_clock() }
        });

        let dashboard = self.clone();
        scheduler.start(
            Domain::Weather,
            self.config.weather.refresh_interval(),
            move || {
                let dashboard = dashboard.clone();
                async move { dashboard.refresh_weather().await }
            },
        );

        let dashboard = self.clone();
        scheduler.start(
            Domain::Market,
            self.config.market.refresh_interval(),
            move || {
                let dashboard = dashboard.clone();
                async move { dashboard.refresh_market().await }
            },
        );

        let dashboard = self.clone();
        scheduler.start(
            Domain::Feeds,
            self.config.feeds.refresh_interval(),
            move || {
                let dashboard = dashboard.clone();
                async move { dashboard.refresh_feeds().await }
            },
        );
    }

    fn publish_advisory(&self) {
        let current = self.advisory.current();
        let mut shown = self.shown_advisory.lock();
        if *shown != current {
            self.sink.advisory(current.as_deref());
            *shown = current;
        }
    }
}
