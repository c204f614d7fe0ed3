//! Presentation boundary.
//!
//! The dashboard hands every resolved value to a [`RenderSink`]. A sink never
//! sees a raw fetch failure; an unavailable reading arrives as
//! [`Resolved::Unavailable`] and is shown as its placeholder text.

use dashpanel_core::{Location, Resolved};
use dashpanel_feeds::{FeedFetch, FetchRoute, RENDER_ITEMS};
use dashpanel_market::MarketQuote;
use dashpanel_weather::WeatherReading;

use crate::clock::ClockSnapshot;

pub trait RenderSink: Send + Sync {
    fn clock(&self, snapshot: &ClockSnapshot);

    fn weather(&self, location: &Location, reading: &Resolved<WeatherReading>);

    fn market(&self, quotes: &Resolved<Vec<MarketQuote>>);

    fn feed(&self, url: &str, fetch: &FeedFetch);

    /// Called when the feed advisory appears or clears.
    fn advisory(&self, message: Option<&str>);
}

/// Writes every update to the log.
#[derive(Debug, Default)]
pub struct LogSink;

impl RenderSink for LogSink {
    fn clock(&self, snapshot: &ClockSnapshot) {
        tracing::trace!("{} {} {}", snapshot.time, snapshot.meridiem, snapshot.date);
    }

    fn weather(&self, location: &Location, reading: &Resolved<WeatherReading>) {
        match reading.value() {
            Some(r) => tracing::info!(
                location = %location.id_prefix,
                freshness = ?reading.freshness(),
                "{} {}",
                r.label(),
                r.location_name
            ),
            None => tracing::info!(
                location = %location.id_prefix,
                "-- {}",
                reading.error().map(|e| e.user_message()).unwrap_or("Error")
            ),
        }
    }

    fn market(&self, quotes: &Resolved<Vec<MarketQuote>>) {
        let Some(list) = quotes.value() else {
            tracing::info!("Market data unavailable");
            return;
        };

        for quote in list {
            tracing::info!(
                freshness = ?quotes.freshness(),
                "{} {} {}",
                quote.name,
                quote.formatted_price(),
                quote.formatted_change_percent()
            );
        }
    }

    fn feed(&self, url: &str, fetch: &FeedFetch) {
        if fetch.route == FetchRoute::Failed {
            tracing::info!("{}: failed to fetch (CORS or invalid feed)", url);
            return;
        }

        tracing::info!("{} ({} items via {:?})", url, fetch.items.len(), fetch.route);
        for item in fetch.items.iter().take(RENDER_ITEMS) {
            tracing::info!("  {} | {}", item.display_title(), item.meta_line());
        }
    }

    fn advisory(&self, message: Option<&str>) {
        if let Some(message) = message {
            tracing::info!("{}", message);
        }
    }
}
