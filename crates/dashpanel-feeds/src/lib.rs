//! RSS/Atom headlines for the dashboard
//!
//! Feeds are fetched directly first and through a read-through relay when the
//! origin refuses or returns nothing usable.

pub mod advisory;
pub mod fetcher;
pub mod parser;

pub use advisory::AdvisoryBoard;
pub use fetcher::{FeedFetch, FeedFetcher, FetchRoute, RELAY_ADVISORY};
pub use parser::{parse_feed, FeedItem, EXCERPT_CHARS, MAX_DEPTH, MAX_ITEMS, RENDER_ITEMS};
