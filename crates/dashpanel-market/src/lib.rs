//! Approximate US index quotes
//!
//! Index levels are derived from ETF proxy quotes (SPY, DIA, QQQ) scaled by a
//! fixed multiplier. Requests are sequential and rate limited.

pub mod client;
pub mod poller;
pub mod types;

pub use client::{QuoteClient, QuoteResponse};
pub use poller::{MarketBatch, MarketPoller};
pub use types::*;
