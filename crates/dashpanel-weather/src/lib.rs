//! Weather readings for the dashboard
//!
//! Fetches current conditions from the OpenWeather API for a fixed set of
//! locations and maps condition codes to display icons.

pub mod poller;
pub mod provider;
pub mod types;

pub use poller::{LocationReading, WeatherPoller};
pub use provider::WeatherProvider;
pub use types::*;
