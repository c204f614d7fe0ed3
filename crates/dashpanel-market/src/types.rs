use dashpanel_core::MarketIndex;
use serde::{Deserialize, Serialize};

/// An approximate index quote derived from its proxy instrument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketQuote {
    pub symbol: String,
    pub name: String,
    pub price: f64,
    pub change: f64,
    /// Percentage as reported by the provider (not scaled)
    pub change_percent: f64,
}

impl MarketQuote {
    /// Scale a proxy quote into index terms.
    ///
    /// The multiplier is a documented approximation. `change_percent` is
    /// already a ratio and is carried over unchanged.
    pub fn from_proxy(index: &MarketIndex, proxy: &ProxyQuote) -> Self {
        Self {
            symbol: index.symbol.clone(),
            name: index.name.clone(),
            price: proxy.price * index.multiplier,
            change: proxy.change * index.multiplier,
            change_percent: proxy.change_percent,
        }
    }

    pub fn is_up(&self) -> bool {
        self.change >= 0.0
    }

    /// Price with thousands separators, e.g. `$44,518.00`
    pub fn formatted_price(&self) -> String {
        format!("${}", group_thousands(self.price))
    }

    /// Signed percentage, e.g. `+0.89%`
    pub fn formatted_change_percent(&self) -> String {
        let sign = if self.is_up() { "+" } else { "" };
        format!("{}{:.2}%", sign, self.change_percent)
    }
}

fn group_thousands(value: f64) -> String {
    let formatted = format!("{:.2}", value.abs());
    let (whole, fraction) = formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, fraction)
}

/// A raw quote for the proxy instrument
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyQuote {
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
}

/// Static dataset shown when no live or cached quotes exist.
pub fn mock_quotes() -> Vec<MarketQuote> {
    vec![
        MarketQuote {
            symbol: "SPY".to_string(),
            name: "S&P 500".to_string(),
            price: 6025.50,
            change: 53.20,
            change_percent: 0.89,
        },
        MarketQuote {
            symbol: "DIA".to_string(),
            name: "Dow Jones".to_string(),
            price: 44518.00,
            change: -215.00,
            change_percent: -0.48,
        },
        MarketQuote {
            symbol: "QQQ".to_string(),
            name: "NASDAQ".to_string(),
            price: 15470.10,
            change: 252.60,
            change_percent: 1.66,
        },
    ]
}
