//! Dashboard view types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Price of one coin as shown on the dashboard
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceQuote {
    /// Display name (e.g., "Bitcoin")
    pub symbol: String,
    /// Formatted USD price (e.g., "$43,250")
    pub price_display: String,
    pub percent_change_24h: f64,
}

impl PriceQuote {
    pub fn new(symbol: impl Into<String>, price_display: impl Into<String>, change: f64) -> Self {
        Self {
            symbol: symbol.into(),
            price_display: price_display.into(),
            percent_change_24h: change,
        }
    }

    /// 24h change with sign and two decimals (e.g., "+2.50%")
    pub fn change_display(&self) -> String {
        format!("{:+.2}%", self.percent_change_24h)
    }

    pub fn is_gain(&self) -> bool {
        self.percent_change_24h >= 0.0
    }
}

/// Meme record as returned by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meme {
    pub url: String,

    #[serde(default)]
    pub title: String,

    #[serde(rename = "alt", default)]
    pub alt_text: String,

    #[serde(default)]
    pub source: String,

    #[serde(default)]
    pub author: String,

    #[serde(default)]
    pub score: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reddit_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadingState {
    #[default]
    Loading,
    Ready,
}

/// Everything the dashboard screen renders
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DashboardViewModel {
    pub prices: Vec<PriceQuote>,
    pub ai_insight: String,
    pub meme: Option<Meme>,
    pub loading_state: LoadingState,
    pub ai_insight_refreshing: bool,
    pub last_updated: Option<DateTime<Utc>>,
}

impl DashboardViewModel {
    pub fn is_ready(&self) -> bool {
        self.loading_state == LoadingState::Ready
    }
}
