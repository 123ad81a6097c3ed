//! Dashboard Aggregation
//!
//! Builds the personalized dashboard from three independent sources:
//!
//! - **Prices** from the public market-data provider
//! - **AI insight** from the backend, personalized by investor type
//! - **Meme** from the backend
//!
//! Each source degrades to locally defined fallback content, so a failing
//! source never prevents the dashboard from rendering.

mod aggregator;
pub mod fallback;
mod prices;
mod types;

pub use aggregator::{DashboardAggregator, DashboardError, DashboardSettings};
pub use prices::{display_name, format_usd, provider_ids, MarketData};
pub use types::{DashboardViewModel, LoadingState, Meme, PriceQuote};

/// Result of an operation whose outcome may belong to an ended session
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// The result was applied to the view
    Applied(T),
    /// The session changed while the operation was in flight; nothing was applied
    Discarded,
}

impl<T> Outcome<T> {
    pub fn applied(self) -> Option<T> {
        match self {
            Outcome::Applied(value) => Some(value),
            Outcome::Discarded => None,
        }
    }

    pub fn is_discarded(&self) -> bool {
        matches!(self, Outcome::Discarded)
    }
}
