//! Fallback content used when a dashboard source is unavailable.

use super::{Meme, PriceQuote};
use rand::seq::SliceRandom;
use rand::Rng;

/// Shown in place of a meme image that failed to load
pub const PLACEHOLDER_IMAGE_URL: &str =
    "https://via.placeholder.com/300x200?text=Meme+Not+Available";

/// Provider ids quoted when the user picked no interests
pub const DEFAULT_PRICE_BASKET: [&str; 4] = ["bitcoin", "ethereum", "cardano", "solana"];

/// Static price basket with illustrative values
pub fn fallback_prices() -> Vec<PriceQuote> {
    vec![
        PriceQuote::new("Bitcoin", "$43,250", 2.5),
        PriceQuote::new("Ethereum", "$2,680", 1.8),
        PriceQuote::new("Cardano", "$0.52", -0.9),
        PriceQuote::new("Solana", "$95.40", 4.2),
    ]
}

/// Investor archetype selecting the fallback insight set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsightArchetype {
    Hodler,
    DayTrader,
    NftCollector,
}

const HODLER_INSIGHTS: [&str; 3] = [
    "Long-term holding strategies are showing positive trends with increased institutional adoption.",
    "DCA (Dollar Cost Averaging) remains the most effective strategy for HODLers during market volatility.",
    "Staking rewards are providing additional yield opportunities for long-term holders.",
];

const DAY_TRADER_INSIGHTS: [&str; 3] = [
    "High volatility periods present both opportunities and risks for day trading strategies.",
    "Technical analysis indicators suggest key support and resistance levels to watch.",
    "Volume patterns indicate potential breakout opportunities in the next 24-48 hours.",
];

const NFT_COLLECTOR_INSIGHTS: [&str; 3] = [
    "NFT marketplace activity is showing signs of consolidation with quality projects gaining traction.",
    "Utility-based NFTs are outperforming profile picture collections in recent weeks.",
    "New blockchain ecosystems are launching innovative NFT use cases.",
];

impl InsightArchetype {
    /// Match an investor type case-insensitively; unknown or unset means HODLer
    pub fn from_investor_type(investor_type: Option<&str>) -> Self {
        match investor_type.map(|t| t.trim().to_lowercase()).as_deref() {
            Some("day trader") => InsightArchetype::DayTrader,
            Some("nft collector") => InsightArchetype::NftCollector,
            _ => InsightArchetype::Hodler,
        }
    }

    pub fn messages(&self) -> &'static [&'static str] {
        match self {
            InsightArchetype::Hodler => &HODLER_INSIGHTS,
            InsightArchetype::DayTrader => &DAY_TRADER_INSIGHTS,
            InsightArchetype::NftCollector => &NFT_COLLECTOR_INSIGHTS,
        }
    }
}

/// Pick an insight from the set matching the investor type
pub fn fallback_insight<R: Rng + ?Sized>(investor_type: Option<&str>, rng: &mut R) -> String {
    let messages = InsightArchetype::from_investor_type(investor_type).messages();
    messages
        .choose(rng)
        .copied()
        .unwrap_or(HODLER_INSIGHTS[0])
        .to_string()
}

fn static_meme(url: &str, title: &str, alt_text: &str, score: i64) -> Meme {
    Meme {
        url: url.to_string(),
        title: title.to_string(),
        alt_text: alt_text.to_string(),
        source: "Static".to_string(),
        author: "System".to_string(),
        score,
        reddit_url: None,
    }
}

/// The static memes shown when the backend has none
pub fn static_memes() -> Vec<Meme> {
    vec![
        static_meme("https://i.imgflip.com/2/1bij.jpg", "HODL Strong", "Crypto HODL meme", 100),
        static_meme(
            "https://i.imgflip.com/2/30b1gx.jpg",
            "Bitcoin Price Goes Brrr",
            "Bitcoin price meme",
            150,
        ),
        static_meme(
            "https://i.imgflip.com/2/1ur9b0.jpg",
            "Crypto Trading Life",
            "Crypto trading meme",
            200,
        ),
    ]
}

/// Pick one of the static memes
pub fn fallback_meme<R: Rng + ?Sized>(rng: &mut R) -> Meme {
    let mut memes = static_memes();
    let index = rng.gen_range(0..memes.len());
    memes.swap_remove(index)
}
