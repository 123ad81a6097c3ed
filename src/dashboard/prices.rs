//! Market-data provider client

use super::PriceQuote;
use crate::gateway::{GatewayRequest, RemoteError, RemoteGateway};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct ProviderQuote {
    usd: Option<f64>,
    usd_24h_change: Option<f64>,
}

/// Client for the `simple/price` endpoint of the market-data provider
#[derive(Clone)]
pub struct MarketData {
    gateway: Arc<dyn RemoteGateway>,
}

impl MarketData {
    pub fn new(gateway: Arc<dyn RemoteGateway>) -> Self {
        Self { gateway }
    }

    fn path(ids: &[String]) -> String {
        let ids: Vec<String> = ids
            .iter()
            .map(|id| urlencoding::encode(id).into_owned())
            .collect();
        format!(
            "/simple/price?ids={}&vs_currencies=usd&include_24hr_change=true",
            ids.join(",")
        )
    }

    /// Quote the given provider ids in USD
    ///
    /// Quotes keep the requested order; ids the provider does not know are
    /// skipped.
    pub async fn fetch_quotes(&self, ids: &[String]) -> Result<Vec<PriceQuote>, RemoteError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let quotes: HashMap<String, ProviderQuote> = self
            .gateway
            .request(GatewayRequest::get(Self::path(ids)))
            .await?
            .decode()?;

        Ok(ids
            .iter()
            .filter_map(|id| {
                let quote = quotes.get(id)?;
                let price = quote.usd?;
                Some(PriceQuote::new(
                    display_name(id),
                    format_usd(price),
                    quote.usd_24h_change.unwrap_or(0.0),
                ))
            })
            .collect())
    }
}

/// Normalize interest names to provider ids, keeping order and dropping duplicates
///
/// "Bitcoin" becomes "bitcoin", "Shiba Inu" becomes "shiba-inu". An empty
/// selection yields `default_basket`.
pub fn provider_ids<'a, I>(interests: I, default_basket: &[String]) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut ids: Vec<String> = Vec::new();
    for interest in interests {
        let id = interest
            .trim()
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("-");
        if !id.is_empty() && !ids.contains(&id) {
            ids.push(id);
        }
    }

    if ids.is_empty() {
        return default_basket.to_vec();
    }
    ids
}

/// Display name for a provider id ("bitcoin" -> "Bitcoin")
pub fn display_name(id: &str) -> String {
    let mut chars = id.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Format a USD amount with thousands separators and at most three fraction digits
pub fn format_usd(value: f64) -> String {
    if !value.is_finite() {
        return "$0".to_string();
    }

    let scaled = (value.abs() * 1000.0).round() as u64;
    let whole = scaled / 1000;
    let fraction = scaled % 1000;

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if value < 0.0 && scaled > 0 { "-" } else { "" };
    if fraction == 0 {
        format!("{}${}", sign, grouped)
    } else {
        let fraction = format!("{:03}", fraction);
        format!("{}${}.{}", sign, grouped, fraction.trim_end_matches('0'))
    }
}
