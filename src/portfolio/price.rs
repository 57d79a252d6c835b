use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::error::RpcError;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PriceQuote {
    pub price: f64,
    pub change_24h: f64,
}

#[async_trait]
pub trait PriceFeed: Send + Sync {
    /// `None` when the feed does not know the symbol
    async fn get_price(&self, symbol: &str) -> Result<Option<PriceQuote>, RpcError>;

    /// Quotes for every symbol the feed knows. Failures are logged and skipped.
    async fn get_prices(&self, symbols: &[String]) -> HashMap<String, PriceQuote> {
        let mut quotes = HashMap::new();
        for symbol in symbols {
            match self.get_price(symbol).await {
                Ok(Some(quote)) => {
                    quotes.insert(symbol.clone(), quote);
                }
                Ok(None) => log::debug!("No price for {}", symbol),
                Err(e) => log::warn!("Price lookup failed for {}: {}", symbol, e),
            }
        }
        quotes
    }
}

/// Fixed quotes, for tests and offline runs
#[derive(Debug, Clone, Default)]
pub struct StaticPriceFeed {
    quotes: HashMap<String, PriceQuote>,
}

impl StaticPriceFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(mut self, symbol: &str, price: f64, change_24h: f64) -> Self {
        self.quotes
            .insert(symbol.to_uppercase(), PriceQuote { price, change_24h });
        self
    }
}

#[async_trait]
impl PriceFeed for StaticPriceFeed {
    async fn get_price(&self, symbol: &str) -> Result<Option<PriceQuote>, RpcError> {
        Ok(self.quotes.get(&symbol.to_uppercase()).copied())
    }
}

/// USD quotes from the CoinGecko `simple/price` endpoint
pub struct CoinGeckoPriceFeed {
    client: reqwest::Client,
    base_url: String,
}

impl CoinGeckoPriceFeed {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// CoinGecko coin id for a ticker symbol
    pub fn coin_id(symbol: &str) -> Option<&'static str> {
        match symbol.to_uppercase().as_str() {
            "BTC" => Some("bitcoin"),
            "ETH" => Some("ethereum"),
            "MATIC" | "POL" => Some("matic-network"),
            "TRX" => Some("tron"),
            "SOL" => Some("solana"),
            "SUI" => Some("sui"),
            "USDT" => Some("tether"),
            "USDC" => Some("usd-coin"),
            _ => None,
        }
    }

    async fn fetch(&self, ids: &[&str]) -> Result<Value, RpcError> {
        let url = format!("{}/simple/price", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("ids", ids.join(",")),
                ("vs_currencies", "usd".to_string()),
                ("include_24hr_change", "true".to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RpcError::Http(format!("price API returned HTTP {}", status)));
        }
        Ok(response.json().await?)
    }
}

fn parse_quote(payload: &Value, coin_id: &str) -> Option<PriceQuote> {
    let entry = payload.get(coin_id)?;
    Some(PriceQuote {
        price: entry["usd"].as_f64()?,
        change_24h: entry["usd_24h_change"].as_f64().unwrap_or(0.0),
    })
}

#[async_trait]
impl PriceFeed for CoinGeckoPriceFeed {
    async fn get_price(&self, symbol: &str) -> Result<Option<PriceQuote>, RpcError> {
        let Some(id) = Self::coin_id(symbol) else {
            return Ok(None);
        };
        let payload = self.fetch(&[id]).await?;
        Ok(parse_quote(&payload, id))
    }

    /// One request for all symbols
    async fn get_prices(&self, symbols: &[String]) -> HashMap<String, PriceQuote> {
        let known: Vec<(&String, &'static str)> = symbols
            .iter()
            .filter_map(|s| Self::coin_id(s).map(|id| (s, id)))
            .collect();
        if known.is_empty() {
            return HashMap::new();
        }

        let mut ids: Vec<&str> = known.iter().map(|(_, id)| *id).collect();
        ids.sort_unstable();
        ids.dedup();

        match self.fetch(&ids).await {
            Ok(payload) => known
                .into_iter()
                .filter_map(|(symbol, id)| parse_quote(&payload, id).map(|q| (symbol.clone(), q)))
                .collect(),
            Err(e) => {
                log::warn!("Price feed unavailable, assets will show no value: {}", e);
                HashMap::new()
            }
        }
    }
}
