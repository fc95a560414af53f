// src/coingecko.rs
use eyre::{eyre, Result};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

const COINGECKO_BASE: &str = "https://api.coingecko.com/api/v3";

/// Normalized supply/price figures for one coin. All fields optional: the
/// aggregator omits what it does not track.
#[derive(Debug, Clone, Default)]
pub struct MarketQuote {
    pub circulating_supply: Option<f64>,
    pub total_supply: Option<f64>,
    pub price_usd: Option<f64>,
    pub market_cap_usd: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct CoinsResponse {
    market_data: Option<MarketData>,
}

#[derive(Debug, Deserialize, Default)]
struct MarketData {
    #[serde(default)]
    current_price: HashMap<String, f64>,
    #[serde(default)]
    market_cap: HashMap<String, f64>,
    circulating_supply: Option<f64>,
    total_supply: Option<f64>,
}

/// Read-only CoinGecko `/coins/{id}` client used as the supply fallback.
pub struct CoinGeckoClient {
    http: Client,
    coin_id: String,
    api_key: Option<String>,
    retries: u32,
}

impl CoinGeckoClient {
    pub fn new(coin_id: &str, api_key: Option<String>, retries: u32) -> Result<Self> {
        let http = Client::builder().timeout(Duration::from_secs(15)).build()?;
        Ok(Self {
            http,
            coin_id: coin_id.to_string(),
            api_key,
            retries: retries.max(1),
        })
    }

    /// Fetch the coin's market data with retries and a pause between
    /// attempts. The last error is returned once attempts are exhausted.
    pub async fn fetch_market_quote(&self) -> Result<MarketQuote> {
        let url = format!(
            "{COINGECKO_BASE}/coins/{}?localization=false&tickers=false&market_data=true&community_data=false&developer_data=false&sparkline=false",
            self.coin_id
        );

        for attempt in 1..=self.retries {
            info!("📡 Fetching CoinGecko quote for {} (attempt {})", self.coin_id, attempt);

            match self.try_fetch(&url).await {
                Ok(quote) => return Ok(quote),
                Err(e) if attempt < self.retries => {
                    warn!("CoinGecko fetch failed (attempt {}): {}. Retrying...", attempt, e);
                    sleep(Duration::from_secs(2)).await;
                }
                Err(e) => return Err(e),
            }
        }

        Err(eyre!("Unreachable: retries exhausted"))
    }

    async fn try_fetch(&self, url: &str) -> Result<MarketQuote> {
        let mut req = self.http.get(url).header("Accept", "application/json");
        if let Some(key) = &self.api_key {
            // Demo keys are CG-prefixed and go in a different header than
            // pro keys.
            let header = if key.starts_with("CG-") {
                "x-cg-demo-api-key"
            } else {
                "x-cg-pro-api-key"
            };
            req = req.header(header, key);
        }

        let resp = req.send().await?;
        if resp.status() != StatusCode::OK {
            return Err(eyre!("CoinGecko error: HTTP {}", resp.status()));
        }

        let body: CoinsResponse = resp.json().await?;
        parse_quote(body)
    }
}

fn parse_quote(body: CoinsResponse) -> Result<MarketQuote> {
    let md = body
        .market_data
        .ok_or_else(|| eyre!("CoinGecko response is missing market_data"))?;

    Ok(MarketQuote {
        circulating_supply: md.circulating_supply,
        total_supply: md.total_supply,
        price_usd: md.current_price.get("usd").copied(),
        market_cap_usd: md.market_cap.get("usd").copied(),
    })
}
