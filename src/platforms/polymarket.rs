//! Polymarket integration.
//!
//! Uses the Gamma API for market discovery (no auth required).
//!
//! Gamma API: https://gamma-api.polymarket.com
//!
//! The API serializes outcome names and prices as JSON strings inside
//! JSON ("[\"Yes\",\"No\"]") on list endpoints and occasionally as real
//! arrays elsewhere, so both shapes are accepted. Rows whose outcome
//! and price lists disagree in length are skipped, not forwarded.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::platforms::MarketSource;
use crate::types::Market;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

const GAMMA_API_URL: &str = "https://gamma-api.polymarket.com";

// ---------------------------------------------------------------------------
// Gamma API response types
// ---------------------------------------------------------------------------

/// A JSON field that arrives either as an array or as a JSON string
/// encoding an array.
#[derive(Debug, Deserialize, Clone)]
#[serde(untagged)]
pub enum MaybeEncodedList {
    List(Vec<String>),
    Encoded(String),
}

impl MaybeEncodedList {
    fn into_vec(self) -> Result<Vec<String>> {
        match self {
            MaybeEncodedList::List(v) => Ok(v),
            MaybeEncodedList::Encoded(s) => {
                serde_json::from_str(&s).context("Failed to decode nested JSON list")
            }
        }
    }
}

/// Numeric field that arrives as a number or a numeric string.
#[derive(Debug, Deserialize, Clone)]
#[serde(untagged)]
pub enum MaybeStringNum {
    Num(f64),
    Text(String),
}

impl MaybeStringNum {
    fn as_f64(&self) -> f64 {
        match self {
            MaybeStringNum::Num(n) => *n,
            MaybeStringNum::Text(s) => s.parse().unwrap_or(0.0),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GammaMarket {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub outcomes: Option<MaybeEncodedList>,
    #[serde(default, rename = "outcomePrices")]
    pub outcome_prices: Option<MaybeEncodedList>,
    #[serde(default)]
    pub volume: Option<MaybeStringNum>,
    #[serde(default)]
    pub liquidity: Option<MaybeStringNum>,
    #[serde(default, rename = "endDate")]
    pub end_date: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct PolymarketClient {
    http: Client,
    base_url: String,
}

impl PolymarketClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(GAMMA_API_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("Polyscout/0.1")
            .build()
            .context("Failed to build Polymarket HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.to_string(),
        })
    }

    /// Fetch raw market rows from the Gamma API, highest volume first.
    async fn fetch_gamma_markets(&self, limit: usize) -> Result<Vec<GammaMarket>> {
        let url = format!("{}/markets", self.base_url);
        debug!(limit, "Fetching Polymarket markets from Gamma API");

        let resp = self
            .http
            .get(&url)
            .query(&[
                ("closed", "false"),
                ("limit", &limit.to_string()),
                ("order", "volume"),
                ("ascending", "false"),
            ])
            .send()
            .await
            .context("Gamma API request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Gamma API error {status}: {body}");
        }

        let markets: Vec<GammaMarket> = resp
            .json()
            .await
            .context("Failed to parse Gamma markets response")?;

        info!(count = markets.len(), "Fetched raw Gamma markets");
        Ok(markets)
    }

    /// Convert a Gamma row into our internal Market type.
    ///
    /// Returns None for rows missing an id or question, and for rows
    /// whose outcome and price lists disagree in length.
    pub fn convert_market(gm: GammaMarket) -> Option<Market> {
        if gm.id.is_empty() || gm.question.is_empty() {
            return None;
        }

        let outcomes = gm.outcomes?.into_vec().ok()?;
        let outcome_prices: Vec<f64> = gm
            .outcome_prices?
            .into_vec()
            .ok()?
            .iter()
            .map(|p| p.parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .ok()?;

        if outcomes.len() != outcome_prices.len() {
            warn!(
                id = %gm.id,
                outcomes = outcomes.len(),
                prices = outcome_prices.len(),
                "Skipping market with mismatched outcome/price lists"
            );
            return None;
        }

        Some(Market {
            id: gm.id,
            question: gm.question,
            slug: gm.slug,
            outcomes,
            outcome_prices,
            volume: gm.volume.map(|v| v.as_f64()).unwrap_or(0.0),
            liquidity: gm.liquidity.map(|l| l.as_f64()).unwrap_or(0.0),
            end_date: gm.end_date,
            description: gm.description,
        })
    }
}

// ---------------------------------------------------------------------------
// MarketSource trait implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl MarketSource for PolymarketClient {
    async fn fetch_active(&self, limit: usize) -> Result<Vec<Market>> {
        let rows = self.fetch_gamma_markets(limit).await?;
        let total = rows.len();

        let markets: Vec<Market> = rows.into_iter().filter_map(Self::convert_market).collect();

        if markets.len() < total {
            warn!(
                skipped = total - markets.len(),
                "Some Gamma rows were malformed and skipped"
            );
        }
        info!(count = markets.len(), "Polymarket markets after parsing");
        Ok(markets)
    }

    fn name(&self) -> &str {
        "polymarket"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
