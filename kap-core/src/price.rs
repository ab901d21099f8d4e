use std::fmt;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::SourceError;

/// Shown in place of a price when none could be fetched.
pub const PRICE_UNAVAILABLE: &str = "Fiyat alınamadı";

pub const DEFAULT_PRICE_API_BASE: &str = "https://query1.finance.yahoo.com";

/// Borsa Istanbul suffix on the market-data provider.
const MARKET_SUFFIX: &str = ".IS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Price {
    Quoted(String),
    Unavailable,
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Price::Quoted(p) => f.write_str(p),
            Price::Unavailable => f.write_str(PRICE_UNAVAILABLE),
        }
    }
}

/// Latest traded price for a company. Implementations swallow their own
/// failures and answer [`Price::Unavailable`].
#[async_trait]
pub trait PriceLookup: Send + Sync {
    async fn lookup(&self, company: &str) -> Price;
}

/// Used when price enrichment is switched off.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPriceLookup;

#[async_trait]
impl PriceLookup for NoPriceLookup {
    async fn lookup(&self, _company: &str) -> Price {
        Price::Unavailable
    }
}

pub fn ticker_symbol(company: &str) -> String {
    format!("{}{}", company.trim().to_uppercase(), MARKET_SUFFIX)
}

#[derive(Debug, Clone)]
pub struct YahooPriceLookup {
    client: Client,
    base: String,
}

impl YahooPriceLookup {
    pub fn new(client: Client) -> Self {
        Self::with_base(client, DEFAULT_PRICE_API_BASE)
    }

    pub fn with_base(client: Client, base: impl Into<String>) -> Self {
        Self {
            client,
            base: base.into().trim_end_matches('/').to_owned(),
        }
    }

    async fn fetch_close(&self, ticker: &str) -> Result<Option<f64>, SourceError> {
        let url = format!("{}/v8/finance/chart/{}", self.base, ticker);
        let response = self
            .client
            .get(url)
            .query(&[("range", "5d"), ("interval", "1d")])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(SourceError::Status(response.status()));
        }
        let chart: ChartResponse = response.json().await?;
        Ok(chart.latest_price())
    }
}

#[async_trait]
impl PriceLookup for YahooPriceLookup {
    async fn lookup(&self, company: &str) -> Price {
        let ticker = ticker_symbol(company);
        match self.fetch_close(&ticker).await {
            Ok(Some(price)) => Price::Quoted(format!("{price:.2} TL")),
            Ok(None) => {
                debug!(%ticker, "no price data returned");
                Price::Unavailable
            }
            Err(err) => {
                warn!(%ticker, error = %err, "price lookup failed");
                Price::Unavailable
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: Option<ChartMeta>,
    #[serde(default)]
    indicators: Option<Indicators>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    regular_market_price: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

impl ChartResponse {
    /// Most recent non-null daily close in the 5-day window, else the quoted
    /// regular market price.
    fn latest_price(&self) -> Option<f64> {
        let result = self.chart.result.as_ref()?.first()?;
        let close = result
            .indicators
            .as_ref()
            .and_then(|i| i.quote.first())
            .and_then(|q| q.close.iter().rev().find_map(|c| *c));
        close.or_else(|| result.meta.as_ref()?.regular_market_price)
    }
}
