//! USD price lookups.
//!
//! # Design Decisions
//! - Callers depend on the [`PriceFeed`] trait; the reward pipeline and the
//!   API share one feed instance
//! - Symbols are upper-cased before lookup; unknown symbols are absent from
//!   results rather than errors

pub mod coingecko;

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

pub use coingecko::CoinGeckoFeed;

/// Errors from the price feed.
#[derive(Debug, Error)]
pub enum PriceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Price API returned status {0}")]
    Status(u16),
}

pub type PriceResult<T> = Result<T, PriceError>;

/// Source of USD prices keyed by token symbol.
#[async_trait]
pub trait PriceFeed: Send + Sync {
    /// Prices for the symbols that could be priced, keyed by upper-case symbol.
    async fn usd_prices(&self, symbols: &[String]) -> PriceResult<HashMap<String, f64>>;

    /// Price of one symbol, `None` when the feed does not know it.
    async fn usd_price(&self, symbol: &str) -> PriceResult<Option<f64>> {
        let key = symbol.to_uppercase();
        let prices = self.usd_prices(std::slice::from_ref(&key)).await?;
        Ok(prices.get(&key).copied())
    }
}

/// A fixed price table, for offline setups and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticPrices {
    prices: HashMap<String, f64>,
}

impl StaticPrices {
    pub fn new<I, S>(prices: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        Self {
            prices: prices
                .into_iter()
                .map(|(s, p)| (s.as_ref().to_uppercase(), p))
                .collect(),
        }
    }
}

#[async_trait]
impl PriceFeed for StaticPrices {
    async fn usd_prices(&self, symbols: &[String]) -> PriceResult<HashMap<String, f64>> {
        Ok(symbols
            .iter()
            .map(|s| s.to_uppercase())
            .filter_map(|s| self.prices.get(&s).map(|p| (s, *p)))
            .collect())
    }
}
