//! CoinGecko `simple/price` client with a TTL cache.
//!
//! # Responsibilities
//! - Map token symbols to CoinGecko coin ids
//! - Serve fresh prices from the cache, fetch the rest in one request
//! - Retry failed requests with jittered exponential backoff

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::schema::PriceConfig;
use crate::observability::metrics;
use crate::prices::{PriceError, PriceFeed, PriceResult};
use crate::resilience::{retry_with_backoff, RetryPolicy};

#[derive(Debug, Clone, Copy)]
struct CachedPrice {
    usd: f64,
    fetched_at: Instant,
}

/// Price feed backed by the CoinGecko API.
#[derive(Clone)]
pub struct CoinGeckoFeed {
    http: reqwest::Client,
    base_url: String,
    /// Upper-case symbol → coin id.
    ids: HashMap<String, String>,
    ttl: Duration,
    retry: RetryPolicy,
    /// Coin id → last fetched price.
    cache: Arc<DashMap<String, CachedPrice>>,
}

impl CoinGeckoFeed {
    pub fn new(config: &PriceConfig) -> PriceResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("cointwo-wallet/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            ids: config
                .ids
                .iter()
                .map(|(symbol, id)| (symbol.to_uppercase(), id.clone()))
                .collect(),
            ttl: Duration::from_secs(config.cache_ttl_secs),
            retry: RetryPolicy {
                max_attempts: config.max_attempts,
                base_delay_ms: config.base_delay_ms,
                max_delay_ms: config.max_delay_ms,
            },
            cache: Arc::new(DashMap::new()),
        })
    }

    /// Coin id for a symbol, if configured.
    pub fn coin_id(&self, symbol: &str) -> Option<&str> {
        self.ids.get(&symbol.to_uppercase()).map(String::as_str)
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }

    fn fresh(&self, id: &str) -> Option<f64> {
        self.cache
            .get(id)
            .filter(|c| c.fetched_at.elapsed() < self.ttl)
            .map(|c| c.usd)
    }

    async fn fetch(&self, ids: &[String]) -> PriceResult<HashMap<String, HashMap<String, f64>>> {
        let url = format!("{}/simple/price", self.base_url);
        let joined = ids.join(",");

        retry_with_backoff("coingecko", self.retry, || async {
            let response = self
                .http
                .get(&url)
                .query(&[("ids", joined.as_str()), ("vs_currencies", "usd")])
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(PriceError::Status(response.status().as_u16()));
            }
            Ok(response.json::<HashMap<String, HashMap<String, f64>>>().await?)
        })
        .await
    }
}

#[async_trait]
impl PriceFeed for CoinGeckoFeed {
    async fn usd_prices(&self, symbols: &[String]) -> PriceResult<HashMap<String, f64>> {
        let mut prices = HashMap::new();
        let mut missing = BTreeSet::new();

        for symbol in symbols {
            let symbol = symbol.to_uppercase();
            let Some(id) = self.coin_id(&symbol) else {
                continue;
            };
            match self.fresh(id) {
                Some(usd) => {
                    metrics::record_price_fetch("hit");
                    prices.insert(symbol, usd);
                }
                None => {
                    missing.insert(id.to_string());
                }
            }
        }

        if missing.is_empty() {
            return Ok(prices);
        }

        let ids: Vec<String> = missing.into_iter().collect();
        let fetched = match self.fetch(&ids).await {
            Ok(fetched) => {
                metrics::record_price_fetch("fetched");
                fetched
            }
            Err(e) => {
                metrics::record_price_fetch("error");
                tracing::warn!(ids = %ids.join(","), error = %e, "Price fetch failed");
                return Err(e);
            }
        };

        let now = Instant::now();
        for (id, quotes) in &fetched {
            if let Some(usd) = quotes.get("usd") {
                self.cache.insert(
                    id.clone(),
                    CachedPrice {
                        usd: *usd,
                        fetched_at: now,
                    },
                );
            }
        }
        metrics::record_price_cache_size(self.cache.len());

        for symbol in symbols {
            let symbol = symbol.to_uppercase();
            if prices.contains_key(&symbol) {
                continue;
            }
            if let Some(usd) = self
                .coin_id(&symbol)
                .and_then(|id| fetched.get(id))
                .and_then(|q| q.get("usd"))
            {
                prices.insert(symbol, *usd);
            }
        }

        tracing::debug!(requested = symbols.len(), priced = prices.len(), "Prices resolved");
        Ok(prices)
    }
}

impl std::fmt::Debug for CoinGeckoFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoinGeckoFeed")
            .field("base_url", &self.base_url)
            .field("symbols", &self.ids.len())
            .field("cached", &self.cache.len())
            .finish()
    }
}
