//! Blockchain RPC client with timeout, failover and error handling.
//!
//! # Responsibilities
//! - Connect to the primary and failover JSON-RPC endpoints of one chain
//! - Query chain state (block number, balances, logs, ERC-20 metadata)
//! - Handle timeouts and network errors by falling through providers
//! - Provide health check for blockchain connectivity

use alloy::primitives::{Address, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::{Filter, Log};
use dashmap::DashMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::blockchain::contracts::{IUniswapV2Pair, IERC20};
use crate::blockchain::types::{BlockchainError, BlockchainResult, ChainId, TokenBook};
use crate::config::schema::ChainConfig;
use crate::observability::metrics;

/// ERC-20 metadata as reported by the token contract.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenMetadata {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Blockchain RPC client wrapper with failover support.
#[derive(Clone)]
pub struct BlockchainClient {
    /// Chain key in the config (e.g. "ethereum").
    key: String,
    /// Providers in failover order (primary first).
    providers: Vec<DynProvider>,
    config: ChainConfig,
    tokens: TokenBook,
    timeout_duration: Duration,
    /// Pair address → (token0, token1); pair tokens never change.
    pair_tokens: Arc<DashMap<Address, (Address, Address)>>,
}

impl BlockchainClient {
    /// Create a client for one configured chain.
    ///
    /// No network traffic happens here; an unreachable RPC only shows up on
    /// the first call (see [`BlockchainClient::verify_chain_id`]).
    pub fn new(key: &str, config: ChainConfig) -> BlockchainResult<Self> {
        let timeout_duration = Duration::from_secs(config.rpc_timeout_secs);
        let mut providers = Vec::new();

        let primary_url: url::Url = config.rpc_url.parse().map_err(|e| {
            BlockchainError::Rpc(format!("Invalid RPC URL '{}': {}", config.rpc_url, e))
        })?;
        providers.push(ProviderBuilder::new().connect_http(primary_url).erased());

        for url_str in &config.failover_urls {
            match url_str.parse::<url::Url>() {
                Ok(url) => providers.push(ProviderBuilder::new().connect_http(url).erased()),
                Err(_) => tracing::warn!(chain = %key, url = %url_str, "Ignoring invalid failover RPC URL"),
            }
        }

        tracing::debug!(
            chain = %key,
            chain_id = config.chain_id,
            providers = providers.len(),
            "Blockchain client created"
        );

        Ok(Self {
            key: key.to_string(),
            providers,
            tokens: TokenBook::from_config(&config),
            config,
            timeout_duration,
            pair_tokens: Arc::new(DashMap::new()),
        })
    }

    /// Run one RPC operation against each provider in turn until one
    /// answers within the timeout.
    async fn with_failover<T, E, F, Fut>(&self, what: &str, op: F) -> BlockchainResult<T>
    where
        E: Display,
        F: Fn(DynProvider) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut timed_out = false;
        for (i, provider) in self.providers.iter().enumerate() {
            match timeout(self.timeout_duration, op(provider.clone())).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) => {
                    tracing::warn!(chain = %self.key, provider_idx = i, op = what, error = %e, "RPC error, trying next provider");
                }
                Err(_) => {
                    timed_out = true;
                    tracing::warn!(chain = %self.key, provider_idx = i, op = what, "RPC timeout, trying next provider");
                }
            }
        }

        if timed_out && self.providers.len() == 1 {
            return Err(BlockchainError::Timeout(self.config.rpc_timeout_secs));
        }
        Err(BlockchainError::Rpc(format!(
            "All RPC providers failed ({})",
            what
        )))
    }

    /// Verify the connected chain ID matches configuration.
    pub async fn verify_chain_id(&self) -> BlockchainResult<()> {
        let chain_id = self.get_chain_id().await?;
        if chain_id.0 != self.config.chain_id {
            return Err(BlockchainError::ChainMismatch {
                expected: self.config.chain_id,
                actual: chain_id.0,
            });
        }
        Ok(())
    }

    pub async fn get_chain_id(&self) -> BlockchainResult<ChainId> {
        self.with_failover("chain_id", |p| async move { p.get_chain_id().await })
            .await
            .map(ChainId)
    }

    pub async fn get_block_number(&self) -> BlockchainResult<u64> {
        self.with_failover("block_number", |p| async move { p.get_block_number().await })
            .await
    }

    /// Native balance in wei.
    pub async fn get_balance(&self, address: Address) -> BlockchainResult<U256> {
        self.with_failover("balance", |p| async move { p.get_balance(address).await })
            .await
    }

    pub async fn get_logs(&self, filter: &Filter) -> BlockchainResult<Vec<Log>> {
        self.with_failover("logs", |p| {
            let filter = filter.clone();
            async move { p.get_logs(&filter).await }
        })
        .await
    }

    /// Name, symbol and decimals of an ERC-20 token.
    pub async fn token_metadata(&self, token: Address) -> BlockchainResult<TokenMetadata> {
        let name = self
            .with_failover("erc20_name", |p| async move {
                IERC20::new(token, p).name().call().await
            })
            .await?;
        let symbol = self
            .with_failover("erc20_symbol", |p| async move {
                IERC20::new(token, p).symbol().call().await
            })
            .await?;
        let decimals = self.token_decimals(token).await?;

        Ok(TokenMetadata {
            name,
            symbol,
            decimals,
        })
    }

    pub async fn token_decimals(&self, token: Address) -> BlockchainResult<u8> {
        self.with_failover("erc20_decimals", |p| async move {
            IERC20::new(token, p).decimals().call().await
        })
        .await
    }

    /// ERC-20 balance in base units.
    pub async fn token_balance(&self, token: Address, owner: Address) -> BlockchainResult<U256> {
        self.with_failover("erc20_balance", |p| async move {
            IERC20::new(token, p).balanceOf(owner).call().await
        })
        .await
    }

    pub async fn token_allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> BlockchainResult<U256> {
        self.with_failover("erc20_allowance", |p| async move {
            IERC20::new(token, p).allowance(owner, spender).call().await
        })
        .await
    }

    /// `token0` and `token1` of a V2 pair, cached after the first lookup.
    pub async fn pair_tokens(&self, pair: Address) -> BlockchainResult<(Address, Address)> {
        if let Some(entry) = self.pair_tokens.get(&pair) {
            return Ok(*entry);
        }

        let token0 = self
            .with_failover("pair_token0", |p| async move {
                IUniswapV2Pair::new(pair, p).token0().call().await
            })
            .await?;
        let token1 = self
            .with_failover("pair_token1", |p| async move {
                IUniswapV2Pair::new(pair, p).token1().call().await
            })
            .await?;

        self.pair_tokens.insert(pair, (token0, token1));
        Ok((token0, token1))
    }

    /// Check if the chain is reachable: true if we can query the block number.
    pub async fn is_healthy(&self) -> bool {
        let healthy = self.get_block_number().await.is_ok();
        metrics::record_rpc_health(&self.key, healthy);
        healthy
    }

    /// The primary provider, for building signing providers.
    pub fn primary_url(&self) -> BlockchainResult<url::Url> {
        self.config
            .rpc_url
            .parse()
            .map_err(|e| BlockchainError::Rpc(format!("Invalid RPC URL: {}", e)))
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    pub fn tokens(&self) -> &TokenBook {
        &self.tokens
    }

    pub fn confirmation_blocks(&self) -> u64 {
        self.config.confirmation_blocks
    }

    pub fn timeout_duration(&self) -> Duration {
        self.timeout_duration
    }
}

impl std::fmt::Debug for BlockchainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockchainClient")
            .field("chain", &self.key)
            .field("rpc_url", &self.config.rpc_url)
            .field("chain_id", &self.config.chain_id)
            .field("providers", &self.providers.len())
            .finish()
    }
}
