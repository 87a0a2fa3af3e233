//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the wallet
//! backend. All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Root configuration for the wallet backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP API listener settings.
    pub server: ServerConfig,

    /// Relational store settings.
    pub database: DatabaseConfig,

    /// Custodial key storage settings.
    pub wallet: WalletConfig,

    /// Supported chains keyed by short name (e.g. "ethereum").
    pub chains: BTreeMap<String, ChainConfig>,

    /// Reward poller settings.
    pub poller: PollerConfig,

    /// Reward, XP and campaign rules.
    pub rewards: RewardsConfig,

    /// External price feed settings.
    pub prices: PriceConfig,

    /// Admin API settings.
    pub admin: AdminConfig,

    /// Per-IP rate limiting for auth endpoints.
    pub rate_limit: RateLimitConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            wallet: WalletConfig::default(),
            chains: default_chains(),
            poller: PollerConfig::default(),
            rewards: RewardsConfig::default(),
            prices: PriceConfig::default(),
            admin: AdminConfig::default(),
            rate_limit: RateLimitConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl AppConfig {
    /// Chains on which the reward poller runs, in key order.
    pub fn reward_chains(&self) -> Vec<String> {
        self.chains
            .iter()
            .filter(|(_, c)| c.rewards_enabled)
            .map(|(k, _)| k.clone())
            .collect()
    }
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:4000").
    pub bind_address: String,

    /// Request timeout in seconds. Send and swap wait for confirmations,
    /// so this is generous.
    pub request_timeout_secs: u64,

    /// Maximum request body size in bytes.
    pub max_body_size: usize,

    /// Allow cross-origin requests from any origin (WebApp frontend).
    pub cors_allow_any: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:4000".to_string(),
            request_timeout_secs: 120,
            max_body_size: 64 * 1024,
            cors_allow_any: true,
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLx connection URL.
    pub url: String,

    /// Maximum pooled connections.
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://cointwo.db?mode=rwc".to_string(),
            max_connections: 5,
        }
    }
}

/// Custodial wallet storage.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Directory holding one encrypted keystore file per user.
    pub keystore_dir: String,

    /// Number of words in generated mnemonics (12 or 24).
    pub mnemonic_words: usize,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            keystore_dir: "keystores".to_string(),
            mnemonic_words: 12,
        }
    }
}

/// A token the backend knows how to price.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct TokenConfig {
    /// Contract address.
    pub address: String,

    /// Ticker symbol, also the price feed key.
    pub symbol: String,

    /// ERC-20 decimals.
    pub decimals: u8,
}

impl TokenConfig {
    pub fn new(address: &str, symbol: &str, decimals: u8) -> Self {
        Self {
            address: address.to_string(),
            symbol: symbol.to_string(),
            decimals,
        }
    }
}

/// Per-chain configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Human readable name.
    pub name: String,

    /// Chain ID (e.g., 1 for Ethereum mainnet, 31337 for local Anvil).
    pub chain_id: u64,

    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Failover JSON-RPC endpoint URLs.
    pub failover_urls: Vec<String>,

    /// Block explorer base URL.
    pub explorer: String,

    /// Symbol of the native coin.
    pub native_symbol: String,

    /// Uniswap-V2-style router used for swaps.
    pub router_address: String,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// Number of block confirmations to wait for on sends.
    pub confirmation_blocks: u64,

    /// Run the reward poller on this chain.
    pub rewards_enabled: bool,

    /// Tokens with known decimals and prices.
    pub tokens: Vec<TokenConfig>,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            chain_id: 1,
            rpc_url: "http://localhost:8545".to_string(),
            failover_urls: Vec::new(),
            explorer: String::new(),
            native_symbol: "ETH".to_string(),
            router_address: String::new(),
            rpc_timeout_secs: 10,
            confirmation_blocks: 1,
            rewards_enabled: false,
            tokens: Vec::new(),
        }
    }
}

/// The chain table shipped by default.
pub fn default_chains() -> BTreeMap<String, ChainConfig> {
    let mut chains = BTreeMap::new();
    chains.insert(
        "ethereum".to_string(),
        ChainConfig {
            name: "Ethereum".to_string(),
            chain_id: 1,
            rpc_url: "https://rpc.ankr.com/eth".to_string(),
            explorer: "https://etherscan.io".to_string(),
            native_symbol: "ETH".to_string(),
            router_address: "0x7a250d5630B4cF539739dF2C5dAcb4c659F2488D".to_string(),
            rewards_enabled: true,
            tokens: vec![
                TokenConfig::new("0xdAC17F958D2ee523a2206206994597C13D831ec7", "USDT", 6),
                TokenConfig::new("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48", "USDC", 6),
                TokenConfig::new("0x6B175474E89094C44Da98b954EedeAC495271d0F", "DAI", 18),
                TokenConfig::new("0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2", "WETH", 18),
            ],
            ..ChainConfig::default()
        },
    );
    chains.insert(
        "bsc".to_string(),
        ChainConfig {
            name: "BNB Smart Chain".to_string(),
            chain_id: 56,
            rpc_url: "https://rpc.ankr.com/bsc".to_string(),
            explorer: "https://bscscan.com".to_string(),
            native_symbol: "BNB".to_string(),
            router_address: "0x10ED43C718714eb63d5aA57B78B54704E256024E".to_string(),
            tokens: vec![
                TokenConfig::new("0x55d398326f99059fF775485246999027B3197955", "USDT", 18),
                TokenConfig::new("0xe9e7CEA3DedcA5984780Bafc599bD69ADd087D56", "BUSD", 18),
                TokenConfig::new("0xbb4CdB9CBd36B01bD1cBaEBF2De08d9173bc095c", "WBNB", 18),
            ],
            ..ChainConfig::default()
        },
    );
    chains.insert(
        "polygon".to_string(),
        ChainConfig {
            name: "Polygon".to_string(),
            chain_id: 137,
            rpc_url: "https://rpc.ankr.com/polygon".to_string(),
            explorer: "https://polygonscan.com".to_string(),
            native_symbol: "MATIC".to_string(),
            router_address: "0x1b02dA8Cb0d097eB8D57A175b88c7D8b47997506".to_string(),
            tokens: vec![
                TokenConfig::new("0xc2132D05D31c914a87C6611C10748AEb04B58e8F", "USDT", 6),
                TokenConfig::new("0x3c499c542cEF5E3811e1192ce70d8cC03d5c3359", "USDC", 6),
                TokenConfig::new("0x0d500B1d8E8eF31E21C99d1Db9A6444d3ADf1270", "WMATIC", 18),
            ],
            ..ChainConfig::default()
        },
    );
    chains.insert(
        "base".to_string(),
        ChainConfig {
            name: "Base".to_string(),
            chain_id: 8453,
            rpc_url: "https://mainnet.base.org".to_string(),
            explorer: "https://basescan.org".to_string(),
            native_symbol: "ETH".to_string(),
            router_address: "0x327Df1E6de05895d2ab08513aaDD9313Fe505d86".to_string(),
            tokens: vec![
                TokenConfig::new("0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913", "USDC", 6),
                TokenConfig::new("0x4200000000000000000000000000000000000006", "WETH", 18),
            ],
            ..ChainConfig::default()
        },
    );
    chains
}

/// Reward poller configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PollerConfig {
    /// Enable the background poller.
    pub enabled: bool,

    /// Seconds between poll cycles.
    pub interval_secs: u64,

    /// How many blocks back to scan for transfer and swap logs.
    pub lookback_blocks: u64,

    /// Minimum deposit value in USD for the deposit task.
    pub deposit_min_usd: f64,

    /// Minimum swap value in USD for the swap task.
    pub swap_min_usd: f64,

    /// Symbols accepted as the input side of a qualifying swap.
    pub swap_from: Vec<String>,

    /// Symbols accepted as the output side of a qualifying swap.
    pub swap_to: Vec<String>,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 60,
            lookback_blocks: 10_000,
            deposit_min_usd: 15.0,
            swap_min_usd: 20.0,
            swap_from: vec!["ETH".to_string(), "WETH".to_string()],
            swap_to: vec!["USDT".to_string()],
        }
    }
}

/// Reward, XP and campaign rules.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RewardsConfig {
    /// USD value of the reward granted per completed task.
    pub reward_usd: f64,

    /// XP granted for the deposit task.
    pub xp_deposit: i64,

    /// XP granted for the swap task.
    pub xp_swap: i64,

    /// XP granted to the inviter when a referral qualifies.
    pub xp_invite: i64,

    /// Completions needed to finish a campaign.
    pub campaign_goal: i64,

    /// XP divisor in the level formula.
    pub level_unit: i64,

    /// Send the reward on-chain when an admin approves it.
    pub payout_enabled: bool,

    /// Token symbol used for payouts (must be in the chain's token list).
    pub payout_token: String,
}

impl Default for RewardsConfig {
    fn default() -> Self {
        Self {
            reward_usd: 3.0,
            xp_deposit: 5,
            xp_swap: 10,
            xp_invite: 5,
            campaign_goal: 1,
            level_unit: 20,
            payout_enabled: false,
            payout_token: "USDT".to_string(),
        }
    }
}

/// Price feed configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PriceConfig {
    /// CoinGecko API base URL.
    pub base_url: String,

    /// Seconds a fetched price stays valid.
    pub cache_ttl_secs: u64,

    /// HTTP timeout per request in seconds.
    pub timeout_secs: u64,

    /// Attempts per fetch, including the first.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,

    /// Symbol to CoinGecko coin id.
    pub ids: HashMap<String, String>,
}

impl Default for PriceConfig {
    fn default() -> Self {
        let ids = [
            ("ETH", "ethereum"),
            ("WETH", "ethereum"),
            ("USDT", "tether"),
            ("USDC", "usd-coin"),
            ("DAI", "dai"),
            ("BNB", "binancecoin"),
            ("WBNB", "binancecoin"),
            ("BUSD", "binance-usd"),
            ("MATIC", "matic-network"),
            ("WMATIC", "matic-network"),
        ]
        .into_iter()
        .map(|(s, id)| (s.to_string(), id.to_string()))
        .collect();

        Self {
            base_url: "https://api.coingecko.com/api/v3".to_string(),
            cache_ttl_secs: 60,
            timeout_secs: 10,
            max_attempts: 3,
            base_delay_ms: 200,
            max_delay_ms: 2000,
            ids,
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin routes.
    pub enabled: bool,

    /// API key for authentication (Bearer token or `adminKey` query).
    pub api_key: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Sustained requests per second per IP.
    pub requests_per_second: u32,

    /// Burst capacity.
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_second: 2,
            burst_size: 10,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format: "pretty" or "json".
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_chains() {
        let chains = default_chains();
        assert_eq!(chains.len(), 4);
        assert_eq!(chains["ethereum"].chain_id, 1);
        assert_eq!(chains["bsc"].native_symbol, "BNB");
        assert!(chains["ethereum"].rewards_enabled);
        assert!(!chains["polygon"].rewards_enabled);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [poller]
            interval_secs = 15

            [chains.local]
            name = "Anvil"
            chain_id = 31337
            rewards_enabled = true
            "#,
        )
        .unwrap();

        assert_eq!(config.poller.interval_secs, 15);
        assert_eq!(config.poller.lookback_blocks, 10_000);
        assert_eq!(config.chains["local"].rpc_timeout_secs, 10);
        assert_eq!(config.reward_chains(), vec!["local".to_string()]);
    }
}
