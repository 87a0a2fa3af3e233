//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals > 0, thresholds >= 0)
//! - Check that every address and URL parses
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use alloy::primitives::Address;
use std::collections::HashSet;
use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::AppConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    /// What is wrong with it.
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate the whole configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "server.bind_address",
            format!("'{}' is not a socket address", config.server.bind_address),
        ));
    }
    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::new("server.request_timeout_secs", "must be > 0"));
    }
    if config.database.url.is_empty() {
        errors.push(ValidationError::new("database.url", "must not be empty"));
    }
    if ![12, 15, 18, 21, 24].contains(&config.wallet.mnemonic_words) {
        errors.push(ValidationError::new(
            "wallet.mnemonic_words",
            "must be one of 12, 15, 18, 21, 24",
        ));
    }

    validate_chains(config, &mut errors);

    let poller = &config.poller;
    if poller.interval_secs == 0 {
        errors.push(ValidationError::new("poller.interval_secs", "must be > 0"));
    }
    if poller.lookback_blocks == 0 {
        errors.push(ValidationError::new("poller.lookback_blocks", "must be > 0"));
    }
    if !(poller.deposit_min_usd >= 0.0) {
        errors.push(ValidationError::new("poller.deposit_min_usd", "must be >= 0"));
    }
    if !(poller.swap_min_usd >= 0.0) {
        errors.push(ValidationError::new("poller.swap_min_usd", "must be >= 0"));
    }
    if poller.swap_from.is_empty() {
        errors.push(ValidationError::new("poller.swap_from", "must not be empty"));
    }
    if poller.swap_to.is_empty() {
        errors.push(ValidationError::new("poller.swap_to", "must not be empty"));
    }

    let rewards = &config.rewards;
    if !(rewards.reward_usd >= 0.0) {
        errors.push(ValidationError::new("rewards.reward_usd", "must be >= 0"));
    }
    for (field, xp) in [
        ("rewards.xp_deposit", rewards.xp_deposit),
        ("rewards.xp_swap", rewards.xp_swap),
        ("rewards.xp_invite", rewards.xp_invite),
    ] {
        if xp < 0 {
            errors.push(ValidationError::new(field, "must be >= 0"));
        }
    }
    if rewards.campaign_goal < 1 {
        errors.push(ValidationError::new("rewards.campaign_goal", "must be >= 1"));
    }
    if rewards.level_unit < 1 {
        errors.push(ValidationError::new("rewards.level_unit", "must be >= 1"));
    }

    if config.prices.cache_ttl_secs == 0 {
        errors.push(ValidationError::new("prices.cache_ttl_secs", "must be > 0"));
    }
    if config.prices.max_attempts == 0 {
        errors.push(ValidationError::new("prices.max_attempts", "must be > 0"));
    }
    if url::Url::parse(&config.prices.base_url).is_err() {
        errors.push(ValidationError::new("prices.base_url", "is not a valid URL"));
    }

    if config.admin.enabled && config.admin.api_key.is_empty() {
        errors.push(ValidationError::new("admin.api_key", "must not be empty"));
    }

    if config.rate_limit.enabled
        && (config.rate_limit.requests_per_second == 0 || config.rate_limit.burst_size == 0)
    {
        errors.push(ValidationError::new(
            "rate_limit",
            "requests_per_second and burst_size must be > 0",
        ));
    }

    if !matches!(config.observability.log_format.as_str(), "pretty" | "json") {
        errors.push(ValidationError::new(
            "observability.log_format",
            "must be 'pretty' or 'json'",
        ));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            "is not a socket address",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_chains(config: &AppConfig, errors: &mut Vec<ValidationError>) {
    if config.chains.is_empty() {
        errors.push(ValidationError::new("chains", "at least one chain is required"));
    }

    let mut seen_ids = HashSet::new();
    for (key, chain) in &config.chains {
        let prefix = format!("chains.{}", key);

        if chain.chain_id == 0 {
            errors.push(ValidationError::new(format!("{prefix}.chain_id"), "must be > 0"));
        } else if !seen_ids.insert(chain.chain_id) {
            errors.push(ValidationError::new(
                format!("{prefix}.chain_id"),
                format!("chain id {} is used twice", chain.chain_id),
            ));
        }

        for rpc in std::iter::once(&chain.rpc_url).chain(chain.failover_urls.iter()) {
            if url::Url::parse(rpc).is_err() {
                errors.push(ValidationError::new(
                    format!("{prefix}.rpc_url"),
                    format!("'{}' is not a valid URL", rpc),
                ));
            }
        }

        if chain.rpc_timeout_secs == 0 {
            errors.push(ValidationError::new(
                format!("{prefix}.rpc_timeout_secs"),
                "must be > 0",
            ));
        }

        if !chain.router_address.is_empty() && chain.router_address.parse::<Address>().is_err() {
            errors.push(ValidationError::new(
                format!("{prefix}.router_address"),
                format!("'{}' is not an address", chain.router_address),
            ));
        }

        let mut symbols = HashSet::new();
        for token in &chain.tokens {
            if token.address.parse::<Address>().is_err() {
                errors.push(ValidationError::new(
                    format!("{prefix}.tokens"),
                    format!("'{}' is not an address", token.address),
                ));
            }
            if token.decimals > 36 {
                errors.push(ValidationError::new(
                    format!("{prefix}.tokens"),
                    format!("{} has {} decimals (max 36)", token.symbol, token.decimals),
                ));
            }
            if !symbols.insert(token.symbol.to_uppercase()) {
                errors.push(ValidationError::new(
                    format!("{prefix}.tokens"),
                    format!("symbol {} is listed twice", token.symbol),
                ));
            }
        }
    }
}
