//! Deposit and swap detection in USD.
//!
//! # Responsibilities
//! - Value a user's native balance plus recent incoming transfers of known
//!   tokens
//! - Find the user's best recent swap that matches the swap rule
//!
//! Tokens outside a chain's configured list are ignored: their decimals and
//! prices are unknown.

use alloy::primitives::utils::format_units;
use alloy::primitives::{Address, U256};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::blockchain::{ActivitySource, BlockchainError, SwapFill, TokenBook};
use crate::config::schema::{AppConfig, PollerConfig};
use crate::prices::PriceFeed;
use crate::rewards::RewardResult;

/// Decimals of every EVM native coin.
const NATIVE_DECIMALS: u8 = 18;

/// Convert base units to a float amount.
pub fn units_to_f64(value: U256, decimals: u8) -> f64 {
    format_units(value, decimals)
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0)
}

#[derive(Debug, Clone)]
struct ChainMeta {
    native_symbol: String,
    tokens: TokenBook,
}

/// USD breakdown of a deposit check.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DepositValue {
    pub native_usd: f64,
    pub transfers_usd: f64,
}

impl DepositValue {
    pub fn total(&self) -> f64 {
        self.native_usd + self.transfers_usd
    }
}

/// A swap that satisfies the swap rule.
#[derive(Debug, Clone, PartialEq)]
pub struct QualifiedSwap {
    pub fill: SwapFill,
    pub from_symbol: String,
    pub to_symbol: String,
    pub usd: f64,
}

/// Reads chain activity and prices it.
#[derive(Clone)]
pub struct Detector {
    source: Arc<dyn ActivitySource>,
    prices: Arc<dyn PriceFeed>,
    chains: HashMap<String, ChainMeta>,
    rules: PollerConfig,
}

impl Detector {
    pub fn new(
        config: &AppConfig,
        source: Arc<dyn ActivitySource>,
        prices: Arc<dyn PriceFeed>,
    ) -> Self {
        let chains = config
            .chains
            .iter()
            .map(|(key, chain)| {
                (
                    key.clone(),
                    ChainMeta {
                        native_symbol: chain.native_symbol.to_uppercase(),
                        tokens: TokenBook::from_config(chain),
                    },
                )
            })
            .collect();

        let mut rules = config.poller.clone();
        rules.swap_from = rules.swap_from.iter().map(|s| s.to_uppercase()).collect();
        rules.swap_to = rules.swap_to.iter().map(|s| s.to_uppercase()).collect();

        Self {
            source,
            prices,
            chains,
            rules,
        }
    }

    fn chain(&self, chain: &str) -> RewardResult<&ChainMeta> {
        self.chains
            .get(chain)
            .ok_or_else(|| BlockchainError::UnknownChain(chain.to_string()).into())
    }

    /// Native balance plus recent incoming known-token transfers, in USD.
    pub async fn deposit_value(&self, chain: &str, owner: Address) -> RewardResult<DepositValue> {
        let meta = self.chain(chain)?;

        let balance = self.source.native_balance(chain, owner).await?;
        let transfers = self
            .source
            .incoming_transfers(chain, owner, self.rules.lookback_blocks)
            .await?;

        let known: Vec<(String, f64)> = transfers
            .iter()
            .filter(|t| t.to == owner)
            .filter_map(|t| {
                let token = meta.tokens.by_address(&t.token)?;
                Some((token.symbol.clone(), units_to_f64(t.value, token.decimals)))
            })
            .collect();

        let mut symbols: BTreeSet<String> = known.iter().map(|(s, _)| s.clone()).collect();
        symbols.insert(meta.native_symbol.clone());
        let symbols: Vec<String> = symbols.into_iter().collect();
        let prices = self.prices.usd_prices(&symbols).await?;
        let price = |symbol: &str| prices.get(symbol).copied().unwrap_or(0.0);

        let value = DepositValue {
            native_usd: units_to_f64(balance, NATIVE_DECIMALS) * price(&meta.native_symbol),
            transfers_usd: known.iter().map(|(s, amount)| amount * price(s)).sum(),
        };

        tracing::debug!(
            chain = %chain,
            user = %owner,
            native_usd = value.native_usd,
            transfers_usd = value.transfers_usd,
            transfers = known.len(),
            "Deposit valued"
        );
        Ok(value)
    }

    /// True when the deposit value reaches `deposit_min_usd`.
    pub async fn deposit_qualifies(&self, chain: &str, owner: Address) -> RewardResult<bool> {
        let value = self.deposit_value(chain, owner).await?;
        Ok(value.total() >= self.rules.deposit_min_usd)
    }

    /// The highest-valued recent swap matching the swap rule, if any.
    pub async fn qualifying_swap(
        &self,
        chain: &str,
        owner: Address,
    ) -> RewardResult<Option<QualifiedSwap>> {
        let meta = self.chain(chain)?;
        let fills = self
            .source
            .swap_fills(chain, owner, self.rules.lookback_blocks)
            .await?;
        if fills.is_empty() {
            return Ok(None);
        }

        let symbols: Vec<String> = fills
            .iter()
            .flat_map(|f| [f.token_in, f.token_out])
            .filter_map(|a| meta.tokens.by_address(&a).map(|t| t.symbol.clone()))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let prices = self.prices.usd_prices(&symbols).await?;

        let best = evaluate_swaps(&fills, &meta.tokens, &prices, &self.rules);
        if let Some(swap) = &best {
            tracing::debug!(
                chain = %chain,
                user = %owner,
                from = %swap.from_symbol,
                to = %swap.to_symbol,
                usd = swap.usd,
                "Qualifying swap found"
            );
        }
        Ok(best)
    }
}

/// Pick the highest-valued fill whose legs match the rule.
///
/// A fill is valued by its input leg when that token is priced, else by its
/// output leg.
pub fn evaluate_swaps(
    fills: &[SwapFill],
    tokens: &TokenBook,
    prices: &HashMap<String, f64>,
    rules: &PollerConfig,
) -> Option<QualifiedSwap> {
    let matches_rule = |list: &[String], symbol: &str| list.iter().any(|s| s.eq_ignore_ascii_case(symbol));

    fills
        .iter()
        .filter_map(|fill| {
            let token_in = tokens.by_address(&fill.token_in)?;
            let token_out = tokens.by_address(&fill.token_out)?;
            if !matches_rule(&rules.swap_from, &token_in.symbol)
                || !matches_rule(&rules.swap_to, &token_out.symbol)
            {
                return None;
            }

            let usd = match prices.get(&token_in.symbol) {
                Some(price) => units_to_f64(fill.amount_in, token_in.decimals) * price,
                None => {
                    let price = prices.get(&token_out.symbol)?;
                    units_to_f64(fill.amount_out, token_out.decimals) * price
                }
            };
            if usd < rules.swap_min_usd {
                return None;
            }

            Some(QualifiedSwap {
                fill: fill.clone(),
                from_symbol: token_in.symbol.clone(),
                to_symbol: token_out.symbol.clone(),
                usd,
            })
        })
        .max_by(|a, b| a.usd.total_cmp(&b.usd))
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use crate::blockchain::{BlockchainResult, TokenTransfer};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// In-memory activity per (chain, address).
    #[derive(Default)]
    pub struct MockActivity {
        pub balances: Mutex<HashMap<(String, Address), U256>>,
        pub transfers: Mutex<HashMap<(String, Address), Vec<TokenTransfer>>>,
        pub swaps: Mutex<HashMap<(String, Address), Vec<SwapFill>>>,
        /// Addresses whose reads fail.
        pub broken: Mutex<Vec<Address>>,
    }

    impl MockActivity {
        fn check(&self, owner: Address) -> BlockchainResult<()> {
            if self.broken.lock().unwrap().contains(&owner) {
                return Err(BlockchainError::Rpc("connection refused".to_string()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl ActivitySource for MockActivity {
        async fn native_balance(&self, chain: &str, owner: Address) -> BlockchainResult<U256> {
            self.check(owner)?;
            Ok(self
                .balances
                .lock()
                .unwrap()
                .get(&(chain.to_string(), owner))
                .copied()
                .unwrap_or_default())
        }

        async fn incoming_transfers(
            &self,
            chain: &str,
            owner: Address,
            _lookback: u64,
        ) -> BlockchainResult<Vec<TokenTransfer>> {
            self.check(owner)?;
            Ok(self
                .transfers
                .lock()
                .unwrap()
                .get(&(chain.to_string(), owner))
                .cloned()
                .unwrap_or_default())
        }

        async fn swap_fills(
            &self,
            chain: &str,
            owner: Address,
            _lookback: u64,
        ) -> BlockchainResult<Vec<SwapFill>> {
            self.check(owner)?;
            Ok(self
                .swaps
                .lock()
                .unwrap()
                .get(&(chain.to_string(), owner))
                .cloned()
                .unwrap_or_default())
        }
    }

    pub fn transfer(token: Address, to: Address, value: U256) -> TokenTransfer {
        TokenTransfer {
            token,
            from: Address::ZERO,
            to,
            value,
            block_number: Some(1),
            tx_hash: None,
        }
    }

    pub fn fill(token_in: Address, amount_in: U256, token_out: Address, amount_out: U256) -> SwapFill {
        SwapFill {
            pair: Address::repeat_byte(0x77),
            token_in,
            amount_in,
            token_out,
            amount_out,
            block_number: Some(1),
            tx_hash: None,
        }
    }
}
