//! Admin decisions on rewards, with optional on-chain payout.
//!
//! # Design Decisions
//! - The treasury key comes only from `COINTWO_TREASURY_PRIVATE_KEY`;
//!   without it approvals are bookkeeping only
//! - An approval claims the reward (`pending → paying`) before any
//!   transfer, so concurrent approvals cannot pay twice
//! - A failed transfer returns the reward to `pending`; a sent transfer
//!   whose bookkeeping fails stays `paying` and is never paid again

use alloy::primitives::Address;
use async_trait::async_trait;
use std::sync::Arc;

use crate::blockchain::{ChainRegistry, TxSender, Wallet};
use crate::config::schema::RewardsConfig;
use crate::observability::metrics;
use crate::prices::PriceFeed;
use crate::rewards::{RewardError, RewardResult};
use crate::store::{Reward, RewardStatus, Store, StoreError};

/// Fractional digits used when converting a USD reward to token units.
const PAYOUT_PRECISION: u8 = 6;

/// Token amount, as a decimal string, worth `usd` at `price`.
pub fn payout_amount(usd: f64, price: f64, decimals: u8) -> RewardResult<String> {
    if !(price > 0.0) || !usd.is_finite() || usd < 0.0 {
        return Err(RewardError::Payout(format!(
            "cannot convert ${} at price {}",
            usd, price
        )));
    }
    let precision = decimals.min(PAYOUT_PRECISION) as usize;
    Ok(format!("{:.*}", precision, usd / price))
}

/// Sends an approved reward to its recipient and returns the tx hash.
#[async_trait]
pub trait RewardSender: Send + Sync {
    async fn send_reward(&self, reward: &Reward, to: Address) -> RewardResult<String>;
}

/// Pays rewards in `payout_token` from the treasury wallet.
pub struct TreasurySender {
    registry: Arc<ChainRegistry>,
    prices: Arc<dyn PriceFeed>,
    treasury: Wallet,
    payout_token: String,
}

impl TreasurySender {
    pub fn new(
        registry: Arc<ChainRegistry>,
        prices: Arc<dyn PriceFeed>,
        treasury: Wallet,
        payout_token: &str,
    ) -> Self {
        Self {
            registry,
            prices,
            treasury,
            payout_token: payout_token.to_string(),
        }
    }
}

#[async_trait]
impl RewardSender for TreasurySender {
    async fn send_reward(&self, reward: &Reward, to: Address) -> RewardResult<String> {
        let client = self.registry.get(&reward.chain)?;
        let token = client
            .tokens()
            .by_symbol(&self.payout_token)
            .ok_or_else(|| {
                RewardError::Payout(format!(
                    "{} is not a known token on {}",
                    self.payout_token, reward.chain
                ))
            })?
            .clone();
        let price = self
            .prices
            .usd_price(&token.symbol)
            .await?
            .ok_or_else(|| RewardError::Payout(format!("no price for {}", token.symbol)))?;
        let amount = payout_amount(reward.amount_usd, price, token.decimals)?;

        let sender = TxSender::new(client, self.treasury.clone())?;
        let tx_hash = sender
            .send_token(token.address, to, &amount)
            .await
            .map_err(|e| RewardError::Payout(e.to_string()))?;

        tracing::info!(
            reward_id = reward.id,
            chain = %reward.chain,
            to = %to,
            token = %token.symbol,
            amount = %amount,
            tx_hash = %tx_hash,
            "Reward paid out"
        );
        Ok(tx_hash.to_string())
    }
}

/// Approves and rejects rewards.
#[derive(Clone)]
pub struct Payouts {
    sender: Option<Arc<dyn RewardSender>>,
    config: RewardsConfig,
}

impl Payouts {
    pub fn new(
        config: &RewardsConfig,
        registry: Arc<ChainRegistry>,
        prices: Arc<dyn PriceFeed>,
        treasury: Option<Wallet>,
    ) -> Self {
        let sender = treasury.map(|wallet| {
            Arc::new(TreasurySender::new(registry, prices, wallet, &config.payout_token))
                as Arc<dyn RewardSender>
        });
        Self::with_sender(config, sender)
    }

    pub fn with_sender(config: &RewardsConfig, sender: Option<Arc<dyn RewardSender>>) -> Self {
        if config.payout_enabled && sender.is_none() {
            tracing::warn!("Payouts enabled but no treasury key; approvals will not transfer");
        }
        Self {
            sender,
            config: config.clone(),
        }
    }

    /// True when approvals send tokens.
    pub fn sends_payouts(&self) -> bool {
        self.config.payout_enabled && self.sender.is_some()
    }

    /// Approve a pending reward, paying it out first when configured.
    pub async fn approve(&self, store: &Store, reward_id: i64) -> RewardResult<Reward> {
        let sender = match &self.sender {
            Some(sender) if self.config.payout_enabled => sender,
            _ => {
                let decided = store
                    .decide_reward(reward_id, RewardStatus::Approved, None)
                    .await?;
                metrics::record_reward_decision("approved");
                return Ok(decided);
            }
        };

        let reward = store.claim_payout(reward_id).await?;
        let tx_hash = match pay(store, &reward, sender.as_ref()).await {
            Ok(tx_hash) => tx_hash,
            Err(e) => {
                tracing::error!(reward_id, chain = %reward.chain, error = %e, "Reward payout failed");
                if let Err(release) = store.release_payout(reward_id).await {
                    tracing::error!(reward_id, error = %release, "Failed to release reward");
                }
                return Err(e);
            }
        };

        let decided = store
            .complete_payout(reward_id, &tx_hash)
            .await
            .map_err(|e| {
                tracing::error!(
                    reward_id,
                    tx_hash = %tx_hash,
                    error = %e,
                    "Payout sent but not recorded; reward left paying"
                );
                e
            })?;
        metrics::record_reward_decision("approved");
        Ok(decided)
    }

    pub async fn reject(&self, store: &Store, reward_id: i64) -> RewardResult<Reward> {
        let decided = store
            .decide_reward(reward_id, RewardStatus::Rejected, None)
            .await?;
        metrics::record_reward_decision("rejected");
        Ok(decided)
    }
}

async fn pay(store: &Store, reward: &Reward, sender: &dyn RewardSender) -> RewardResult<String> {
    let user = store
        .find_user_by_id(&reward.user_id)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("user {}", reward.user_id)))?;
    let to: Address = user
        .wallet_address
        .parse()
        .map_err(|_| RewardError::InvalidAddress(user.wallet_address.clone()))?;
    sender.send_reward(reward, to).await
}
