//! Transaction submission and confirmation for user and treasury wallets.
//!
//! # Responsibilities
//! - Native and ERC-20 transfers from a decimal amount string
//! - Token-to-token swaps through the chain's V2 router
//! - Waiting for the configured number of confirmations
//!
//! # Design Decisions
//! - Nonce, gas and chain id are filled by the provider's recommended
//!   fillers; the wallet filler signs
//! - Reverted receipts are errors, never silent successes

use alloy::network::{Ethereum, TransactionBuilder};
use alloy::primitives::utils::{parse_units, ParseUnits};
use alloy::primitives::{Address, TxHash, U256};
use alloy::providers::{
    DynProvider, PendingTransactionBuilder, PendingTransactionError, Provider, ProviderBuilder,
    WatchTxError,
};
use alloy::rpc::types::TransactionRequest;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::blockchain::client::BlockchainClient;
use crate::blockchain::contracts::{IUniswapV2Router02, IERC20};
use crate::blockchain::types::{BlockchainError, BlockchainResult};
use crate::blockchain::wallet::Wallet;

/// Decimals assumed when a token does not answer `decimals()`.
pub const DEFAULT_DECIMALS: u8 = 18;

/// Seconds a swap stays valid after submission.
pub const SWAP_DEADLINE_SECS: u64 = 600;

/// Upper bound for waiting on confirmations.
const CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(180);

/// Parameters of a router swap.
#[derive(Debug, Clone)]
pub struct SwapRequest {
    pub from_token: Address,
    pub to_token: Address,
    /// Decimal amount of `from_token`.
    pub amount_in: String,
    /// Tolerated slippage in percent (0.5 = 0.5%).
    pub slippage_pct: f64,
}

/// Parse a positive decimal amount into base units.
pub fn parse_amount(amount: &str, decimals: u8) -> BlockchainResult<U256> {
    let trimmed = amount.trim();
    let parsed = parse_units(trimmed, decimals)
        .map_err(|e| BlockchainError::InvalidAmount(format!("'{}': {}", amount, e)))?;

    match parsed {
        ParseUnits::U256(value) if !value.is_zero() => Ok(value),
        ParseUnits::U256(_) => Err(BlockchainError::InvalidAmount(
            "amount must be greater than zero".to_string(),
        )),
        ParseUnits::I256(_) => Err(BlockchainError::InvalidAmount(
            "amount must not be negative".to_string(),
        )),
    }
}

/// `quoted - quoted * floor(slippage * 100) / 10000`.
pub fn min_amount_out(quoted: U256, slippage_pct: f64) -> BlockchainResult<U256> {
    if !(0.0..=100.0).contains(&slippage_pct) {
        return Err(BlockchainError::InvalidAmount(format!(
            "slippage {} is not between 0 and 100",
            slippage_pct
        )));
    }
    let basis_points = U256::from((slippage_pct * 100.0).floor() as u64);
    Ok(quoted - quoted * basis_points / U256::from(10_000u64))
}

fn deadline() -> U256 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    U256::from(now + SWAP_DEADLINE_SECS)
}

/// Signs and submits transactions on one chain for one wallet.
pub struct TxSender {
    client: BlockchainClient,
    wallet: Wallet,
    provider: DynProvider,
}

impl TxSender {
    pub fn new(client: &BlockchainClient, wallet: Wallet) -> BlockchainResult<Self> {
        let provider = ProviderBuilder::new()
            .wallet(wallet.ethereum_wallet())
            .connect_http(client.primary_url()?)
            .erased();

        Ok(Self {
            client: client.clone(),
            wallet,
            provider,
        })
    }

    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    /// Send native coin.
    pub async fn send_native(&self, to: Address, amount: &str) -> BlockchainResult<TxHash> {
        let value = parse_amount(amount, DEFAULT_DECIMALS)?;
        let tx = TransactionRequest::default().with_to(to).with_value(value);

        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(|e| BlockchainError::Rpc(format!("Send failed: {}", e)))?;

        tracing::info!(
            chain = %self.client.key(),
            from = %self.address(),
            to = %to,
            tx_hash = %pending.tx_hash(),
            "Native transfer submitted"
        );
        self.confirm(pending).await
    }

    /// Send an ERC-20 token; decimals are read from the token contract.
    pub async fn send_token(
        &self,
        token: Address,
        to: Address,
        amount: &str,
    ) -> BlockchainResult<TxHash> {
        let decimals = self.decimals_or_default(token).await;
        let value = parse_amount(amount, decimals)?;

        let contract = IERC20::new(token, &self.provider);
        let pending = contract
            .transfer(to, value)
            .send()
            .await
            .map_err(|e| BlockchainError::Rpc(format!("Token transfer failed: {}", e)))?;

        tracing::info!(
            chain = %self.client.key(),
            token = %token,
            from = %self.address(),
            to = %to,
            tx_hash = %pending.tx_hash(),
            "Token transfer submitted"
        );
        self.confirm(pending).await
    }

    /// Swap exact `amount_in` of `from_token` for `to_token` via the router.
    pub async fn swap(&self, request: &SwapRequest) -> BlockchainResult<TxHash> {
        let router_address: Address = self
            .client
            .config()
            .router_address
            .parse()
            .map_err(|_| {
                BlockchainError::NotAvailable(format!(
                    "no swap router configured on {}",
                    self.client.key()
                ))
            })?;

        let decimals = self.decimals_or_default(request.from_token).await;
        let amount_in = parse_amount(&request.amount_in, decimals)?;
        let owner = self.address();

        // 1. Approve the router when the allowance is short
        let allowance = self
            .client
            .token_allowance(request.from_token, owner, router_address)
            .await?;
        if allowance < amount_in {
            let token = IERC20::new(request.from_token, &self.provider);
            let pending = token
                .approve(router_address, amount_in)
                .send()
                .await
                .map_err(|e| BlockchainError::Rpc(format!("Approve failed: {}", e)))?;
            tracing::debug!(tx_hash = %pending.tx_hash(), "Router approval submitted");
            self.confirm(pending).await?;
        }

        // 2. Quote and apply slippage
        let path = vec![request.from_token, request.to_token];
        let router = IUniswapV2Router02::new(router_address, &self.provider);
        let amounts = router
            .getAmountsOut(amount_in, path.clone())
            .call()
            .await
            .map_err(|e| BlockchainError::Rpc(format!("getAmountsOut failed: {}", e)))?;
        let quoted = amounts.last().copied().ok_or_else(|| {
            BlockchainError::Rpc("Router returned an empty quote".to_string())
        })?;
        let min_out = min_amount_out(quoted, request.slippage_pct)?;

        // 3. Swap
        let pending = router
            .swapExactTokensForTokens(amount_in, min_out, path, owner, deadline())
            .send()
            .await
            .map_err(|e| BlockchainError::Rpc(format!("Swap failed: {}", e)))?;

        tracing::info!(
            chain = %self.client.key(),
            from_token = %request.from_token,
            to_token = %request.to_token,
            amount_in = %amount_in,
            min_out = %min_out,
            tx_hash = %pending.tx_hash(),
            "Swap submitted"
        );
        self.confirm(pending).await
    }

    async fn decimals_or_default(&self, token: Address) -> u8 {
        match self.client.token_decimals(token).await {
            Ok(decimals) => decimals,
            Err(e) => {
                tracing::warn!(token = %token, error = %e, "decimals() failed, assuming 18");
                DEFAULT_DECIMALS
            }
        }
    }

    /// Wait for the configured confirmations; reverted receipts are errors.
    async fn confirm(&self, pending: PendingTransactionBuilder<Ethereum>) -> BlockchainResult<TxHash> {
        let tx_hash = *pending.tx_hash();
        let required = self.client.confirmation_blocks().max(1);

        let receipt = pending
            .with_required_confirmations(required)
            .with_timeout(Some(CONFIRMATION_TIMEOUT))
            .get_receipt()
            .await
            .map_err(|e| match e {
                PendingTransactionError::TxWatcher(WatchTxError::Timeout) => {
                    BlockchainError::ConfirmationTimeout(required)
                }
                other => BlockchainError::Rpc(format!("Receipt failed: {}", other)),
            })?;

        if !receipt.status() {
            return Err(BlockchainError::Reverted(tx_hash.to_string()));
        }

        tracing::info!(
            chain = %self.client.key(),
            tx_hash = %tx_hash,
            block = ?receipt.block_number,
            "Transaction confirmed"
        );
        Ok(tx_hash)
    }
}
