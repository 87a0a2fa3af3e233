//! On-chain activity reads used by the reward poller.
//!
//! # Responsibilities
//! - Native balance of a user
//! - Incoming ERC-20 `Transfer` logs of known tokens over a block window
//! - V2 pair `Swap` logs whose recipient is the user, with both legs resolved
//!
//! # Design Decisions
//! - The poller depends on the [`ActivitySource`] trait, not on RPC, so the
//!   pipeline can be driven by fixtures
//! - Swaps are found by topic (`Swap` signature + indexed `to`) across all
//!   pairs; the pair's `token0/token1` tell which asset went in and out

use alloy::primitives::{Address, TxHash, U256};
use alloy::rpc::types::{Filter, Log};
use alloy::sol_types::SolEvent;
use async_trait::async_trait;

use crate::blockchain::client::BlockchainClient;
use crate::blockchain::contracts::{IUniswapV2Pair, IERC20};
use crate::blockchain::registry::ChainRegistry;
use crate::blockchain::types::BlockchainResult;

/// An ERC-20 transfer into a user's address.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenTransfer {
    pub token: Address,
    pub from: Address,
    pub to: Address,
    pub value: U256,
    pub block_number: Option<u64>,
    pub tx_hash: Option<TxHash>,
}

/// One decoded V2 swap: what the user gave and what they received.
#[derive(Debug, Clone, PartialEq)]
pub struct SwapFill {
    pub pair: Address,
    pub token_in: Address,
    pub amount_in: U256,
    pub token_out: Address,
    pub amount_out: U256,
    pub block_number: Option<u64>,
    pub tx_hash: Option<TxHash>,
}

/// Source of the on-chain facts the reward pipeline needs.
#[async_trait]
pub trait ActivitySource: Send + Sync {
    /// Native balance in wei.
    async fn native_balance(&self, chain: &str, owner: Address) -> BlockchainResult<U256>;

    /// Transfers of the chain's known tokens to `owner` within the last
    /// `lookback` blocks.
    async fn incoming_transfers(
        &self,
        chain: &str,
        owner: Address,
        lookback: u64,
    ) -> BlockchainResult<Vec<TokenTransfer>>;

    /// Swaps paying out to `owner` within the last `lookback` blocks.
    async fn swap_fills(
        &self,
        chain: &str,
        owner: Address,
        lookback: u64,
    ) -> BlockchainResult<Vec<SwapFill>>;
}

/// Decode an ERC-20 `Transfer` log. Returns `None` for other events.
pub fn decode_transfer(log: &Log) -> Option<TokenTransfer> {
    let decoded = log.log_decode::<IERC20::Transfer>().ok()?;
    let event = decoded.inner;
    Some(TokenTransfer {
        token: event.address,
        from: event.from,
        to: event.to,
        value: event.value,
        block_number: log.block_number,
        tx_hash: log.transaction_hash,
    })
}

/// Decode a V2 `Swap` log given the pair's tokens.
///
/// The input leg is the token with a non-zero `amountXIn`, the output leg
/// the token with a non-zero `amountXOut`. Logs where neither direction is
/// complete yield `None`.
pub fn decode_swap(log: &Log, token0: Address, token1: Address) -> Option<SwapFill> {
    let decoded = log.log_decode::<IUniswapV2Pair::Swap>().ok()?;
    let event = decoded.inner;

    let (token_in, amount_in, token_out, amount_out) =
        if !event.amount0In.is_zero() && !event.amount1Out.is_zero() {
            (token0, event.amount0In, token1, event.amount1Out)
        } else if !event.amount1In.is_zero() && !event.amount0Out.is_zero() {
            (token1, event.amount1In, token0, event.amount0Out)
        } else {
            return None;
        };

    Some(SwapFill {
        pair: event.address,
        token_in,
        amount_in,
        token_out,
        amount_out,
        block_number: log.block_number,
        tx_hash: log.transaction_hash,
    })
}

async fn block_window(client: &BlockchainClient, lookback: u64) -> BlockchainResult<(u64, u64)> {
    let latest = client.get_block_number().await?;
    Ok((latest.saturating_sub(lookback), latest))
}

#[async_trait]
impl ActivitySource for ChainRegistry {
    async fn native_balance(&self, chain: &str, owner: Address) -> BlockchainResult<U256> {
        self.get(chain)?.get_balance(owner).await
    }

    async fn incoming_transfers(
        &self,
        chain: &str,
        owner: Address,
        lookback: u64,
    ) -> BlockchainResult<Vec<TokenTransfer>> {
        let client = self.get(chain)?;
        let tokens = client.tokens().addresses();
        if tokens.is_empty() {
            return Ok(Vec::new());
        }

        let (from_block, to_block) = block_window(client, lookback).await?;
        let filter = Filter::new()
            .address(tokens)
            .event_signature(IERC20::Transfer::SIGNATURE_HASH)
            .topic2(owner)
            .from_block(from_block)
            .to_block(to_block);

        let logs = client.get_logs(&filter).await?;
        let transfers: Vec<TokenTransfer> = logs.iter().filter_map(decode_transfer).collect();

        tracing::debug!(
            chain = %chain,
            user = %owner,
            from_block,
            to_block,
            transfers = transfers.len(),
            "Scanned incoming transfers"
        );
        Ok(transfers)
    }

    async fn swap_fills(
        &self,
        chain: &str,
        owner: Address,
        lookback: u64,
    ) -> BlockchainResult<Vec<SwapFill>> {
        let client = self.get(chain)?;
        let (from_block, to_block) = block_window(client, lookback).await?;

        // `to` is the second indexed argument of Swap
        let filter = Filter::new()
            .event_signature(IUniswapV2Pair::Swap::SIGNATURE_HASH)
            .topic2(owner)
            .from_block(from_block)
            .to_block(to_block);

        let logs = client.get_logs(&filter).await?;
        let mut fills = Vec::new();
        for log in &logs {
            let (token0, token1) = match client.pair_tokens(log.address()).await {
                Ok(tokens) => tokens,
                Err(e) => {
                    // Not every contract emitting this signature is a V2 pair
                    tracing::debug!(chain = %chain, pair = %log.address(), error = %e, "Skipping swap log");
                    continue;
                }
            };
            if let Some(fill) = decode_swap(log, token0, token1) {
                fills.push(fill);
            }
        }

        tracing::debug!(
            chain = %chain,
            user = %owner,
            logs = logs.len(),
            fills = fills.len(),
            "Scanned swap logs"
        );
        Ok(fills)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{address, b256};

    const USER: Address = address!("f39fd6e51aad88f6f4ce6ab8827279cfffb92266");
    const WETH: Address = address!("c02aaa39b223fe8d0a0e5c4f27ead9083c756cc2");
    const USDT: Address = address!("dac17f958d2ee523a2206206994597c13d831ec7");
    const PAIR: Address = address!("0d4a11d5eeaac28ec3f61d100daf4d40471f1852");

    fn rpc_log(address: Address, data: alloy::primitives::LogData) -> Log {
        Log {
            inner: alloy::primitives::Log { address, data },
            block_number: Some(100),
            transaction_hash: Some(b256!(
                "0000000000000000000000000000000000000000000000000000000000000abc"
            )),
            ..Default::default()
        }
    }

    fn swap_log(a0_in: u64, a1_in: u64, a0_out: u64, a1_out: u64) -> Log {
        let event = IUniswapV2Pair::Swap {
            sender: Address::ZERO,
            amount0In: U256::from(a0_in),
            amount1In: U256::from(a1_in),
            amount0Out: U256::from(a0_out),
            amount1Out: U256::from(a1_out),
            to: USER,
        };
        rpc_log(PAIR, event.encode_log_data())
    }

    #[test]
    fn test_decode_transfer() {
        let event = IERC20::Transfer {
            from: Address::ZERO,
            to: USER,
            value: U256::from(25_000_000u64),
        };
        let log = rpc_log(USDT, event.encode_log_data());

        let transfer = decode_transfer(&log).unwrap();
        assert_eq!(transfer.token, USDT);
        assert_eq!(transfer.to, USER);
        assert_eq!(transfer.value, U256::from(25_000_000u64));
        assert_eq!(transfer.block_number, Some(100));
    }

    #[test]
    fn test_decode_transfer_rejects_other_events() {
        assert!(decode_transfer(&swap_log(1, 0, 0, 1)).is_none());
    }

    #[test]
    fn test_decode_swap_token0_in() {
        // token0 = WETH in, token1 = USDT out
        let fill = decode_swap(&swap_log(10, 0, 0, 30_000), WETH, USDT).unwrap();
        assert_eq!(fill.pair, PAIR);
        assert_eq!(fill.token_in, WETH);
        assert_eq!(fill.amount_in, U256::from(10u64));
        assert_eq!(fill.token_out, USDT);
        assert_eq!(fill.amount_out, U256::from(30_000u64));
    }

    #[test]
    fn test_decode_swap_token1_in() {
        let fill = decode_swap(&swap_log(0, 500, 7, 0), WETH, USDT).unwrap();
        assert_eq!(fill.token_in, USDT);
        assert_eq!(fill.token_out, WETH);
        assert_eq!(fill.amount_out, U256::from(7u64));
    }

    #[test]
    fn test_decode_swap_incomplete() {
        assert!(decode_swap(&swap_log(0, 0, 0, 0), WETH, USDT).is_none());
        assert!(decode_swap(&swap_log(5, 0, 3, 0), WETH, USDT).is_none());
    }
}
