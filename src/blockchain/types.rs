//! Chain-specific types and error definitions.

use alloy::primitives::Address;
use std::collections::HashMap;
use thiserror::Error;

use crate::config::schema::ChainConfig;

/// Chain ID type for strong typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainId(pub u64);

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<ChainId> for u64 {
    fn from(id: ChainId) -> Self {
        id.0
    }
}

/// Errors that can occur during blockchain operations.
#[derive(Debug, Error)]
pub enum BlockchainError {
    /// RPC connection or request failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// RPC request timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// Transaction was not confirmed within expected time.
    #[error("Transaction not confirmed after {0} blocks")]
    ConfirmationTimeout(u64),

    /// Transaction was reverted on-chain.
    #[error("Transaction reverted: {0}")]
    Reverted(String),

    /// Invalid private key, mnemonic or keystore.
    #[error("Wallet error: {0}")]
    Wallet(String),

    /// Amount string could not be turned into base units.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// No client is configured for the chain key.
    #[error("Unknown chain: {0}")]
    UnknownChain(String),

    /// Chain configuration mismatch.
    #[error("Chain ID mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: u64, actual: u64 },

    /// Feature not configured on this chain (e.g. no router).
    #[error("Blockchain not available: {0}")]
    NotAvailable(String),
}

/// Result type for blockchain operations.
pub type BlockchainResult<T> = Result<T, BlockchainError>;

/// A token with known decimals and a price feed symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct KnownToken {
    pub address: Address,
    pub symbol: String,
    pub decimals: u8,
}

/// Lookup table over a chain's configured tokens.
#[derive(Debug, Clone, Default)]
pub struct TokenBook {
    by_address: HashMap<Address, KnownToken>,
}

impl TokenBook {
    /// Build from config. Entries whose address does not parse are skipped
    /// (validation reports them before we get here).
    pub fn from_config(chain: &ChainConfig) -> Self {
        let by_address = chain
            .tokens
            .iter()
            .filter_map(|t| {
                let address = t.address.parse::<Address>().ok()?;
                Some((
                    address,
                    KnownToken {
                        address,
                        symbol: t.symbol.to_uppercase(),
                        decimals: t.decimals,
                    },
                ))
            })
            .collect();
        Self { by_address }
    }

    pub fn by_address(&self, address: &Address) -> Option<&KnownToken> {
        self.by_address.get(address)
    }

    /// Case-insensitive symbol lookup.
    pub fn by_symbol(&self, symbol: &str) -> Option<&KnownToken> {
        let symbol = symbol.to_uppercase();
        self.by_address.values().find(|t| t.symbol == symbol)
    }

    pub fn addresses(&self) -> Vec<Address> {
        self.by_address.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.by_address.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_address.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::default_chains;

    #[test]
    fn test_chain_id_conversion() {
        let chain_id = ChainId::from(1u64);
        assert_eq!(chain_id.0, 1);
        assert_eq!(u64::from(chain_id), 1);
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            BlockchainError::Timeout(10).to_string(),
            "RPC timeout after 10 seconds"
        );
        let err = BlockchainError::ChainMismatch {
            expected: 1,
            actual: 56,
        };
        assert!(err.to_string().contains("expected 1, got 56"));
        assert_eq!(
            BlockchainError::UnknownChain("solana".into()).to_string(),
            "Unknown chain: solana"
        );
    }

    #[test]
    fn test_token_book_lookup() {
        let chains = default_chains();
        let book = TokenBook::from_config(&chains["ethereum"]);
        assert_eq!(book.len(), 4);

        let usdt: Address = "0xdAC17F958D2ee523a2206206994597C13D831ec7".parse().unwrap();
        let token = book.by_address(&usdt).unwrap();
        assert_eq!(token.symbol, "USDT");
        assert_eq!(token.decimals, 6);

        assert_eq!(book.by_symbol("dai").unwrap().decimals, 18);
        assert!(book.by_symbol("SHIB").is_none());
    }
}
