//! Wallet creation, import and message signing.
//!
//! # Security
//! - Keys are never logged or serialized; only addresses are
//! - The treasury key is loaded ONLY from the environment
//! - Custodial user keys reach disk only through [`crate::blockchain::vault`]

use alloy::network::EthereumWallet;
use alloy::primitives::{Address, B256};
use alloy::signers::local::coins_bip39::{English, Mnemonic};
use alloy::signers::local::{MnemonicBuilder, PrivateKeySigner};
use alloy::signers::Signer;

use crate::blockchain::types::{BlockchainError, BlockchainResult};

/// Environment variable holding the treasury key used for reward payouts.
pub const TREASURY_KEY_ENV_VAR: &str = "COINTWO_TREASURY_PRIVATE_KEY";

/// An EVM account with signing capability.
#[derive(Debug, Clone)]
pub struct Wallet {
    signer: PrivateKeySigner,
}

impl Wallet {
    /// Generate a fresh wallet and return it with its BIP-39 phrase.
    ///
    /// The phrase is the only backup the user gets; callers hand it out
    /// once and drop it.
    pub fn generate(word_count: usize) -> BlockchainResult<(Self, String)> {
        let mnemonic = Mnemonic::<English>::new_with_count(&mut rand::thread_rng(), word_count)
            .map_err(|e| BlockchainError::Wallet(format!("Mnemonic generation failed: {}", e)))?;
        let phrase = mnemonic.to_phrase();
        let wallet = Self::from_mnemonic(&phrase)?;

        tracing::debug!(address = %wallet.address(), "Generated wallet");
        Ok((wallet, phrase))
    }

    /// Derive the first account (m/44'/60'/0'/0/0) of a phrase.
    pub fn from_mnemonic(phrase: &str) -> BlockchainResult<Self> {
        let phrase = phrase.split_whitespace().collect::<Vec<_>>().join(" ");
        if phrase.is_empty() {
            return Err(BlockchainError::Wallet("Empty mnemonic".to_string()));
        }

        let signer = MnemonicBuilder::<English>::default()
            .phrase(phrase)
            .index(0)
            .and_then(|b| b.build())
            .map_err(|e| BlockchainError::Wallet(format!("Invalid mnemonic: {}", e)))?;

        Ok(Self { signer })
    }

    /// Create a wallet from a hex-encoded private key (with or without 0x).
    pub fn from_private_key(private_key_hex: &str) -> BlockchainResult<Self> {
        let key_hex = private_key_hex.trim();
        let key_hex = key_hex.strip_prefix("0x").unwrap_or(key_hex);

        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| BlockchainError::Wallet(format!("Invalid private key format: {}", e)))?;

        Ok(Self { signer })
    }

    /// Load the treasury wallet from `COINTWO_TREASURY_PRIVATE_KEY`.
    pub fn from_env() -> BlockchainResult<Self> {
        let private_key = std::env::var(TREASURY_KEY_ENV_VAR).map_err(|_| {
            BlockchainError::Wallet(format!(
                "Environment variable {} not set",
                TREASURY_KEY_ENV_VAR
            ))
        })?;

        let wallet = Self::from_private_key(&private_key)?;
        tracing::info!(address = %wallet.address(), "Treasury wallet loaded");
        Ok(wallet)
    }

    pub(crate) fn from_signer(signer: PrivateKeySigner) -> Self {
        Self { signer }
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Raw secret bytes, for keystore encryption only.
    pub(crate) fn secret_bytes(&self) -> B256 {
        self.signer.to_bytes()
    }

    /// Network wallet for a signing provider.
    pub fn ethereum_wallet(&self) -> EthereumWallet {
        EthereumWallet::from(self.signer.clone())
    }

    /// Sign arbitrary message bytes (EIP-191 prefixed).
    pub async fn sign_message(&self, message: &[u8]) -> BlockchainResult<alloy::signers::Signature> {
        self.signer
            .sign_message(message)
            .await
            .map_err(|e| BlockchainError::Wallet(format!("Message signing failed: {}", e)))
    }
}
