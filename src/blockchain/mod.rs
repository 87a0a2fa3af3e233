//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! [chains.*] config
//!     → client.rs (per-chain RPC with timeouts and failover)
//!     → registry.rs (chain key → client)
//!     → activity.rs (balances, Transfer and Swap logs for the poller)
//!
//! User credentials / treasury env var
//!     → wallet.rs (generate, import, sign)
//!     → vault.rs (encrypted keystore per user)
//!     → transaction.rs (send, swap, confirm)
//! ```
//!
//! # Security Constraints
//! - Never log private keys, mnemonics or passwords
//! - All RPC calls have configurable timeouts
//! - Graceful degradation when a chain is unreachable

pub mod activity;
pub mod client;
pub mod contracts;
pub mod registry;
pub mod transaction;
pub mod types;
pub mod vault;
pub mod wallet;

pub use activity::{ActivitySource, SwapFill, TokenTransfer};
pub use client::{BlockchainClient, TokenMetadata};
pub use registry::ChainRegistry;
pub use transaction::{SwapRequest, TxSender};
pub use types::{BlockchainError, BlockchainResult, ChainId, KnownToken, TokenBook};
pub use vault::KeyVault;
pub use wallet::Wallet;
