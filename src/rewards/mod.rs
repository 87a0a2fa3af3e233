//! On-chain activity detection and the reward-eligibility pipeline.
//!
//! # Data Flow
//! ```text
//! RewardPoller tick (poller.rs)
//!     → for each user × rewards-enabled chain
//!         → Detector (detector.rs): balances/logs via ActivitySource,
//!           USD via PriceFeed
//!         → Store::record_achievement (pending → eligible, reward, XP,
//!           campaign; idempotent)
//!         → Store::qualify_referral when the invitee has deposit + swap
//!
//! Admin approve (payout.rs)
//!     → Store::claim_payout (pending → paying) → RewardSender transfer
//!     → Store::complete_payout, or Store::decide_reward when not paying
//! ```
//!
//! # Design Decisions
//! - Detection only reads chain state; every write goes through one store
//!   transaction, so re-running a cycle is harmless
//! - One failing user never aborts a cycle

pub mod detector;
pub mod payout;
pub mod poller;
pub mod progress;

use thiserror::Error;

use crate::blockchain::BlockchainError;
use crate::prices::PriceError;
use crate::store::StoreError;

pub use detector::{DepositValue, Detector, QualifiedSwap};
pub use payout::{Payouts, RewardSender, TreasurySender};
pub use poller::{PollReport, RewardPoller};
pub use progress::{level_for, rules_for};

/// Errors from the reward pipeline.
#[derive(Debug, Error)]
pub enum RewardError {
    #[error(transparent)]
    Chain(#[from] BlockchainError),

    #[error(transparent)]
    Price(#[from] PriceError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Invalid wallet address: {0}")]
    InvalidAddress(String),

    #[error("Payout failed: {0}")]
    Payout(String),
}

pub type RewardResult<T> = Result<T, RewardError>;
