//! Typed client for the CoinTwo wallet API.

pub mod client;
pub mod types;

pub use client::{CoinTwoClient, SdkError, SdkResult};
pub use types::*;
