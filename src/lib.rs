//! CoinTwo wallet backend library.
//!
//! A custodial multi-chain EVM wallet API for a Telegram WebApp, with a
//! background poller that turns on-chain activity into tasks, XP and
//! admin-reviewed rewards.

pub mod admin;
pub mod blockchain;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod prices;
pub mod resilience;
pub mod rewards;
pub mod security;
pub mod store;

pub use config::schema::AppConfig;
pub use http::{AppState, HttpServer};
pub use lifecycle::Shutdown;
