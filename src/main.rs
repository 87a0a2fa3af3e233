//! CoinTwo wallet backend.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────────┐
//!   WebApp ──────▶│ http (axum)                                          │
//!                 │  request id → trace → timeout → limit → CORS         │
//!                 │  wallet / tasks / referral / admin handlers          │
//!                 └───────┬───────────────────┬──────────────────┬───────┘
//!                         │                   │                  │
//!                         ▼                   ▼                  ▼
//!                 ┌──────────────┐   ┌─────────────────┐  ┌─────────────┐
//!                 │ store        │   │ blockchain      │  │ prices      │
//!                 │ (sqlx/SQLite)│   │ (alloy, vault)  │  │ (CoinGecko) │
//!                 └──────▲───────┘   └────────▲────────┘  └──────▲──────┘
//!                        │                    │                  │
//!                 ┌──────┴────────────────────┴──────────────────┴──────┐
//!                 │ rewards: poller → detector → achievements → payouts │
//!                 └─────────────────────────────────────────────────────┘
//! ```

use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use cointwo_wallet::blockchain::{ActivitySource, ChainRegistry, KeyVault, Wallet};
use cointwo_wallet::config::load_from_env;
use cointwo_wallet::http::{AppState, HttpServer};
use cointwo_wallet::lifecycle::{wait_for_signal, Shutdown};
use cointwo_wallet::observability::{logging, metrics};
use cointwo_wallet::prices::{CoinGeckoFeed, PriceFeed};
use cointwo_wallet::rewards::{Detector, Payouts, RewardPoller};
use cointwo_wallet::store::Store;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::dotenv().ok();

    let config = Arc::new(load_from_env()?);
    logging::init_logging(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        chains = config.chains.len(),
        reward_chains = ?config.reward_chains(),
        "Starting cointwo-wallet"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr);
    }

    let store = Store::connect(&config.database).await?;
    store.migrate().await?;

    let chains = Arc::new(ChainRegistry::from_config(&config.chains)?);
    chains.verify_all().await;

    let prices: Arc<dyn PriceFeed> = Arc::new(CoinGeckoFeed::new(&config.prices)?);
    let vault = Arc::new(KeyVault::open(&config.wallet.keystore_dir)?);

    let treasury = if config.rewards.payout_enabled {
        match Wallet::from_env() {
            Ok(wallet) => Some(wallet),
            Err(e) => {
                tracing::warn!(error = %e, "Treasury wallet unavailable");
                None
            }
        }
    } else {
        None
    };
    let payouts = Payouts::new(&config.rewards, chains.clone(), prices.clone(), treasury);

    let shutdown = Shutdown::new();

    let source: Arc<dyn ActivitySource> = chains.clone();
    let detector = Detector::new(&config, source, prices.clone());
    let poller = RewardPoller::new(&config, store.clone(), detector);
    let poller_handle = tokio::spawn(poller.run(shutdown.subscribe()));

    let state = AppState {
        config: config.clone(),
        store,
        chains,
        prices,
        vault,
        payouts,
    };
    let listener = TcpListener::bind(&config.server.bind_address).await?;
    let server = HttpServer::new(state);
    let server_handle = tokio::spawn(server.run(listener, shutdown.subscribe()));

    wait_for_signal().await;
    tracing::info!("Shutting down");
    shutdown.trigger();

    server_handle.await??;
    poller_handle.await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
