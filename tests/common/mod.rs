//! Shared harness: a real server on an ephemeral port over an in-memory
//! store, offline prices and a chain that is never contacted.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use cointwo_sdk::CoinTwoClient;
use cointwo_wallet::blockchain::{ChainRegistry, KeyVault};
use cointwo_wallet::config::{AppConfig, ChainConfig, DatabaseConfig, TokenConfig};
use cointwo_wallet::prices::{PriceFeed, StaticPrices};
use cointwo_wallet::rewards::Payouts;
use cointwo_wallet::store::Store;
use cointwo_wallet::{AppState, HttpServer, Shutdown};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const ADMIN_KEY: &str = "test-admin-key";
pub const CHAIN: &str = "local";
pub const USDT: &str = "0x00000000000000000000000000000000000000a1";
pub const WETH: &str = "0x00000000000000000000000000000000000000a2";

pub struct TestApp {
    pub addr: SocketAddr,
    pub client: CoinTwoClient,
    pub admin: CoinTwoClient,
    pub store: Store,
    pub config: Arc<AppConfig>,
    pub prices: Arc<dyn PriceFeed>,
    shutdown: Shutdown,
    server: JoinHandle<()>,
    pub keystores: TempDir,
}

impl TestApp {
    /// Stop the server and wait for it to drain.
    pub async fn stop(self) {
        self.shutdown.trigger();
        let _ = self.server.await;
    }
}

/// One reward chain whose RPC port refuses connections.
pub fn test_chains() -> BTreeMap<String, ChainConfig> {
    let mut chains = BTreeMap::new();
    chains.insert(
        CHAIN.to_string(),
        ChainConfig {
            name: "Local".to_string(),
            chain_id: 31337,
            rpc_url: "http://127.0.0.1:1".to_string(),
            rpc_timeout_secs: 1,
            rewards_enabled: true,
            tokens: vec![
                TokenConfig::new(USDT, "USDT", 6),
                TokenConfig::new(WETH, "WETH", 18),
            ],
            ..ChainConfig::default()
        },
    );
    chains
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.database = DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
    };
    config.chains = test_chains();
    config.admin.api_key = ADMIN_KEY.to_string();
    config.observability.metrics_enabled = false;
    config
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(|_| {}).await
}

pub async fn spawn_app_with(customize: impl FnOnce(&mut AppConfig)) -> TestApp {
    let keystores = tempfile::tempdir().unwrap();
    let mut config = test_config();
    config.wallet.keystore_dir = keystores.path().display().to_string();
    customize(&mut config);
    let config = Arc::new(config);

    let store = Store::in_memory().await.unwrap();
    let chains = Arc::new(ChainRegistry::from_config(&config.chains).unwrap());
    let prices: Arc<dyn PriceFeed> = Arc::new(StaticPrices::new([
        ("ETH", 3000.0),
        ("WETH", 3000.0),
        ("USDT", 1.0),
    ]));
    let vault = Arc::new(KeyVault::open(keystores.path()).unwrap());
    let payouts = Payouts::new(&config.rewards, chains.clone(), prices.clone(), None);

    let state = AppState {
        config: config.clone(),
        store: store.clone(),
        chains,
        prices: prices.clone(),
        vault,
        payouts,
    };

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    let server = tokio::spawn(async move {
        HttpServer::new(state).run(listener, rx).await.unwrap();
    });

    let url = format!("http://{}", addr);
    TestApp {
        addr,
        client: CoinTwoClient::new(&url),
        admin: CoinTwoClient::new(&url).with_admin_key(ADMIN_KEY),
        store,
        config,
        prices,
        shutdown,
        server,
        keystores,
    }
}
