//! Per-chain client registry.

use std::collections::BTreeMap;

use crate::blockchain::client::BlockchainClient;
use crate::blockchain::types::{BlockchainError, BlockchainResult};
use crate::config::schema::ChainConfig;

/// One [`BlockchainClient`] per configured chain key.
#[derive(Debug, Clone, Default)]
pub struct ChainRegistry {
    clients: BTreeMap<String, BlockchainClient>,
}

impl ChainRegistry {
    pub fn from_config(chains: &BTreeMap<String, ChainConfig>) -> BlockchainResult<Self> {
        let mut clients = BTreeMap::new();
        for (key, chain) in chains {
            clients.insert(key.clone(), BlockchainClient::new(key, chain.clone())?);
        }
        tracing::info!(chains = clients.len(), "Chain registry initialized");
        Ok(Self { clients })
    }

    /// Client for a chain key, or `UnknownChain`.
    pub fn get(&self, chain: &str) -> BlockchainResult<&BlockchainClient> {
        self.clients
            .get(chain)
            .ok_or_else(|| BlockchainError::UnknownChain(chain.to_string()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.clients.keys().map(String::as_str)
    }

    pub fn clients(&self) -> impl Iterator<Item = &BlockchainClient> {
        self.clients.values()
    }

    /// Check every chain's reported id against its configuration.
    ///
    /// Mismatches and unreachable RPCs are logged, never fatal: the API
    /// stays up for the chains that work.
    pub async fn verify_all(&self) {
        for (key, client) in &self.clients {
            match client.verify_chain_id().await {
                Ok(()) => tracing::info!(
                    chain = %key,
                    chain_id = client.config().chain_id,
                    "Blockchain client verified"
                ),
                Err(e) => tracing::warn!(
                    chain = %key,
                    error = %e,
                    "Chain verification failed"
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::default_chains;

    #[test]
    fn test_registry_from_defaults() {
        let registry = ChainRegistry::from_config(&default_chains()).unwrap();
        let keys: Vec<&str> = registry.keys().collect();
        assert_eq!(keys, vec!["base", "bsc", "ethereum", "polygon"]);
        assert_eq!(registry.get("bsc").unwrap().config().chain_id, 56);
    }

    #[test]
    fn test_unknown_chain() {
        let registry = ChainRegistry::from_config(&default_chains()).unwrap();
        let err = registry.get("solana").unwrap_err();
        assert!(matches!(err, BlockchainError::UnknownChain(ref c) if c == "solana"));
    }
}
