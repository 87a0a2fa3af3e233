//! Custodial key storage.
//!
//! Each user's key is kept as an Ethereum keystore JSON file (scrypt + AES)
//! encrypted with that user's password, one file per user. The server never
//! holds a user's key in memory longer than a single send or swap.

use std::path::{Path, PathBuf};

use alloy::signers::local::PrivateKeySigner;

use crate::blockchain::types::{BlockchainError, BlockchainResult};
use crate::blockchain::wallet::Wallet;

/// Directory of encrypted keystores.
#[derive(Debug, Clone)]
pub struct KeyVault {
    dir: PathBuf,
}

impl KeyVault {
    /// Open (and create if missing) the keystore directory.
    pub fn open(dir: impl AsRef<Path>) -> BlockchainResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|e| {
            BlockchainError::Wallet(format!("Cannot create keystore dir {}: {}", dir.display(), e))
        })?;
        Ok(Self { dir })
    }

    /// Encrypt `wallet` under `password` as keystore `id`.
    ///
    /// Key derivation is deliberately slow, so it runs on the blocking pool.
    pub async fn store(&self, id: &str, wallet: &Wallet, password: &str) -> BlockchainResult<()> {
        let dir = self.dir.clone();
        let id = id.to_string();
        let secret = wallet.secret_bytes();
        let password = password.to_string();

        tokio::task::spawn_blocking(move || {
            PrivateKeySigner::encrypt_keystore(
                &dir,
                &mut rand::thread_rng(),
                secret,
                password,
                Some(&id),
            )
            .map(|_| ())
        })
        .await
        .map_err(|e| BlockchainError::Wallet(format!("Keystore task failed: {}", e)))?
        .map_err(|e| BlockchainError::Wallet(format!("Keystore encryption failed: {}", e)))
    }

    /// Decrypt keystore `id` with `password`.
    pub async fn unlock(&self, id: &str, password: &str) -> BlockchainResult<Wallet> {
        let path = self.path_of(id)?;
        if !path.exists() {
            return Err(BlockchainError::Wallet(format!("No keystore for {}", id)));
        }
        let password = password.to_string();

        let signer = tokio::task::spawn_blocking(move || {
            PrivateKeySigner::decrypt_keystore(path, password)
        })
        .await
        .map_err(|e| BlockchainError::Wallet(format!("Keystore task failed: {}", e)))?
        .map_err(|_| BlockchainError::Wallet("Wrong password or corrupt keystore".to_string()))?;

        Ok(Wallet::from_signer(signer))
    }

    /// Delete keystore `id`; a missing file is not an error.
    pub fn remove(&self, id: &str) -> BlockchainResult<()> {
        match std::fs::remove_file(self.path_of(id)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BlockchainError::Wallet(format!("Cannot remove keystore {}: {}", id, e))),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.path_of(id).map(|p| p.exists()).unwrap_or(false)
    }

    /// Keystore ids are used as file names; refuse anything path-like.
    fn path_of(&self, id: &str) -> BlockchainResult<PathBuf> {
        if id.is_empty() || id.contains('/') || id.contains('\\') || id.starts_with('.') {
            return Err(BlockchainError::Wallet(format!("Invalid keystore id '{}'", id)));
        }
        Ok(self.dir.join(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_PRIVATE_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[tokio::test]
    async fn test_store_and_unlock() {
        let dir = tempfile::tempdir().unwrap();
        let vault = KeyVault::open(dir.path().join("keys")).unwrap();
        let wallet = Wallet::from_private_key(TEST_PRIVATE_KEY).unwrap();

        vault.store("user-1", &wallet, "hunter2").await.unwrap();
        assert!(vault.contains("user-1"));

        let unlocked = vault.unlock("user-1", "hunter2").await.unwrap();
        assert_eq!(unlocked.address(), wallet.address());
    }

    #[tokio::test]
    async fn test_wrong_password() {
        let dir = tempfile::tempdir().unwrap();
        let vault = KeyVault::open(dir.path()).unwrap();
        let wallet = Wallet::from_private_key(TEST_PRIVATE_KEY).unwrap();
        vault.store("user-2", &wallet, "right").await.unwrap();

        let err = vault.unlock("user-2", "wrong").await.unwrap_err();
        assert!(err.to_string().contains("Wrong password"));
    }

    #[tokio::test]
    async fn test_missing_and_invalid_ids() {
        let dir = tempfile::tempdir().unwrap();
        let vault = KeyVault::open(dir.path()).unwrap();

        assert!(vault.unlock("nobody", "pw").await.is_err());
        assert!(vault.unlock("../etc/passwd", "pw").await.is_err());
        assert!(!vault.contains(".hidden"));
    }

    #[tokio::test]
    async fn test_remove() {
        let dir = tempfile::tempdir().unwrap();
        let vault = KeyVault::open(dir.path()).unwrap();
        let wallet = Wallet::from_private_key(TEST_PRIVATE_KEY).unwrap();
        vault.store("user-3", &wallet, "pw").await.unwrap();

        vault.remove("user-3").unwrap();
        assert!(!vault.contains("user-3"));
        vault.remove("user-3").unwrap();
        assert!(vault.remove("../user-3").is_err());
    }
}
