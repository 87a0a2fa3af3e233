//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV_VAR: &str = "COINTWO_CONFIG";

/// Config file used when the environment does not name one.
pub const DEFAULT_CONFIG_PATH: &str = "cointwo.toml";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut config: AppConfig = toml::from_str(&content)?;
    apply_env_overrides(&mut config);

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load the file named by `COINTWO_CONFIG` (or `cointwo.toml`), falling
/// back to defaults when it does not exist.
pub fn load_from_env() -> Result<AppConfig, ConfigError> {
    let path = std::env::var(CONFIG_PATH_ENV_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let path = Path::new(&path);

    if path.exists() {
        tracing::info!(path = %path.display(), "Loading configuration file");
        return load_config(path);
    }

    tracing::warn!(path = %path.display(), "Config file not found, using defaults");
    let mut config = AppConfig::default();
    apply_env_overrides(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Apply overrides from the process environment.
///
/// `<CHAIN>_RPC_URL` overrides the RPC endpoint of chain key `<chain>`;
/// `ETH_RPC_URL` is accepted for `ethereum`.
pub fn apply_env_overrides(config: &mut AppConfig) {
    apply_overrides_from(config, |key| std::env::var(key).ok());
}

fn apply_overrides_from<F>(config: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup("DATABASE_URL") {
        config.database.url = url;
    }
    if let Some(key) = lookup("ADMIN_API_KEY") {
        config.admin.api_key = key;
    }
    if let Some(addr) = lookup("BIND_ADDRESS") {
        config.server.bind_address = addr;
    }

    for (key, chain) in config.chains.iter_mut() {
        let var = format!("{}_RPC_URL", key.to_uppercase());
        let value = lookup(&var).or_else(|| {
            if key == "ethereum" {
                lookup("ETH_RPC_URL")
            } else {
                None
            }
        });
        if let Some(url) = value {
            tracing::debug!(chain = %key, "RPC URL overridden from environment");
            chain.rpc_url = url;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("DATABASE_URL", "sqlite::memory:"),
            ("ETH_RPC_URL", "http://eth.local:8545"),
            ("BSC_RPC_URL", "http://bsc.local:8545"),
            ("ADMIN_API_KEY", "s3cret"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        apply_overrides_from(&mut config, |k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.admin.api_key, "s3cret");
        assert_eq!(config.chains["ethereum"].rpc_url, "http://eth.local:8545");
        assert_eq!(config.chains["bsc"].rpc_url, "http://bsc.local:8545");
        assert_eq!(config.chains["polygon"].rpc_url, "https://rpc.ankr.com/polygon");
    }

    #[test]
    fn test_chain_specific_var_wins_over_alias() {
        let env: HashMap<&str, &str> = [
            ("ETHEREUM_RPC_URL", "http://primary:8545"),
            ("ETH_RPC_URL", "http://alias:8545"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        apply_overrides_from(&mut config, |k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.chains["ethereum"].rpc_url, "http://primary:8545");
    }

    #[test]
    fn test_load_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[poller]\ninterval_secs = 0").unwrap();

        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("poller.interval_secs"));
    }

    #[test]
    fn test_load_unparseable_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[poller\ninterval_secs = ").unwrap();
        assert!(matches!(load_config(file.path()), Err(ConfigError::Parse(_))));
    }
}
