//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! cointwo.toml (or $COINTWO_CONFIG) + .env + process environment
//!     → loader.rs (parse, deserialize, env overrides)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_from_env, ConfigError};
pub use schema::{
    AdminConfig, AppConfig, ChainConfig, DatabaseConfig, ObservabilityConfig, PollerConfig,
    PriceConfig, RateLimitConfig, RewardsConfig, ServerConfig, TokenConfig, WalletConfig,
};
