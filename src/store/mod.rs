//! Relational persistence (SQLite via sqlx).
//!
//! # Responsibilities
//! - Own the connection pool and create the schema on startup
//! - Users, tasks, XP, campaigns, referrals, rewards and custom tokens
//! - The achievement transaction: the only place that moves a task from
//!   `pending` to `eligible` and grants its reward, XP and campaign step
//!
//! # Design Decisions
//! - Enum columns are stored as snake_case TEXT
//! - Timestamps are unix seconds
//! - Unique-constraint violations surface as [`StoreError::Conflict`]

pub mod models;
pub mod progress;
pub mod referrals;
pub mod rewards;
pub mod tasks;
pub mod tokens;
pub mod users;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

use crate::config::schema::DatabaseConfig;

pub use models::{
    Action, CampaignProgress, CampaignStatus, NewUser, Referral, ReferralStatus, Reward,
    RewardStatus, Task, TaskStatus, User, UserToken, UserXp,
};
pub use progress::{Achievement, AchievementRules};

/// Errors from the store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Already exists: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Map a unique-constraint violation to `Conflict(what)`.
pub(crate) fn conflict_on_unique(e: sqlx::Error, what: &str) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(what.to_string())
        }
        _ => StoreError::Database(e),
    }
}

pub(crate) fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        wallet_address TEXT NOT NULL UNIQUE,
        keystore_id TEXT NOT NULL,
        referral_code TEXT NOT NULL UNIQUE,
        referred_by TEXT REFERENCES users(id),
        created_at INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS tasks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id TEXT NOT NULL REFERENCES users(id),
        chain TEXT NOT NULL,
        task_number INTEGER NOT NULL,
        kind TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'pending',
        reward_sent INTEGER NOT NULL DEFAULT 0,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL,
        UNIQUE(user_id, chain, kind)
    )",
    "CREATE TABLE IF NOT EXISTS user_xp (
        user_id TEXT NOT NULL REFERENCES users(id),
        chain TEXT NOT NULL,
        xp INTEGER NOT NULL DEFAULT 0,
        level INTEGER NOT NULL DEFAULT 1,
        updated_at INTEGER NOT NULL,
        PRIMARY KEY (user_id, chain)
    )",
    "CREATE TABLE IF NOT EXISTS campaign_progress (
        user_id TEXT NOT NULL REFERENCES users(id),
        chain TEXT NOT NULL,
        campaign_id TEXT NOT NULL,
        progress INTEGER NOT NULL DEFAULT 0,
        goal INTEGER NOT NULL,
        status TEXT NOT NULL DEFAULT 'in_progress',
        updated_at INTEGER NOT NULL,
        PRIMARY KEY (user_id, chain, campaign_id)
    )",
    "CREATE TABLE IF NOT EXISTS referrals (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        inviter_id TEXT NOT NULL REFERENCES users(id),
        invitee_id TEXT NOT NULL UNIQUE REFERENCES users(id),
        status TEXT NOT NULL DEFAULT 'pending',
        qualified_chain TEXT,
        created_at INTEGER NOT NULL,
        qualified_at INTEGER
    )",
    "CREATE TABLE IF NOT EXISTS rewards (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id TEXT NOT NULL REFERENCES users(id),
        task_id INTEGER NOT NULL REFERENCES tasks(id),
        chain TEXT NOT NULL,
        kind TEXT NOT NULL,
        amount_usd REAL NOT NULL,
        status TEXT NOT NULL DEFAULT 'pending',
        tx_hash TEXT,
        created_at INTEGER NOT NULL,
        decided_at INTEGER
    )",
    "CREATE TABLE IF NOT EXISTS user_tokens (
        user_id TEXT NOT NULL REFERENCES users(id),
        chain TEXT NOT NULL,
        address TEXT NOT NULL,
        symbol TEXT NOT NULL,
        name TEXT NOT NULL,
        decimals INTEGER NOT NULL,
        created_at INTEGER NOT NULL,
        PRIMARY KEY (user_id, chain, address)
    )",
    "CREATE INDEX IF NOT EXISTS idx_rewards_status ON rewards(status)",
    "CREATE INDEX IF NOT EXISTS idx_referrals_inviter ON referrals(inviter_id)",
];

/// Handle to the database; cheap to clone.
#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open the pool. In-memory databases get a single, never-recycled
    /// connection so every query sees the same data.
    pub async fn connect(config: &DatabaseConfig) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(&config.url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let in_memory = config.url.contains(":memory:") || config.url.contains("mode=memory");
        let pool = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(config.max_connections)
                .connect_with(options)
                .await?
        };

        tracing::info!(url = %config.url, in_memory, "Database connected");
        Ok(Self { pool })
    }

    /// Fresh in-memory store with the schema applied.
    pub async fn in_memory() -> StoreResult<Self> {
        let store = Self::connect(&DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
        })
        .await?;
        store.migrate().await?;
        Ok(store)
    }

    /// Create missing tables. sqlx runs one statement per query.
    pub async fn migrate(&self) -> StoreResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        tracing::debug!(statements = SCHEMA.len(), "Schema ready");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// True if the database answers a trivial query.
    pub async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Store with one user per email, no referrals, tasks on `chains`.
    pub async fn store_with_users(emails: &[&str], chains: &[&str]) -> (Store, Vec<User>) {
        let store = Store::in_memory().await.unwrap();
        let chains: Vec<String> = chains.iter().map(|c| c.to_string()).collect();
        let mut users = Vec::new();
        for (i, email) in emails.iter().enumerate() {
            let user = store
                .create_user(
                    NewUser {
                        email: email.to_string(),
                        password_hash: "hash".to_string(),
                        wallet_address: format!("0x{:040x}", i + 1),
                        keystore_id: format!("ks-{}", i + 1),
                        referred_by: None,
                    },
                    &chains,
                )
                .await
                .unwrap();
            users.push(user);
        }
        (store, users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_migrate_is_idempotent() {
        let store = Store::in_memory().await.unwrap();
        store.migrate().await.unwrap();
        assert!(store.ping().await);
    }
}
