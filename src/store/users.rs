//! User accounts.

use sqlx::SqliteConnection;

use crate::store::models::{NewUser, User};
use crate::store::{now_secs, tasks, Store, StoreError, StoreResult};

const REFERRAL_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const REFERRAL_CODE_LEN: usize = 8;
const REFERRAL_CODE_ATTEMPTS: usize = 5;

/// Random invite code (no 0/O or 1/I).
pub fn generate_referral_code() -> String {
    (0..REFERRAL_CODE_LEN)
        .map(|_| REFERRAL_ALPHABET[fastrand::usize(..REFERRAL_ALPHABET.len())] as char)
        .collect()
}

const USER_COLUMNS: &str = "id, email, password_hash, wallet_address, keystore_id, \
                            referral_code, referred_by, created_at";

impl Store {
    /// Insert a user with its tasks on `reward_chains` and, when invited,
    /// its referral row. All or nothing.
    pub async fn create_user(&self, new: NewUser, reward_chains: &[String]) -> StoreResult<User> {
        let email = new.email.trim().to_lowercase();
        let mut last_err = None;

        for _ in 0..REFERRAL_CODE_ATTEMPTS {
            let id = uuid::Uuid::new_v4().to_string();
            let user = User {
                keystore_id: new.keystore_id.clone(),
                id,
                email: email.clone(),
                password_hash: new.password_hash.clone(),
                wallet_address: new.wallet_address.clone(),
                referral_code: generate_referral_code(),
                referred_by: new.referred_by.clone(),
                created_at: now_secs(),
            };

            let mut tx = self.pool().begin().await?;
            match insert_user(&mut *tx, &user).await {
                Ok(()) => {}
                Err(e) if is_referral_code_clash(&e) => {
                    last_err = Some(e);
                    continue;
                }
                Err(e) => return Err(user_conflict(e)),
            }

            tasks::insert_tasks(&mut *tx, &user.id, reward_chains).await?;

            if let Some(inviter) = &user.referred_by {
                sqlx::query(
                    "INSERT INTO referrals (inviter_id, invitee_id, status, created_at)
                     VALUES (?, ?, 'pending', ?)",
                )
                .bind(inviter)
                .bind(&user.id)
                .bind(user.created_at)
                .execute(&mut *tx)
                .await?;
            }

            tx.commit().await?;
            tracing::info!(
                user_id = %user.id,
                address = %user.wallet_address,
                referred = user.referred_by.is_some(),
                "User created"
            );
            return Ok(user);
        }

        Err(last_err.map(StoreError::Database).unwrap_or_else(|| {
            StoreError::Conflict("could not allocate a referral code".to_string())
        }))
    }

    pub async fn find_user_by_id(&self, id: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await?)
    }

    /// Emails are matched case-insensitively.
    pub async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(email.trim().to_lowercase())
            .fetch_optional(self.pool())
            .await?)
    }

    /// Addresses are matched case-insensitively (checksummed or not).
    pub async fn find_user_by_address(&self, address: &str) -> StoreResult<Option<User>> {
        let sql = format!(
            "SELECT {} FROM users WHERE lower(wallet_address) = lower(?)",
            USER_COLUMNS
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(address.trim())
            .fetch_optional(self.pool())
            .await?)
    }

    pub async fn find_user_by_referral_code(&self, code: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE referral_code = ?", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(code.trim().to_uppercase())
            .fetch_optional(self.pool())
            .await?)
    }

    /// Resolve a user by id, email or wallet address.
    pub async fn resolve_user(&self, key: &str) -> StoreResult<Option<User>> {
        if key.starts_with("0x") {
            return self.find_user_by_address(key).await;
        }
        if key.contains('@') {
            return self.find_user_by_email(key).await;
        }
        self.find_user_by_id(key).await
    }

    /// All users in creation order.
    pub async fn list_users(&self) -> StoreResult<Vec<User>> {
        let sql = format!("SELECT {} FROM users ORDER BY created_at, id", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql).fetch_all(self.pool()).await?)
    }
}

async fn insert_user(conn: &mut SqliteConnection, user: &User) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO users (id, email, password_hash, wallet_address, keystore_id,
                            referral_code, referred_by, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&user.id)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.wallet_address)
    .bind(&user.keystore_id)
    .bind(&user.referral_code)
    .bind(&user.referred_by)
    .bind(user.created_at)
    .execute(conn)
    .await?;
    Ok(())
}

fn unique_message(e: &sqlx::Error) -> Option<String> {
    match e {
        sqlx::Error::Database(db) if db.is_unique_violation() => Some(db.message().to_string()),
        _ => None,
    }
}

fn is_referral_code_clash(e: &sqlx::Error) -> bool {
    unique_message(e).is_some_and(|m| m.contains("referral_code"))
}

fn user_conflict(e: sqlx::Error) -> StoreError {
    match unique_message(&e) {
        Some(m) if m.contains("email") => StoreError::Conflict("email already registered".into()),
        Some(m) if m.contains("wallet_address") => {
            StoreError::Conflict("wallet already registered".into())
        }
        Some(m) => StoreError::Conflict(m),
        None => StoreError::Database(e),
    }
}
