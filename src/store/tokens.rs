//! Custom tokens users add to their wallet view.

use crate::store::models::UserToken;
use crate::store::{conflict_on_unique, now_secs, Store, StoreResult};

impl Store {
    /// Save a token for a user on a chain. Adding the same address twice is
    /// a `Conflict`.
    pub async fn add_token(
        &self,
        user_id: &str,
        chain: &str,
        address: &str,
        symbol: &str,
        name: &str,
        decimals: u8,
    ) -> StoreResult<UserToken> {
        let token = UserToken {
            user_id: user_id.to_string(),
            chain: chain.to_string(),
            address: address.to_string(),
            symbol: symbol.to_string(),
            name: name.to_string(),
            decimals: i64::from(decimals),
            created_at: now_secs(),
        };

        sqlx::query(
            "INSERT INTO user_tokens (user_id, chain, address, symbol, name, decimals, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&token.user_id)
        .bind(&token.chain)
        .bind(&token.address)
        .bind(&token.symbol)
        .bind(&token.name)
        .bind(token.decimals)
        .bind(token.created_at)
        .execute(self.pool())
        .await
        .map_err(|e| conflict_on_unique(e, "token already added"))?;

        Ok(token)
    }

    pub async fn list_tokens(&self, user_id: &str, chain: &str) -> StoreResult<Vec<UserToken>> {
        Ok(sqlx::query_as::<_, UserToken>(
            "SELECT user_id, chain, address, symbol, name, decimals, created_at
             FROM user_tokens WHERE user_id = ? AND chain = ? ORDER BY created_at, symbol",
        )
        .bind(user_id)
        .bind(chain)
        .fetch_all(self.pool())
        .await?)
    }
}

#[cfg(test)]
mod tests {
    use crate::store::test_support::store_with_users;
    use crate::store::StoreError;

    #[tokio::test]
    async fn test_add_and_list_tokens() {
        let (store, users) = store_with_users(&["a@x.io"], &[]).await;
        let id = &users[0].id;
        let pepe = "0x6982508145454Ce325dDbE47a25d4ec3d2311933";

        store.add_token(id, "ethereum", pepe, "PEPE", "Pepe", 18).await.unwrap();
        let err = store
            .add_token(id, "ethereum", pepe, "PEPE", "Pepe", 18)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        // Same address on another chain is a different token
        store.add_token(id, "base", pepe, "PEPE", "Pepe", 18).await.unwrap();

        let tokens = store.list_tokens(id, "ethereum").await.unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].decimals, 18);
        assert!(store.list_tokens(id, "bsc").await.unwrap().is_empty());
    }
}
