use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::json;
use thiserror::Error;

use crate::types::*;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned {status}: {error}")]
    Api {
        status: u16,
        error: String,
        detail: Option<String>,
    },
}

impl SdkError {
    /// HTTP status of an API error.
    pub fn status(&self) -> Option<u16> {
        match self {
            SdkError::Api { status, .. } => Some(*status),
            SdkError::Http(e) => e.status().map(|s| s.as_u16()),
        }
    }
}

pub type SdkResult<T> = Result<T, SdkError>;

/// Client for one backend instance.
#[derive(Debug, Clone)]
pub struct CoinTwoClient {
    client: Client,
    base_url: String,
    admin_key: Option<String>,
}

impl CoinTwoClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            admin_key: None,
        }
    }

    /// Send `key` as a Bearer token on admin calls.
    pub fn with_admin_key(mut self, key: &str) -> Self {
        self.admin_key = Some(key.to_string());
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn admin(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.admin_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(builder: RequestBuilder) -> SdkResult<T> {
        let resp = builder.send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp.json().await?);
        }

        let text = resp.text().await.unwrap_or_default();
        let (error, detail) = match serde_json::from_str::<ErrorBody>(&text) {
            Ok(body) => (body.error, body.detail),
            Err(_) => (text, None),
        };
        Err(SdkError::Api {
            status: status.as_u16(),
            error,
            detail,
        })
    }

    pub async fn health(&self) -> SdkResult<Health> {
        Self::send(self.client.get(self.url("/health"))).await
    }

    pub async fn chains(&self) -> SdkResult<Vec<ChainInfo>> {
        Self::send(self.client.get(self.url("/chains"))).await
    }

    pub async fn prices(&self, symbols: &[&str]) -> SdkResult<Prices> {
        let req = self
            .client
            .get(self.url("/prices"))
            .query(&[("symbols", symbols.join(","))]);
        Self::send(req).await
    }

    pub async fn create_wallet(
        &self,
        email: &str,
        password: &str,
        referral_code: Option<&str>,
    ) -> SdkResult<CreatedWallet> {
        let body = json!({
            "email": email,
            "password": password,
            "referralCode": referral_code,
        });
        Self::send(self.client.post(self.url("/wallet/create")).json(&body)).await
    }

    pub async fn import_wallet(&self, req: &ImportWallet) -> SdkResult<Account> {
        Self::send(self.client.post(self.url("/wallet/import")).json(req)).await
    }

    pub async fn login(&self, email: &str, password: &str) -> SdkResult<Account> {
        let body = json!({ "email": email, "password": password });
        Self::send(self.client.post(self.url("/login")).json(&body)).await
    }

    pub async fn balance(&self, address: &str, chain: &str) -> SdkResult<Balance> {
        let req = self
            .client
            .get(self.url("/wallet/balance"))
            .query(&[("address", address), ("chain", chain)]);
        Self::send(req).await
    }

    pub async fn send_tx(&self, req: &SendTx) -> SdkResult<TxReceipt> {
        Self::send(self.client.post(self.url("/wallet/send")).json(req)).await
    }

    pub async fn swap(&self, req: &SwapTx) -> SdkResult<TxReceipt> {
        Self::send(self.client.post(self.url("/wallet/swap")).json(req)).await
    }

    pub async fn token_info(&self, address: &str, chain: &str) -> SdkResult<TokenInfo> {
        let req = self
            .client
            .get(self.url("/wallet/token-info"))
            .query(&[("address", address), ("chain", chain)]);
        Self::send(req).await
    }

    pub async fn add_token(&self, req: &AddToken) -> SdkResult<SavedToken> {
        Self::send(self.client.post(self.url("/wallet/add-token")).json(req)).await
    }

    pub async fn tokens(&self, user: &str, chain: &str) -> SdkResult<Vec<SavedToken>> {
        let req = self
            .client
            .get(self.url("/wallet/tokens"))
            .query(&[("user", user), ("chain", chain)]);
        let saved: SavedTokens = Self::send(req).await?;
        Ok(saved.tokens)
    }

    /// Tasks of a user (address, email or id), optionally for one chain.
    pub async fn task_status(&self, address: &str, chain: Option<&str>) -> SdkResult<Vec<TaskInfo>> {
        let mut query = vec![("address", address)];
        if let Some(chain) = chain {
            query.push(("chain", chain));
        }
        Self::send(self.client.get(self.url("/task/status")).query(&query)).await
    }

    pub async fn user_xp(&self, address: &str, chain: &str) -> SdkResult<XpInfo> {
        let req = self
            .client
            .get(self.url("/user/xp"))
            .query(&[("address", address), ("chain", chain)]);
        Self::send(req).await
    }

    pub async fn referral_progress(&self, user: &str, chain: &str) -> SdkResult<ReferralProgress> {
        let req = self
            .client
            .get(self.url("/referral/progress"))
            .query(&[("user", user), ("chain", chain)]);
        Self::send(req).await
    }

    pub async fn admin_status(&self) -> SdkResult<serde_json::Value> {
        Self::send(self.admin(self.client.get(self.url("/admin/status")))).await
    }

    pub async fn pending_rewards(&self) -> SdkResult<Vec<RewardInfo>> {
        let pending: PendingRewards =
            Self::send(self.admin(self.client.get(self.url("/admin/pending-rewards")))).await?;
        Ok(pending.rewards)
    }

    pub async fn approve_reward(&self, reward_id: i64) -> SdkResult<RewardInfo> {
        let req = self
            .admin(self.client.post(self.url("/admin/approve")))
            .json(&json!({ "rewardId": reward_id }));
        Self::send(req).await
    }

    pub async fn reject_reward(&self, reward_id: i64) -> SdkResult<RewardInfo> {
        let req = self
            .admin(self.client.post(self.url("/admin/reject")))
            .json(&json!({ "rewardId": reward_id }));
        Self::send(req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_shape() {
        let tx = SendTx {
            credentials: Credentials::PrivateKey {
                private_key: "0xabc".to_string(),
            },
            to: "0x1".to_string(),
            amount: "1.5".to_string(),
            token_address: None,
            chain: "ethereum".to_string(),
        };
        let body = serde_json::to_value(&tx).unwrap();
        assert_eq!(body["privateKey"], "0xabc");
        assert!(body.get("tokenAddress").is_none());

        let tx = SendTx {
            credentials: Credentials::Account {
                email: "a@x.io".to_string(),
                password: "secret1".to_string(),
            },
            ..tx
        };
        let body = serde_json::to_value(&tx).unwrap();
        assert_eq!(body["email"], "a@x.io");
        assert_eq!(body["password"], "secret1");
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = CoinTwoClient::new("http://localhost:4000/");
        assert_eq!(client.url("/health"), "http://localhost:4000/health");
    }
}
