//! Request and response bodies of the wallet API.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Deserialize)]
pub struct Health {
    pub status: String,
    pub time: u64,
    pub version: String,
    pub database: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenView {
    pub address: String,
    pub symbol: String,
    pub decimals: u8,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainInfo {
    pub key: String,
    pub name: String,
    pub chain_id: u64,
    pub native_symbol: String,
    pub explorer: String,
    pub rewards_enabled: bool,
    pub swap_enabled: bool,
    pub tokens: Vec<TokenView>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Prices {
    pub prices: HashMap<String, f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedWallet {
    pub user_id: String,
    pub address: String,
    pub mnemonic: String,
    pub referral_code: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportWallet {
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mnemonic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referral_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub user_id: String,
    pub email: String,
    pub address: String,
    pub referral_code: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalance {
    pub address: String,
    pub symbol: String,
    pub decimals: u8,
    pub balance: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    pub chain: String,
    pub address: String,
    pub native_symbol: String,
    pub native: String,
    pub tokens: Vec<TokenBalance>,
}

/// Signing credentials: a raw key, or the custodial account login.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Credentials {
    PrivateKey {
        #[serde(rename = "privateKey")]
        private_key: String,
    },
    Account { email: String, password: String },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendTx {
    #[serde(flatten)]
    pub credentials: Credentials,
    pub to: String,
    pub amount: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_address: Option<String>,
    pub chain: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapTx {
    #[serde(flatten)]
    pub credentials: Credentials,
    pub from_token: String,
    pub to_token: String,
    pub amount_in: String,
    pub chain: String,
    pub slippage: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxReceipt {
    pub chain: String,
    pub from: String,
    pub tx_hash: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenInfo {
    pub address: String,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AddToken {
    pub address: String,
    pub chain: String,
    pub user: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u8>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedToken {
    pub user_id: String,
    pub chain: String,
    pub address: String,
    pub symbol: String,
    pub name: String,
    pub decimals: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SavedTokens {
    pub tokens: Vec<SavedToken>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInfo {
    pub task_number: i64,
    pub kind: String,
    pub title: String,
    /// `pending`, `eligible`, `completed` or `rejected`.
    pub status: String,
    pub reward_sent: bool,
    pub chain: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub campaign_id: String,
    pub chain: String,
    pub progress: i64,
    pub goal: i64,
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct XpInfo {
    pub chain: String,
    pub xp: i64,
    pub level: i64,
    pub campaigns: Vec<Campaign>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralInfo {
    pub invitee_address: String,
    pub status: String,
    pub deposit_done: bool,
    pub swap_done: bool,
    pub qualified_chain: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralProgress {
    pub referral_code: String,
    pub chain: String,
    pub qualified: usize,
    pub referrals: Vec<ReferralInfo>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardInfo {
    pub id: i64,
    pub user_id: String,
    pub task_id: i64,
    pub chain: String,
    pub kind: String,
    pub amount_usd: f64,
    /// `pending`, `paying`, `approved` or `rejected`.
    pub status: String,
    pub tx_hash: Option<String>,
    pub created_at: i64,
    pub decided_at: Option<i64>,
    #[serde(default)]
    pub wallet_address: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PendingRewards {
    pub rewards: Vec<RewardInfo>,
}

/// Body of every error response.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default)]
    pub detail: Option<String>,
}
