use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::http::error::{ApiError, ApiResult};
use crate::http::server::AppState;
use crate::store::Reward;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainStatus {
    pub key: String,
    pub healthy: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub users: usize,
    pub pending_rewards: usize,
    pub payouts_enabled: bool,
    pub chains: Vec<ChainStatus>,
}

pub async fn get_status(State(state): State<AppState>) -> ApiResult<Json<SystemStatus>> {
    let users = state.store.list_users().await?.len();
    let pending_rewards = state.store.pending_rewards().await?.len();

    let mut chains = Vec::new();
    for client in state.chains.clients() {
        chains.push(ChainStatus {
            key: client.key().to_string(),
            healthy: client.is_healthy().await,
        });
    }

    Ok(Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        users,
        pending_rewards,
        payouts_enabled: state.payouts.sends_payouts(),
        chains,
    }))
}

/// A pending reward with the recipient's contact details.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingReward {
    #[serde(flatten)]
    pub reward: Reward,
    pub wallet_address: Option<String>,
    pub email: Option<String>,
}

#[derive(Serialize)]
pub struct PendingRewards {
    pub rewards: Vec<PendingReward>,
}

pub async fn pending_rewards(State(state): State<AppState>) -> ApiResult<Json<PendingRewards>> {
    let mut rewards = Vec::new();
    for reward in state.store.pending_rewards().await? {
        let user = state.store.find_user_by_id(&reward.user_id).await?;
        rewards.push(PendingReward {
            wallet_address: user.as_ref().map(|u| u.wallet_address.clone()),
            email: user.map(|u| u.email),
            reward,
        });
    }
    Ok(Json(PendingRewards { rewards }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DecisionRequest {
    pub reward_id: Option<i64>,
}

fn reward_id(payload: Result<Json<DecisionRequest>, JsonRejection>) -> ApiResult<i64> {
    let Json(req) = payload?;
    req.reward_id
        .ok_or_else(|| ApiError::bad_request("rewardId is required"))
}

pub async fn approve(
    State(state): State<AppState>,
    payload: Result<Json<DecisionRequest>, JsonRejection>,
) -> ApiResult<Json<Reward>> {
    let id = reward_id(payload)?;
    let reward = state.payouts.approve(&state.store, id).await?;
    Ok(Json(reward))
}

pub async fn reject(
    State(state): State<AppState>,
    payload: Result<Json<DecisionRequest>, JsonRejection>,
) -> ApiResult<Json<Reward>> {
    let id = reward_id(payload)?;
    let reward = state.payouts.reject(&state.store, id).await?;
    Ok(Json(reward))
}
