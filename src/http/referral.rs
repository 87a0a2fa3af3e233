//! Referral progress for the inviter.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::Serialize;

use crate::http::error::ApiResult;
use crate::http::extract::{lookup_user, required};
use crate::http::server::AppState;
use crate::http::wallet::UserChainQuery;
use crate::store::{Action, ReferralStatus};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralView {
    pub invitee_address: String,
    pub status: ReferralStatus,
    pub deposit_done: bool,
    pub swap_done: bool,
    pub qualified_chain: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralProgress {
    pub referral_code: String,
    pub chain: String,
    pub qualified: usize,
    pub referrals: Vec<ReferralView>,
}

/// Everyone `user` invited, with their task progress on `chain`.
pub async fn progress(
    State(state): State<AppState>,
    query: Result<Query<UserChainQuery>, QueryRejection>,
) -> ApiResult<Json<ReferralProgress>> {
    let Query(query) = query?;
    let user = lookup_user(&state.store, required("user", query.user.as_deref())?).await?;
    let chain = required("chain", query.chain.as_deref())?;
    state.chains.get(chain)?;

    let mut referrals = Vec::new();
    for referral in state.store.referrals_of(&user.id).await? {
        let Some(invitee) = state.store.find_user_by_id(&referral.invitee_id).await? else {
            continue;
        };
        let deposit = state
            .store
            .task_status(&invitee.id, chain, Action::Deposit)
            .await?;
        let swap = state.store.task_status(&invitee.id, chain, Action::Swap).await?;

        referrals.push(ReferralView {
            invitee_address: invitee.wallet_address,
            status: referral.status,
            deposit_done: deposit.is_achieved(),
            swap_done: swap.is_achieved(),
            qualified_chain: referral.qualified_chain,
            created_at: referral.created_at,
        });
    }

    let qualified = referrals
        .iter()
        .filter(|r| r.status == ReferralStatus::Qualified)
        .count();

    Ok(Json(ReferralProgress {
        referral_code: user.referral_code,
        chain: chain.to_string(),
        qualified,
        referrals,
    }))
}
