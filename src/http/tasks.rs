//! Task, XP and campaign reads for the task page.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::http::error::ApiResult;
use crate::http::extract::{lookup_user, required};
use crate::http::server::AppState;
use crate::store::{Action, CampaignProgress, Task, TaskStatus};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TaskQuery {
    /// Wallet address, email or user id.
    pub address: Option<String>,
    pub chain: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    pub task_number: i64,
    pub kind: Action,
    pub title: &'static str,
    pub status: TaskStatus,
    pub reward_sent: bool,
    pub chain: String,
}

impl From<Task> for TaskView {
    fn from(task: Task) -> Self {
        Self {
            task_number: task.task_number,
            kind: task.kind,
            title: task.kind.title(),
            status: task.status,
            reward_sent: task.reward_sent,
            chain: task.chain,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct XpResponse {
    pub chain: String,
    pub xp: i64,
    pub level: i64,
    pub campaigns: Vec<CampaignProgress>,
}

/// All tasks of a user, optionally narrowed to one chain.
pub async fn task_status(
    State(state): State<AppState>,
    query: Result<Query<TaskQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<TaskView>>> {
    let Query(query) = query?;
    let user = lookup_user(&state.store, required("address", query.address.as_deref())?).await?;
    let chain = query.chain.as_deref().map(str::trim).filter(|c| !c.is_empty());
    if let Some(chain) = chain {
        state.chains.get(chain)?;
    }

    let tasks = state.store.list_tasks(&user.id, chain).await?;
    Ok(Json(tasks.into_iter().map(TaskView::from).collect()))
}

pub async fn user_xp(
    State(state): State<AppState>,
    query: Result<Query<TaskQuery>, QueryRejection>,
) -> ApiResult<Json<XpResponse>> {
    let Query(query) = query?;
    let user = lookup_user(&state.store, required("address", query.address.as_deref())?).await?;
    let chain = required("chain", query.chain.as_deref())?;
    state.chains.get(chain)?;

    let xp = state.store.get_xp(&user.id, chain).await?;
    let campaigns = state.store.list_campaigns(&user.id, chain).await?;
    Ok(Json(XpResponse {
        chain: chain.to_string(),
        xp: xp.xp,
        level: xp.level,
        campaigns,
    }))
}
