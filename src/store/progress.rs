//! The achievement transaction, XP and campaign reads.

use serde::Serialize;
use sqlx::SqliteConnection;

use crate::rewards::progress::level_for;
use crate::store::models::{Action, CampaignProgress, UserXp};
use crate::store::{now_secs, tasks, Store, StoreResult};

/// What one achievement grants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AchievementRules {
    pub reward_usd: f64,
    pub xp: i64,
    pub campaign_goal: i64,
    pub level_unit: i64,
}

/// Side effects of a task turning eligible.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    pub user_id: String,
    pub chain: String,
    pub action: Action,
    pub task_id: i64,
    pub reward_id: i64,
    /// XP total after the grant.
    pub xp: i64,
    pub level: i64,
    pub campaign: CampaignProgress,
}

/// Move the task `pending → eligible` and, only if that happened, grant the
/// reward, XP and campaign step. Returns `None` when the task was not
/// pending (already achieved, completed or rejected).
pub(crate) async fn achieve_in(
    conn: &mut SqliteConnection,
    user_id: &str,
    chain: &str,
    action: Action,
    rules: &AchievementRules,
) -> Result<Option<Achievement>, sqlx::Error> {
    let now = now_secs();
    tasks::insert_tasks(&mut *conn, user_id, &[chain.to_string()]).await?;

    let moved = sqlx::query(
        "UPDATE tasks SET status = 'eligible', updated_at = ?
         WHERE user_id = ? AND chain = ? AND kind = ? AND status = 'pending'",
    )
    .bind(now)
    .bind(user_id)
    .bind(chain)
    .bind(action)
    .execute(&mut *conn)
    .await?;
    if moved.rows_affected() == 0 {
        return Ok(None);
    }

    let task_id: i64 =
        sqlx::query_scalar("SELECT id FROM tasks WHERE user_id = ? AND chain = ? AND kind = ?")
            .bind(user_id)
            .bind(chain)
            .bind(action)
            .fetch_one(&mut *conn)
            .await?;

    let reward_id = sqlx::query(
        "INSERT INTO rewards (user_id, task_id, chain, kind, amount_usd, status, created_at)
         VALUES (?, ?, ?, ?, ?, 'pending', ?)",
    )
    .bind(user_id)
    .bind(task_id)
    .bind(chain)
    .bind(action)
    .bind(rules.reward_usd)
    .bind(now)
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    // XP
    sqlx::query(
        "INSERT OR IGNORE INTO user_xp (user_id, chain, xp, level, updated_at)
         VALUES (?, ?, 0, 1, ?)",
    )
    .bind(user_id)
    .bind(chain)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    let xp: i64 = sqlx::query_scalar(
        "UPDATE user_xp SET xp = xp + ?, updated_at = ?
         WHERE user_id = ? AND chain = ? RETURNING xp",
    )
    .bind(rules.xp)
    .bind(now)
    .bind(user_id)
    .bind(chain)
    .fetch_one(&mut *conn)
    .await?;

    let level = level_for(xp, rules.level_unit);
    sqlx::query("UPDATE user_xp SET level = ? WHERE user_id = ? AND chain = ?")
        .bind(level)
        .bind(user_id)
        .bind(chain)
        .execute(&mut *conn)
        .await?;

    // Campaign
    sqlx::query(
        "INSERT OR IGNORE INTO campaign_progress
            (user_id, chain, campaign_id, progress, goal, status, updated_at)
         VALUES (?, ?, ?, 0, ?, 'in_progress', ?)",
    )
    .bind(user_id)
    .bind(chain)
    .bind(action.as_str())
    .bind(rules.campaign_goal)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    // Right-hand sides see the pre-update row
    let campaign = sqlx::query_as::<_, CampaignProgress>(
        "UPDATE campaign_progress
         SET progress = MIN(progress + 1, ?1),
             goal = ?1,
             status = CASE WHEN progress + 1 >= ?1 THEN 'completed' ELSE 'in_progress' END,
             updated_at = ?2
         WHERE user_id = ?3 AND chain = ?4 AND campaign_id = ?5
         RETURNING user_id, chain, campaign_id, progress, goal, status, updated_at",
    )
    .bind(rules.campaign_goal)
    .bind(now)
    .bind(user_id)
    .bind(chain)
    .bind(action.as_str())
    .fetch_one(&mut *conn)
    .await?;

    Ok(Some(Achievement {
        user_id: user_id.to_string(),
        chain: chain.to_string(),
        action,
        task_id,
        reward_id,
        xp,
        level,
        campaign,
    }))
}

impl Store {
    /// Record an achievement atomically. Idempotent: repeated calls for an
    /// already-eligible task return `None` and change nothing.
    pub async fn record_achievement(
        &self,
        user_id: &str,
        chain: &str,
        action: Action,
        rules: &AchievementRules,
    ) -> StoreResult<Option<Achievement>> {
        let mut tx = self.pool().begin().await?;
        let achievement = achieve_in(&mut *tx, user_id, chain, action, rules).await?;
        tx.commit().await?;
        Ok(achievement)
    }

    /// XP on a chain; users without XP read as xp 0, level 1.
    pub async fn get_xp(&self, user_id: &str, chain: &str) -> StoreResult<UserXp> {
        let row = sqlx::query_as::<_, UserXp>(
            "SELECT user_id, chain, xp, level, updated_at FROM user_xp
             WHERE user_id = ? AND chain = ?",
        )
        .bind(user_id)
        .bind(chain)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.unwrap_or_else(|| UserXp {
            user_id: user_id.to_string(),
            chain: chain.to_string(),
            xp: 0,
            level: 1,
            updated_at: 0,
        }))
    }

    pub async fn list_campaigns(
        &self,
        user_id: &str,
        chain: &str,
    ) -> StoreResult<Vec<CampaignProgress>> {
        Ok(sqlx::query_as::<_, CampaignProgress>(
            "SELECT user_id, chain, campaign_id, progress, goal, status, updated_at
             FROM campaign_progress WHERE user_id = ? AND chain = ? ORDER BY campaign_id",
        )
        .bind(user_id)
        .bind(chain)
        .fetch_all(self.pool())
        .await?)
    }
}
