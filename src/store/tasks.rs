//! Per-user, per-chain tasks.

use sqlx::SqliteConnection;

use crate::store::models::{Action, Task, TaskStatus};
use crate::store::{now_secs, Store, StoreResult};

const TASK_COLUMNS: &str =
    "id, user_id, chain, task_number, kind, status, reward_sent, created_at, updated_at";

/// Insert the pending task rows a user is missing on `chains`.
pub(crate) async fn insert_tasks(
    conn: &mut SqliteConnection,
    user_id: &str,
    chains: &[String],
) -> Result<(), sqlx::Error> {
    let now = now_secs();
    for chain in chains {
        for action in Action::ALL {
            sqlx::query(
                "INSERT OR IGNORE INTO tasks
                    (user_id, chain, task_number, kind, status, reward_sent, created_at, updated_at)
                 VALUES (?, ?, ?, ?, 'pending', 0, ?, ?)",
            )
            .bind(user_id)
            .bind(chain)
            .bind(action.task_number())
            .bind(action)
            .bind(now)
            .bind(now)
            .execute(&mut *conn)
            .await?;
        }
    }
    Ok(())
}

impl Store {
    /// Make sure the user has every task on `chains`. Idempotent.
    pub async fn seed_tasks(&self, user_id: &str, chains: &[String]) -> StoreResult<()> {
        let mut conn = self.pool().acquire().await?;
        insert_tasks(&mut *conn, user_id, chains).await?;
        Ok(())
    }

    /// Tasks ordered by chain then task number.
    pub async fn list_tasks(&self, user_id: &str, chain: Option<&str>) -> StoreResult<Vec<Task>> {
        let tasks = match chain {
            Some(chain) => {
                let sql = format!(
                    "SELECT {} FROM tasks WHERE user_id = ? AND chain = ? ORDER BY task_number",
                    TASK_COLUMNS
                );
                sqlx::query_as::<_, Task>(&sql)
                    .bind(user_id)
                    .bind(chain)
                    .fetch_all(self.pool())
                    .await?
            }
            None => {
                let sql = format!(
                    "SELECT {} FROM tasks WHERE user_id = ? ORDER BY chain, task_number",
                    TASK_COLUMNS
                );
                sqlx::query_as::<_, Task>(&sql)
                    .bind(user_id)
                    .fetch_all(self.pool())
                    .await?
            }
        };
        Ok(tasks)
    }

    pub async fn find_task(
        &self,
        user_id: &str,
        chain: &str,
        action: Action,
    ) -> StoreResult<Option<Task>> {
        let sql = format!(
            "SELECT {} FROM tasks WHERE user_id = ? AND chain = ? AND kind = ?",
            TASK_COLUMNS
        );
        Ok(sqlx::query_as::<_, Task>(&sql)
            .bind(user_id)
            .bind(chain)
            .bind(action)
            .fetch_optional(self.pool())
            .await?)
    }

    /// Status of one task; a missing row reads as pending.
    pub async fn task_status(
        &self,
        user_id: &str,
        chain: &str,
        action: Action,
    ) -> StoreResult<TaskStatus> {
        Ok(self
            .find_task(user_id, chain, action)
            .await?
            .map(|t| t.status)
            .unwrap_or(TaskStatus::Pending))
    }
}
