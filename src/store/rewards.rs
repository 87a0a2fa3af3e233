//! Reward review: pending list and admin decisions.

use crate::store::models::{Reward, RewardStatus};
use crate::store::{now_secs, Store, StoreError, StoreResult};

const REWARD_COLUMNS: &str =
    "id, user_id, task_id, chain, kind, amount_usd, status, tx_hash, created_at, decided_at";

impl Store {
    /// Rewards awaiting a decision, oldest first.
    pub async fn pending_rewards(&self) -> StoreResult<Vec<Reward>> {
        let sql = format!(
            "SELECT {} FROM rewards WHERE status = 'pending' ORDER BY created_at, id",
            REWARD_COLUMNS
        );
        Ok(sqlx::query_as::<_, Reward>(&sql).fetch_all(self.pool()).await?)
    }

    pub async fn find_reward(&self, id: i64) -> StoreResult<Option<Reward>> {
        let sql = format!("SELECT {} FROM rewards WHERE id = ?", REWARD_COLUMNS);
        Ok(sqlx::query_as::<_, Reward>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await?)
    }

    pub async fn rewards_of(&self, user_id: &str) -> StoreResult<Vec<Reward>> {
        let sql = format!(
            "SELECT {} FROM rewards WHERE user_id = ? ORDER BY created_at, id",
            REWARD_COLUMNS
        );
        Ok(sqlx::query_as::<_, Reward>(&sql)
            .bind(user_id)
            .fetch_all(self.pool())
            .await?)
    }

    /// Approve or reject a pending reward and move its task along:
    /// approved → task `completed` with `reward_sent`, rejected → task
    /// `rejected`.
    ///
    /// Errors with `NotFound` for unknown ids and `Conflict` when the reward
    /// is not pending.
    pub async fn decide_reward(
        &self,
        id: i64,
        decision: RewardStatus,
        tx_hash: Option<&str>,
    ) -> StoreResult<Reward> {
        if !matches!(decision, RewardStatus::Approved | RewardStatus::Rejected) {
            return Err(StoreError::Conflict("a decision must approve or reject".into()));
        }
        self.settle(id, RewardStatus::Pending, decision, tx_hash).await
    }

    /// Move a pending reward to `paying`. Exactly one caller wins; everyone
    /// else gets `Conflict`.
    pub async fn claim_payout(&self, id: i64) -> StoreResult<Reward> {
        let sql = format!(
            "UPDATE rewards SET status = 'paying'
             WHERE id = ? AND status = 'pending'
             RETURNING {}",
            REWARD_COLUMNS
        );
        let claimed = sqlx::query_as::<_, Reward>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        match claimed {
            Some(reward) => Ok(reward),
            None => Err(self.not_pending(id).await?),
        }
    }

    /// Return a `paying` reward to `pending` after a failed transfer.
    pub async fn release_payout(&self, id: i64) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE rewards SET status = 'pending' WHERE id = ? AND status = 'paying'",
        )
        .bind(id)
        .execute(self.pool())
        .await?;
        if result.rows_affected() == 0 {
            return Err(self.not_pending(id).await?);
        }
        tracing::info!(reward_id = id, "Payout released");
        Ok(())
    }

    /// Record a sent payout: `paying` → `approved` with its tx hash.
    pub async fn complete_payout(&self, id: i64, tx_hash: &str) -> StoreResult<Reward> {
        self.settle(id, RewardStatus::Paying, RewardStatus::Approved, Some(tx_hash))
            .await
    }

    async fn settle(
        &self,
        id: i64,
        from: RewardStatus,
        decision: RewardStatus,
        tx_hash: Option<&str>,
    ) -> StoreResult<Reward> {
        let mut tx = self.pool().begin().await?;
        let now = now_secs();

        let sql = format!(
            "UPDATE rewards SET status = ?, tx_hash = ?, decided_at = ?
             WHERE id = ? AND status = ?
             RETURNING {}",
            REWARD_COLUMNS
        );
        let reward = sqlx::query_as::<_, Reward>(&sql)
            .bind(decision)
            .bind(tx_hash)
            .bind(now)
            .bind(id)
            .bind(from)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(reward) = reward else {
            drop(tx);
            return Err(self.not_pending(id).await?);
        };

        let task_update = match decision {
            RewardStatus::Approved => {
                "UPDATE tasks SET status = 'completed', reward_sent = 1, updated_at = ? WHERE id = ?"
            }
            _ => "UPDATE tasks SET status = 'rejected', updated_at = ? WHERE id = ?",
        };
        sqlx::query(task_update)
            .bind(now)
            .bind(reward.task_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!(
            reward_id = id,
            user_id = %reward.user_id,
            decision = ?decision,
            "Reward decided"
        );
        Ok(reward)
    }

    /// Why a transition on reward `id` matched no row.
    async fn not_pending(&self, id: i64) -> StoreResult<StoreError> {
        Ok(match self.find_reward(id).await? {
            Some(existing) => StoreError::Conflict(format!(
                "reward {} is already {:?}",
                id, existing.status
            )),
            None => StoreError::NotFound(format!("reward {}", id)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::models::{Action, TaskStatus};
    use crate::store::progress::AchievementRules;
    use crate::store::test_support::store_with_users;

    const RULES: AchievementRules = AchievementRules {
        reward_usd: 3.0,
        xp: 5,
        campaign_goal: 1,
        level_unit: 20,
    };

    #[tokio::test]
    async fn test_approve_completes_task() {
        let (store, users) = store_with_users(&["a@x.io"], &["ethereum"]).await;
        let id = &users[0].id;
        let achievement = store
            .record_achievement(id, "ethereum", Action::Deposit, &RULES)
            .await
            .unwrap()
            .unwrap();

        let reward = store
            .decide_reward(achievement.reward_id, RewardStatus::Approved, Some("0xabc"))
            .await
            .unwrap();
        assert_eq!(reward.status, RewardStatus::Approved);
        assert_eq!(reward.tx_hash.as_deref(), Some("0xabc"));
        assert!(reward.decided_at.is_some());

        let task = store.find_task(id, "ethereum", Action::Deposit).await.unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert!(task.reward_sent);
        assert!(store.pending_rewards().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reject_is_terminal() {
        let (store, users) = store_with_users(&["a@x.io"], &["ethereum"]).await;
        let id = &users[0].id;
        let achievement = store
            .record_achievement(id, "ethereum", Action::Swap, &RULES)
            .await
            .unwrap()
            .unwrap();

        store
            .decide_reward(achievement.reward_id, RewardStatus::Rejected, None)
            .await
            .unwrap();
        assert_eq!(
            store.task_status(id, "ethereum", Action::Swap).await.unwrap(),
            TaskStatus::Rejected
        );

        // A rejected task never becomes eligible again
        assert!(store
            .record_achievement(id, "ethereum", Action::Swap, &RULES)
            .await
            .unwrap()
            .is_none());

        let err = store
            .decide_reward(achievement.reward_id, RewardStatus::Approved, None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.rewards_of(id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_reward() {
        let store = Store::in_memory().await.unwrap();
        let err = store
            .decide_reward(42, RewardStatus::Approved, None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_payout_claim_is_exclusive() {
        let (store, users) = store_with_users(&["a@x.io"], &["ethereum"]).await;
        let id = &users[0].id;
        let reward_id = store
            .record_achievement(id, "ethereum", Action::Deposit, &RULES)
            .await
            .unwrap()
            .unwrap()
            .reward_id;

        let claimed = store.claim_payout(reward_id).await.unwrap();
        assert_eq!(claimed.status, RewardStatus::Paying);
        assert!(matches!(
            store.claim_payout(reward_id).await.unwrap_err(),
            StoreError::Conflict(_)
        ));
        // In-flight payouts are neither listed nor decidable.
        assert!(store.pending_rewards().await.unwrap().is_empty());
        assert!(matches!(
            store
                .decide_reward(reward_id, RewardStatus::Rejected, None)
                .await
                .unwrap_err(),
            StoreError::Conflict(_)
        ));

        store.release_payout(reward_id).await.unwrap();
        assert_eq!(store.pending_rewards().await.unwrap().len(), 1);

        store.claim_payout(reward_id).await.unwrap();
        let paid = store.complete_payout(reward_id, "0xfeed").await.unwrap();
        assert_eq!(paid.status, RewardStatus::Approved);
        assert_eq!(paid.tx_hash.as_deref(), Some("0xfeed"));
        let task = store.find_task(id, "ethereum", Action::Deposit).await.unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Completed);

        assert!(matches!(
            store.release_payout(reward_id).await.unwrap_err(),
            StoreError::Conflict(_)
        ));
        assert!(matches!(
            store.claim_payout(999).await.unwrap_err(),
            StoreError::NotFound(_)
        ));
    }
}
