//! Referral relationships and their qualification.

use crate::store::models::{Action, Referral};
use crate::store::progress::{achieve_in, Achievement, AchievementRules};
use crate::store::{now_secs, Store, StoreResult};

const REFERRAL_COLUMNS: &str =
    "id, inviter_id, invitee_id, status, qualified_chain, created_at, qualified_at";

impl Store {
    /// Referrals made by `inviter_id`, oldest first.
    pub async fn referrals_of(&self, inviter_id: &str) -> StoreResult<Vec<Referral>> {
        let sql = format!(
            "SELECT {} FROM referrals WHERE inviter_id = ? ORDER BY created_at, id",
            REFERRAL_COLUMNS
        );
        Ok(sqlx::query_as::<_, Referral>(&sql)
            .bind(inviter_id)
            .fetch_all(self.pool())
            .await?)
    }

    /// The referral that brought `invitee_id` in, if any.
    pub async fn referral_of_invitee(&self, invitee_id: &str) -> StoreResult<Option<Referral>> {
        let sql = format!("SELECT {} FROM referrals WHERE invitee_id = ?", REFERRAL_COLUMNS);
        Ok(sqlx::query_as::<_, Referral>(&sql)
            .bind(invitee_id)
            .fetch_optional(self.pool())
            .await?)
    }

    /// Mark the invitee's pending referral qualified on `chain` and record
    /// the inviter's invite achievement there, in one transaction.
    ///
    /// Returns `None` when there is no pending referral. The achievement is
    /// `None` when the inviter's invite task on `chain` was already past
    /// pending.
    pub async fn qualify_referral(
        &self,
        invitee_id: &str,
        chain: &str,
        rules: &AchievementRules,
    ) -> StoreResult<Option<(Referral, Option<Achievement>)>> {
        let mut tx = self.pool().begin().await?;

        let sql = format!(
            "UPDATE referrals SET status = 'qualified', qualified_chain = ?, qualified_at = ?
             WHERE invitee_id = ? AND status = 'pending'
             RETURNING {}",
            REFERRAL_COLUMNS
        );
        let referral = sqlx::query_as::<_, Referral>(&sql)
            .bind(chain)
            .bind(now_secs())
            .bind(invitee_id)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(referral) = referral else {
            return Ok(None);
        };

        let achievement =
            achieve_in(&mut *tx, &referral.inviter_id, chain, Action::Invite, rules).await?;
        tx.commit().await?;

        tracing::info!(
            inviter = %referral.inviter_id,
            invitee = %invitee_id,
            chain = %chain,
            rewarded = achievement.is_some(),
            "Referral qualified"
        );
        Ok(Some((referral, achievement)))
    }
}
