//! Row types and status enums.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Rewardable on-chain action. Each maps to one numbered task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Deposit,
    Swap,
    Invite,
}

impl Action {
    pub const ALL: [Action; 3] = [Action::Deposit, Action::Swap, Action::Invite];

    pub fn task_number(self) -> i64 {
        match self {
            Action::Deposit => 1,
            Action::Swap => 2,
            Action::Invite => 3,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Action::Deposit => "Deposit $15+",
            Action::Swap => "Swap $20+",
            Action::Invite => "Invite Friend",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Deposit => "deposit",
            Action::Swap => "swap",
            Action::Invite => "invite",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deposit" => Ok(Action::Deposit),
            "swap" => Ok(Action::Swap),
            "invite" => Ok(Action::Invite),
            other => Err(format!("unknown action '{}'", other)),
        }
    }
}

/// `pending → eligible → completed`, or `eligible → rejected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Eligible,
    Completed,
    Rejected,
}

impl TaskStatus {
    /// Counts towards a referral qualifying.
    pub fn is_achieved(self) -> bool {
        matches!(self, TaskStatus::Eligible | TaskStatus::Completed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RewardStatus {
    Pending,
    /// Claimed by an approval whose treasury transfer is in flight.
    Paying,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReferralStatus {
    Pending,
    Qualified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    InProgress,
    Completed,
}

/// A registered user. The password hash never leaves the server.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub wallet_address: String,
    #[serde(skip)]
    pub keystore_id: String,
    pub referral_code: String,
    pub referred_by: Option<String>,
    pub created_at: i64,
}

/// Input for [`crate::store::Store::create_user`].
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub wallet_address: String,
    /// Name of the user's encrypted key in the vault.
    pub keystore_id: String,
    /// Inviter's user id.
    pub referred_by: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: i64,
    pub user_id: String,
    pub chain: String,
    pub task_number: i64,
    pub kind: Action,
    pub status: TaskStatus,
    pub reward_sent: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserXp {
    pub user_id: String,
    pub chain: String,
    pub xp: i64,
    pub level: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CampaignProgress {
    pub user_id: String,
    pub chain: String,
    pub campaign_id: String,
    pub progress: i64,
    pub goal: i64,
    pub status: CampaignStatus,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Referral {
    pub id: i64,
    pub inviter_id: String,
    pub invitee_id: String,
    pub status: ReferralStatus,
    pub qualified_chain: Option<String>,
    pub created_at: i64,
    pub qualified_at: Option<i64>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Reward {
    pub id: i64,
    pub user_id: String,
    pub task_id: i64,
    pub chain: String,
    pub kind: Action,
    pub amount_usd: f64,
    pub status: RewardStatus,
    pub tx_hash: Option<String>,
    pub created_at: i64,
    pub decided_at: Option<i64>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserToken {
    pub user_id: String,
    pub chain: String,
    pub address: String,
    pub symbol: String,
    pub name: String,
    pub decimals: i64,
    pub created_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_numbers_and_names() {
        assert_eq!(Action::Deposit.task_number(), 1);
        assert_eq!(Action::Swap.task_number(), 2);
        assert_eq!(Action::Invite.task_number(), 3);
        assert_eq!("swap".parse::<Action>().unwrap(), Action::Swap);
        assert!("stake".parse::<Action>().is_err());
        assert_eq!(Action::Invite.to_string(), "invite");
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(serde_json::to_string(&TaskStatus::Eligible).unwrap(), "\"eligible\"");
        assert_eq!(
            serde_json::to_string(&CampaignStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
        assert!(TaskStatus::Completed.is_achieved());
        assert!(!TaskStatus::Rejected.is_achieved());
    }
}
