//! XP and level rules.

use crate::config::schema::RewardsConfig;
use crate::store::{Action, AchievementRules};

/// `max(1, floor(sqrt(xp / level_unit)))`.
pub fn level_for(xp: i64, level_unit: i64) -> i64 {
    if xp <= 0 || level_unit <= 0 {
        return 1;
    }
    let level = (xp as f64 / level_unit as f64).sqrt().floor() as i64;
    level.max(1)
}

pub fn xp_for(config: &RewardsConfig, action: Action) -> i64 {
    match action {
        Action::Deposit => config.xp_deposit,
        Action::Swap => config.xp_swap,
        Action::Invite => config.xp_invite,
    }
}

/// What an achievement of `action` grants under `config`.
pub fn rules_for(config: &RewardsConfig, action: Action) -> AchievementRules {
    AchievementRules {
        reward_usd: config.reward_usd,
        xp: xp_for(config, action),
        campaign_goal: config.campaign_goal,
        level_unit: config.level_unit,
    }
}
