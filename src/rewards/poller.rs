//! The periodic reward poller.

use alloy::primitives::Address;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::time;

use crate::config::schema::{AppConfig, PollerConfig, RewardsConfig};
use crate::observability::metrics;
use crate::rewards::detector::Detector;
use crate::rewards::progress::rules_for;
use crate::rewards::{RewardError, RewardResult};
use crate::store::{Action, ReferralStatus, Store, TaskStatus, User};

/// Outcome of one poll cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollReport {
    pub users_scanned: usize,
    pub deposits: usize,
    pub swaps: usize,
    pub invites: usize,
    /// (user, chain) checks that failed.
    pub errors: usize,
}

impl PollReport {
    pub fn achievements(&self) -> usize {
        self.deposits + self.swaps + self.invites
    }
}

/// Walks every user on every rewards-enabled chain and records what they
/// achieved.
pub struct RewardPoller {
    store: Store,
    detector: Detector,
    config: PollerConfig,
    rewards: RewardsConfig,
    chains: Vec<String>,
}

impl RewardPoller {
    pub fn new(config: &AppConfig, store: Store, detector: Detector) -> Self {
        Self {
            store,
            detector,
            config: config.poller.clone(),
            rewards: config.rewards.clone(),
            chains: config.reward_chains(),
        }
    }

    /// Poll immediately, then every `interval_secs`, until shutdown.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled {
            tracing::info!("Reward poller disabled");
            return;
        }

        tracing::info!(
            interval = self.config.interval_secs,
            chains = ?self.chains,
            "Reward poller starting"
        );

        let mut ticker = time::interval(Duration::from_secs(self.config.interval_secs));
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.poll_once().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Reward poller received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Run one full cycle over all users.
    pub async fn poll_once(&self) -> PollReport {
        let start = Instant::now();
        let mut report = PollReport::default();

        let users = match self.store.list_users().await {
            Ok(users) => users,
            Err(e) => {
                tracing::error!(error = %e, "Poll cycle could not list users");
                report.errors += 1;
                return report;
            }
        };

        for user in &users {
            report.users_scanned += 1;
            self.poll_user(user, &mut report).await;
        }

        metrics::record_poll_cycle(report.users_scanned, start);
        tracing::info!(
            users = report.users_scanned,
            deposits = report.deposits,
            swaps = report.swaps,
            invites = report.invites,
            errors = report.errors,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Poll cycle finished"
        );
        report
    }

    async fn poll_user(&self, user: &User, report: &mut PollReport) {
        let address = match user.wallet_address.parse::<Address>() {
            Ok(address) => address,
            Err(_) => {
                let e = RewardError::InvalidAddress(user.wallet_address.clone());
                tracing::warn!(user_id = %user.id, error = %e, "Skipping user");
                self.count_skipped(report);
                return;
            }
        };

        if let Err(e) = self.store.seed_tasks(&user.id, &self.chains).await {
            tracing::warn!(user_id = %user.id, error = %e, "Failed to seed tasks");
            self.count_skipped(report);
            return;
        }

        for chain in &self.chains {
            if let Err(e) = self.poll_user_chain(user, address, chain, report).await {
                tracing::warn!(
                    user_id = %user.id,
                    address = %address,
                    chain = %chain,
                    error = %e,
                    "Reward check failed"
                );
                metrics::record_poll_error(chain);
                report.errors += 1;
            }
        }
    }

    /// A skipped user fails its check on every chain.
    fn count_skipped(&self, report: &mut PollReport) {
        for chain in &self.chains {
            metrics::record_poll_error(chain);
            report.errors += 1;
        }
    }

    /// Deposit, then swap, then referral, on one chain.
    async fn poll_user_chain(
        &self,
        user: &User,
        address: Address,
        chain: &str,
        report: &mut PollReport,
    ) -> RewardResult<()> {
        let mut deposit = self.store.task_status(&user.id, chain, Action::Deposit).await?;
        if deposit == TaskStatus::Pending
            && self.detector.deposit_qualifies(chain, address).await?
            && self.achieve(&user.id, chain, Action::Deposit).await?
        {
            report.deposits += 1;
            deposit = TaskStatus::Eligible;
        }

        let mut swap = self.store.task_status(&user.id, chain, Action::Swap).await?;
        if swap == TaskStatus::Pending
            && self.detector.qualifying_swap(chain, address).await?.is_some()
            && self.achieve(&user.id, chain, Action::Swap).await?
        {
            report.swaps += 1;
            swap = TaskStatus::Eligible;
        }

        if user.referred_by.is_some() && deposit.is_achieved() && swap.is_achieved() {
            let pending = self
                .store
                .referral_of_invitee(&user.id)
                .await?
                .is_some_and(|r| r.status == ReferralStatus::Pending);
            if pending {
                let rules = rules_for(&self.rewards, Action::Invite);
                if let Some((_, Some(_))) =
                    self.store.qualify_referral(&user.id, chain, &rules).await?
                {
                    metrics::record_task_eligible(Action::Invite.as_str());
                    report.invites += 1;
                }
            }
        }

        Ok(())
    }

    /// Record an achievement; false when the task was no longer pending.
    async fn achieve(&self, user_id: &str, chain: &str, action: Action) -> RewardResult<bool> {
        let rules = rules_for(&self.rewards, action);
        let Some(achievement) = self
            .store
            .record_achievement(user_id, chain, action, &rules)
            .await?
        else {
            return Ok(false);
        };

        metrics::record_task_eligible(action.as_str());
        tracing::info!(
            user_id = %user_id,
            chain = %chain,
            action = %action,
            reward_id = achievement.reward_id,
            xp = achievement.xp,
            level = achievement.level,
            "Task eligible"
        );
        Ok(true)
    }
}
