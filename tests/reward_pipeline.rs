//! Poller → pending rewards → admin decisions, with scripted chain activity.

mod common;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use cointwo_wallet::blockchain::{
    ActivitySource, BlockchainError, BlockchainResult, SwapFill, TokenTransfer,
};
use cointwo_wallet::rewards::{Detector, RewardPoller};
use common::{spawn_app, TestApp, CHAIN, USDT, WETH};

/// Activity keyed by owner, identical on every chain.
#[derive(Default)]
struct ScriptedChain {
    balances: Mutex<HashMap<Address, U256>>,
    swaps: Mutex<HashMap<Address, Vec<SwapFill>>>,
    unreachable: Mutex<Vec<Address>>,
}

impl ScriptedChain {
    fn fund(&self, owner: Address, wei: U256) {
        self.balances.lock().unwrap().insert(owner, wei);
    }

    fn swap(&self, owner: Address, weth_in: U256, usdt_out: U256) {
        let fill = SwapFill {
            pair: Address::repeat_byte(0x77),
            token_in: WETH.parse().unwrap(),
            amount_in: weth_in,
            token_out: USDT.parse().unwrap(),
            amount_out: usdt_out,
            block_number: Some(1),
            tx_hash: None,
        };
        self.swaps.lock().unwrap().entry(owner).or_default().push(fill);
    }

    fn check(&self, owner: Address) -> BlockchainResult<()> {
        if self.unreachable.lock().unwrap().contains(&owner) {
            return Err(BlockchainError::Rpc("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ActivitySource for ScriptedChain {
    async fn native_balance(&self, _chain: &str, owner: Address) -> BlockchainResult<U256> {
        self.check(owner)?;
        Ok(self
            .balances
            .lock()
            .unwrap()
            .get(&owner)
            .copied()
            .unwrap_or(U256::ZERO))
    }

    async fn incoming_transfers(
        &self,
        _chain: &str,
        owner: Address,
        _lookback: u64,
    ) -> BlockchainResult<Vec<TokenTransfer>> {
        self.check(owner)?;
        Ok(Vec::new())
    }

    async fn swap_fills(
        &self,
        _chain: &str,
        owner: Address,
        _lookback: u64,
    ) -> BlockchainResult<Vec<SwapFill>> {
        self.check(owner)?;
        Ok(self.swaps.lock().unwrap().get(&owner).cloned().unwrap_or_default())
    }
}

fn poller(app: &TestApp, chain: Arc<ScriptedChain>) -> RewardPoller {
    let detector = Detector::new(&app.config, chain, app.prices.clone());
    RewardPoller::new(&app.config, app.store.clone(), detector)
}

fn ether(milli: u64) -> U256 {
    U256::from(milli) * U256::from(10u64).pow(U256::from(15))
}

#[tokio::test]
async fn test_deposit_swap_and_referral_flow() {
    let app = spawn_app().await;
    let inviter = app
        .client
        .create_wallet("inviter@example.com", "hunter22", None)
        .await
        .unwrap();
    let invitee = app
        .client
        .create_wallet("invitee@example.com", "hunter22", Some(&inviter.referral_code))
        .await
        .unwrap();
    let invitee_address: Address = invitee.address.parse().unwrap();

    let chain = Arc::new(ScriptedChain::default());
    // 0.01 ETH at $3000 clears the $15 deposit bar; the swap is worth $30.
    chain.fund(invitee_address, ether(10));
    chain.swap(invitee_address, ether(10), U256::from(30_000_000u64));
    let poller = poller(&app, chain.clone());

    let report = poller.poll_once().await;
    assert_eq!(report.users_scanned, 2);
    assert_eq!(report.deposits, 1);
    assert_eq!(report.swaps, 1);
    assert_eq!(report.invites, 1);
    assert_eq!(report.errors, 0);

    // Nothing new on the next cycle.
    let again = poller.poll_once().await;
    assert_eq!(again.achievements(), 0);

    let tasks = app.client.task_status(&invitee.address, Some(CHAIN)).await.unwrap();
    let status: Vec<&str> = tasks.iter().map(|t| t.status.as_str()).collect();
    assert_eq!(status, vec!["eligible", "eligible", "pending"]);

    let rewards = &app.config.rewards;
    let xp = app.client.user_xp(&invitee.address, CHAIN).await.unwrap();
    assert_eq!(xp.xp, rewards.xp_deposit + rewards.xp_swap);

    let progress = app
        .client
        .referral_progress(&inviter.address, CHAIN)
        .await
        .unwrap();
    assert_eq!(progress.qualified, 1);
    assert_eq!(progress.referrals[0].status, "qualified");
    assert_eq!(progress.referrals[0].qualified_chain.as_deref(), Some(CHAIN));

    let pending = app.admin.pending_rewards().await.unwrap();
    assert_eq!(pending.len(), 3);
    let mut kinds: Vec<&str> = pending.iter().map(|r| r.kind.as_str()).collect();
    kinds.sort();
    assert_eq!(kinds, vec!["deposit", "invite", "swap"]);
    let invite = pending.iter().find(|r| r.kind == "invite").unwrap();
    assert_eq!(invite.user_id, inviter.user_id);
    assert_eq!(invite.email.as_deref(), Some("inviter@example.com"));

    app.stop().await;
}

#[tokio::test]
async fn test_admin_decisions() {
    let app = spawn_app().await;
    let user = app
        .client
        .create_wallet("trader@example.com", "hunter22", None)
        .await
        .unwrap();
    let address: Address = user.address.parse().unwrap();

    let chain = Arc::new(ScriptedChain::default());
    chain.fund(address, ether(10));
    chain.swap(address, ether(10), U256::from(30_000_000u64));
    poller(&app, chain).poll_once().await;

    let pending = app.admin.pending_rewards().await.unwrap();
    let deposit = pending.iter().find(|r| r.kind == "deposit").unwrap();
    let swap = pending.iter().find(|r| r.kind == "swap").unwrap();

    let approved = app.admin.approve_reward(deposit.id).await.unwrap();
    assert_eq!(approved.status, "approved");
    // No treasury configured, so nothing is sent.
    assert!(approved.tx_hash.is_none());
    assert!(approved.decided_at.is_some());

    let rejected = app.admin.reject_reward(swap.id).await.unwrap();
    assert_eq!(rejected.status, "rejected");

    let err = app.admin.approve_reward(swap.id).await.unwrap_err();
    assert_eq!(err.status(), Some(409));
    let err = app.admin.reject_reward(deposit.id).await.unwrap_err();
    assert_eq!(err.status(), Some(409));

    let tasks = app.client.task_status(&user.address, Some(CHAIN)).await.unwrap();
    assert_eq!(tasks[0].status, "completed");
    assert!(tasks[0].reward_sent);
    assert_eq!(tasks[1].status, "rejected");
    assert!(!tasks[1].reward_sent);

    assert!(app.admin.pending_rewards().await.unwrap().is_empty());

    app.stop().await;
}

#[tokio::test]
async fn test_small_activity_and_unreachable_users() {
    let app = spawn_app().await;
    let small = app
        .client
        .create_wallet("small@example.com", "hunter22", None)
        .await
        .unwrap();
    let offline = app
        .client
        .create_wallet("offline@example.com", "hunter22", None)
        .await
        .unwrap();

    let chain = Arc::new(ScriptedChain::default());
    let small_address: Address = small.address.parse().unwrap();
    // $3 of ETH and a $6 swap: both under the bar.
    chain.fund(small_address, ether(1));
    chain.swap(small_address, ether(2), U256::from(6_000_000u64));
    chain
        .unreachable
        .lock()
        .unwrap()
        .push(offline.address.parse().unwrap());

    let report = poller(&app, chain).poll_once().await;
    assert_eq!(report.users_scanned, 2);
    assert_eq!(report.achievements(), 0);
    assert_eq!(report.errors, 1);

    assert!(app.admin.pending_rewards().await.unwrap().is_empty());
    app.stop().await;
}
