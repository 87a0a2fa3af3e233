//! End-to-end tests of the wallet API over a real socket.

mod common;

use cointwo_sdk::{AddToken, Credentials, ImportWallet, SdkError, SendTx};
use common::{spawn_app, spawn_app_with, CHAIN, USDT};

const ANVIL_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
const ANVIL_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

fn status_of(err: SdkError) -> u16 {
    err.status().expect("expected an API error")
}

#[tokio::test]
async fn test_health_and_catalog() {
    let app = spawn_app().await;

    let health = app.client.health().await.unwrap();
    assert_eq!(health.status, "ok");
    assert!(health.database);

    let chains = app.client.chains().await.unwrap();
    assert_eq!(chains.len(), 1);
    assert_eq!(chains[0].key, CHAIN);
    assert_eq!(chains[0].chain_id, 31337);
    assert!(chains[0].rewards_enabled);
    assert!(chains[0].tokens.iter().any(|t| t.symbol == "USDT"));

    let prices = app.client.prices(&["eth", "usdt"]).await.unwrap();
    assert_eq!(prices.prices.get("ETH"), Some(&3000.0));
    assert_eq!(prices.prices.get("USDT"), Some(&1.0));

    app.stop().await;
}

#[tokio::test]
async fn test_create_login_and_conflicts() {
    let app = spawn_app().await;

    let created = app
        .client
        .create_wallet("alice@example.com", "hunter22", None)
        .await
        .unwrap();
    assert!(created.address.starts_with("0x"));
    assert_eq!(created.mnemonic.split_whitespace().count(), 12);
    assert!(!created.referral_code.is_empty());

    let account = app.client.login("alice@example.com", "hunter22").await.unwrap();
    assert_eq!(account.user_id, created.user_id);
    assert_eq!(account.address, created.address);

    let err = app.client.login("alice@example.com", "wrong-password").await.unwrap_err();
    assert_eq!(status_of(err), 401);

    let err = app.client.login("nobody@example.com", "hunter22").await.unwrap_err();
    assert_eq!(status_of(err), 401);

    let err = app
        .client
        .create_wallet("alice@example.com", "another1", None)
        .await
        .unwrap_err();
    assert_eq!(status_of(err), 409);

    let err = app.client.create_wallet("bob@example.com", "short", None).await.unwrap_err();
    assert_eq!(status_of(err), 400);

    let err = app
        .client
        .create_wallet("bob@example.com", "hunter22", Some("NOPE0000"))
        .await
        .unwrap_err();
    match err {
        SdkError::Api { status, detail, .. } => {
            assert_eq!(status, 400);
            assert!(detail.unwrap().contains("referral code"));
        }
        other => panic!("unexpected error: {other}"),
    }

    app.stop().await;
}

#[tokio::test]
async fn test_import_private_key() {
    let app = spawn_app().await;

    let account = app
        .client
        .import_wallet(&ImportWallet {
            email: "carol@example.com".to_string(),
            password: "hunter22".to_string(),
            private_key: Some(ANVIL_KEY.to_string()),
            ..ImportWallet::default()
        })
        .await
        .unwrap();
    assert!(account.address.eq_ignore_ascii_case(ANVIL_ADDRESS));

    let err = app
        .client
        .import_wallet(&ImportWallet {
            email: "dave@example.com".to_string(),
            password: "hunter22".to_string(),
            private_key: Some("0x1234".to_string()),
            ..ImportWallet::default()
        })
        .await
        .unwrap_err();
    assert_eq!(status_of(err), 400);

    app.stop().await;
}

#[tokio::test]
async fn test_failed_keystore_write_leaves_no_account() {
    let app = spawn_app().await;
    std::fs::remove_dir_all(app.keystores.path()).unwrap();

    let err = app
        .client
        .create_wallet("erin@example.com", "hunter22", None)
        .await
        .unwrap_err();
    assert_eq!(status_of(err), 500);
    assert!(app.store.find_user_by_email("erin@example.com").await.unwrap().is_none());

    std::fs::create_dir_all(app.keystores.path()).unwrap();
    let created = app
        .client
        .create_wallet("erin@example.com", "hunter22", None)
        .await
        .unwrap();
    let account = app.client.login("erin@example.com", "hunter22").await.unwrap();
    assert_eq!(account.user_id, created.user_id);

    app.stop().await;
}

#[tokio::test]
async fn test_rejected_signup_removes_its_keystore() {
    let app = spawn_app().await;
    let import = |email: &str| ImportWallet {
        email: email.to_string(),
        password: "hunter22".to_string(),
        private_key: Some(ANVIL_KEY.to_string()),
        ..ImportWallet::default()
    };

    app.client.import_wallet(&import("frank@example.com")).await.unwrap();
    // Same key under another email: the address is already taken.
    let err = app
        .client
        .import_wallet(&import("grace@example.com"))
        .await
        .unwrap_err();
    assert_eq!(status_of(err), 409);

    let keystores = std::fs::read_dir(app.keystores.path()).unwrap().count();
    assert_eq!(keystores, 1);

    app.stop().await;
}

#[tokio::test]
async fn test_tasks_xp_and_referrals() {
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

    let tasks = app.client.task_status(&invitee.address, None).await.unwrap();
    assert_eq!(tasks.len(), 3);
    assert_eq!(
        tasks.iter().map(|t| t.task_number).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert!(tasks.iter().all(|t| t.status == "pending" && !t.reward_sent));
    assert!(tasks.iter().all(|t| t.chain == CHAIN));

    let by_email = app
        .client
        .task_status("invitee@example.com", Some(CHAIN))
        .await
        .unwrap();
    assert_eq!(by_email.len(), 3);

    let xp = app.client.user_xp(&invitee.address, CHAIN).await.unwrap();
    assert_eq!(xp.xp, 0);
    assert_eq!(xp.level, 1);

    let progress = app
        .client
        .referral_progress(&inviter.address, CHAIN)
        .await
        .unwrap();
    assert_eq!(progress.referral_code, inviter.referral_code);
    assert_eq!(progress.qualified, 0);
    assert_eq!(progress.referrals.len(), 1);
    let referral = &progress.referrals[0];
    assert!(referral.invitee_address.eq_ignore_ascii_case(&invitee.address));
    assert_eq!(referral.status, "pending");
    assert!(!referral.deposit_done && !referral.swap_done);

    let err = app.client.task_status("0xdeadbeef", None).await.unwrap_err();
    assert_eq!(status_of(err), 404);

    let err = app.client.user_xp(&invitee.address, "nowhere").await.unwrap_err();
    assert_eq!(status_of(err), 400);

    app.stop().await;
}

#[tokio::test]
async fn test_custom_tokens() {
    let app = spawn_app().await;
    let user = app
        .client
        .create_wallet("tokens@example.com", "hunter22", None)
        .await
        .unwrap();

    let token = "0x00000000000000000000000000000000000000b7";
    let saved = app
        .client
        .add_token(&AddToken {
            address: token.to_string(),
            chain: CHAIN.to_string(),
            user: user.user_id.clone(),
            symbol: Some("PEPE".to_string()),
            name: Some("Pepe".to_string()),
            decimals: Some(18),
        })
        .await
        .unwrap();
    assert_eq!(saved.symbol, "PEPE");
    assert_eq!(saved.decimals, 18);

    let tokens = app.client.tokens(&user.address, CHAIN).await.unwrap();
    assert_eq!(tokens.len(), 1);
    assert!(tokens[0].address.eq_ignore_ascii_case(token));

    let err = app
        .client
        .add_token(&AddToken {
            address: "not-an-address".to_string(),
            chain: CHAIN.to_string(),
            user: user.user_id.clone(),
            ..AddToken::default()
        })
        .await
        .unwrap_err();
    assert_eq!(status_of(err), 400);

    app.stop().await;
}

#[tokio::test]
async fn test_send_rejects_bad_credentials_before_touching_chain() {
    let app = spawn_app().await;
    let user = app
        .client
        .create_wallet("sender@example.com", "hunter22", None)
        .await
        .unwrap();

    let err = app
        .client
        .send_tx(&SendTx {
            credentials: Credentials::Account {
                email: "sender@example.com".to_string(),
                password: "not-the-password".to_string(),
            },
            to: user.address.clone(),
            amount: "1".to_string(),
            token_address: Some(USDT.to_string()),
            chain: CHAIN.to_string(),
        })
        .await
        .unwrap_err();
    assert_eq!(status_of(err), 401);

    app.stop().await;
}

#[tokio::test]
async fn test_admin_requires_key() {
    let app = spawn_app().await;

    let err = app.client.pending_rewards().await.unwrap_err();
    assert_eq!(status_of(err), 401);

    let wrong = cointwo_sdk::CoinTwoClient::new(&format!("http://{}", app.addr))
        .with_admin_key("guess");
    let err = wrong.pending_rewards().await.unwrap_err();
    assert_eq!(status_of(err), 401);

    let pending = app.admin.pending_rewards().await.unwrap();
    assert!(pending.is_empty());

    let err = app.admin.approve_reward(42).await.unwrap_err();
    assert_eq!(status_of(err), 404);

    app.stop().await;
}

#[tokio::test]
async fn test_admin_routes_absent_when_disabled() {
    let app = spawn_app_with(|c| c.admin.enabled = false).await;
    let err = app.admin.pending_rewards().await.unwrap_err();
    assert_eq!(status_of(err), 404);
    app.stop().await;
}

#[tokio::test]
async fn test_auth_routes_are_rate_limited() {
    let app = spawn_app_with(|c| {
        c.rate_limit.requests_per_second = 1;
        c.rate_limit.burst_size = 2;
    })
    .await;

    let mut statuses = Vec::new();
    for _ in 0..5 {
        let err = app.client.login("x@example.com", "hunter22").await.unwrap_err();
        statuses.push(status_of(err));
    }
    assert_eq!(&statuses[..2], &[401, 401]);
    assert!(statuses.contains(&429));

    // Read routes are not limited.
    for _ in 0..5 {
        app.client.health().await.unwrap();
    }

    app.stop().await;
}

#[tokio::test]
async fn test_request_id_header() {
    let app = spawn_app().await;
    let http = reqwest::Client::new();
    let url = format!("http://{}/health", app.addr);

    let resp = http.get(&url).send().await.unwrap();
    let generated = resp.headers().get("x-request-id").unwrap().to_str().unwrap();
    assert_eq!(generated.len(), 36);

    let resp = http
        .get(&url)
        .header("x-request-id", "trace-me-123")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.headers().get("x-request-id").unwrap(), "trace-me-123");

    app.stop().await;
}
