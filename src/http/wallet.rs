//! Wallet endpoints: accounts, balances, transfers, swaps and tokens.
//!
//! # Security
//! - Mnemonics are returned once from `/wallet/create` and never stored
//! - Send and swap accept either a raw `privateKey` (used for the request
//!   only) or `email` + `password`, which unlocks the user's keystore

use alloy::primitives::utils::{format_ether, format_units};
use alloy::primitives::Address;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::blockchain::{BlockchainClient, SwapRequest, TxSender, Wallet};
use crate::http::error::{ApiError, ApiResult};
use crate::http::extract::{lookup_user, parse_address, required};
use crate::http::server::AppState;
use crate::security::{hash_password, verify_password};
use crate::store::{NewUser, User, UserToken};

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateWalletRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    /// The inviter's referral code.
    pub referral_code: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWalletResponse {
    pub user_id: String,
    pub address: String,
    pub mnemonic: String,
    pub referral_code: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ImportWalletRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub mnemonic: Option<String>,
    pub private_key: Option<String>,
    pub referral_code: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    pub user_id: String,
    pub email: String,
    pub address: String,
    pub referral_code: String,
}

impl From<User> for AccountResponse {
    fn from(user: User) -> Self {
        Self {
            user_id: user.id,
            email: user.email,
            address: user.wallet_address,
            referral_code: user.referral_code,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ChainQuery {
    pub address: Option<String>,
    pub chain: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalance {
    pub address: String,
    pub symbol: String,
    pub decimals: u8,
    pub balance: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    pub chain: String,
    pub address: String,
    pub native_symbol: String,
    pub native: String,
    pub tokens: Vec<TokenBalance>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SendRequest {
    pub private_key: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub to: Option<String>,
    pub amount: Option<String>,
    pub token_address: Option<String>,
    pub chain: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SwapBody {
    pub private_key: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub from_token: Option<String>,
    pub to_token: Option<String>,
    pub amount_in: Option<String>,
    pub chain: Option<String>,
    /// Percent, e.g. 0.5.
    pub slippage: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TxResponse {
    pub chain: String,
    pub from: String,
    pub tx_hash: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfoResponse {
    pub address: String,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AddTokenRequest {
    pub address: Option<String>,
    pub chain: Option<String>,
    /// User id, email or wallet address.
    pub user: Option<String>,
    pub symbol: Option<String>,
    pub name: Option<String>,
    pub decimals: Option<u8>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UserChainQuery {
    pub user: Option<String>,
    pub chain: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TokensResponse {
    pub tokens: Vec<UserToken>,
}

fn validate_credentials<'a>(
    email: Option<&'a str>,
    password: Option<&'a str>,
) -> ApiResult<(String, &'a str)> {
    let email = required("email", email)?;
    let password = required("password", password)?;
    if !email.contains('@') {
        return Err(ApiError::bad_request("email is not valid"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok((email.to_lowercase(), password))
}

/// Persist a new account for `wallet` and encrypt its key.
async fn register(
    state: &AppState,
    email: &str,
    password: &str,
    wallet: &Wallet,
    referral_code: Option<&str>,
) -> ApiResult<User> {
    let inviter = match referral_code.map(str::trim).filter(|c| !c.is_empty()) {
        Some(code) => Some(
            state
                .store
                .find_user_by_referral_code(code)
                .await?
                .ok_or_else(|| ApiError::bad_request(format!("unknown referral code '{}'", code)))?
                .id,
        ),
        None => None,
    };

    if state.store.find_user_by_email(email).await?.is_some() {
        return Err(ApiError::Conflict("email already registered".to_string()));
    }

    let password_hash = hash_password(password).await.map_err(ApiError::Internal)?;

    // Key first: an account row must never exist without its keystore.
    let keystore_id = uuid::Uuid::new_v4().to_string();
    state
        .vault
        .store(&keystore_id, wallet, password)
        .await
        .map_err(|e| {
            tracing::error!(keystore_id = %keystore_id, error = %e, "Failed to write keystore");
            ApiError::Internal("could not store the wallet key".to_string())
        })?;

    let created = state
        .store
        .create_user(
            NewUser {
                email: email.to_string(),
                password_hash,
                wallet_address: wallet.address().to_string(),
                keystore_id: keystore_id.clone(),
                referred_by: inviter,
            },
            &state.config.reward_chains(),
        )
        .await;

    match created {
        Ok(user) => Ok(user),
        Err(e) => {
            if let Err(cleanup) = state.vault.remove(&keystore_id) {
                tracing::warn!(keystore_id = %keystore_id, error = %cleanup, "Orphaned keystore left behind");
            }
            Err(e.into())
        }
    }
}

/// Check an email/password pair.
async fn authenticate(state: &AppState, email: &str, password: &str) -> ApiResult<User> {
    match state.store.find_user_by_email(email).await? {
        Some(user) if verify_password(password, &user.password_hash).await => Ok(user),
        _ => {
            tracing::info!(email = %email, "Login rejected");
            Err(ApiError::Unauthorized("invalid email or password".to_string()))
        }
    }
}

/// The wallet a send or swap signs with.
async fn signing_wallet(
    state: &AppState,
    private_key: Option<&str>,
    email: Option<&str>,
    password: Option<&str>,
) -> ApiResult<Wallet> {
    if let Some(key) = private_key.map(str::trim).filter(|k| !k.is_empty()) {
        return Ok(Wallet::from_private_key(key)?);
    }

    let email = required("email or privateKey", email)?;
    let password = required("password", password)?;
    let user = authenticate(state, email, password).await?;

    let wallet = state
        .vault
        .unlock(&user.keystore_id, password)
        .await
        .map_err(|e| {
            tracing::warn!(user_id = %user.id, error = %e, "Keystore unlock failed");
            ApiError::Unauthorized("wallet could not be unlocked".to_string())
        })?;

    if !wallet
        .address()
        .to_string()
        .eq_ignore_ascii_case(&user.wallet_address)
    {
        tracing::error!(user_id = %user.id, "Keystore does not match the registered address");
        return Err(ApiError::Internal("keystore mismatch".to_string()));
    }
    Ok(wallet)
}

/// Token given as an address or as a symbol known on the chain.
fn resolve_token(client: &BlockchainClient, name: &str, value: &str) -> ApiResult<Address> {
    if value.starts_with("0x") {
        return parse_address(name, value);
    }
    client
        .tokens()
        .by_symbol(value)
        .map(|t| t.address)
        .ok_or_else(|| {
            ApiError::bad_request(format!(
                "{} '{}' is not a known token on {}",
                name,
                value,
                client.key()
            ))
        })
}

pub async fn create_wallet(
    State(state): State<AppState>,
    payload: Result<Json<CreateWalletRequest>, JsonRejection>,
) -> ApiResult<Json<CreateWalletResponse>> {
    let Json(req) = payload?;
    let (email, password) = validate_credentials(req.email.as_deref(), req.password.as_deref())?;

    let (wallet, mnemonic) = Wallet::generate(state.config.wallet.mnemonic_words)?;
    let user = register(&state, &email, password, &wallet, req.referral_code.as_deref()).await?;

    tracing::info!(user_id = %user.id, address = %user.wallet_address, "Wallet created");
    Ok(Json(CreateWalletResponse {
        user_id: user.id,
        address: user.wallet_address,
        mnemonic,
        referral_code: user.referral_code,
    }))
}

pub async fn import_wallet(
    State(state): State<AppState>,
    payload: Result<Json<ImportWalletRequest>, JsonRejection>,
) -> ApiResult<Json<AccountResponse>> {
    let Json(req) = payload?;
    let (email, password) = validate_credentials(req.email.as_deref(), req.password.as_deref())?;

    let mnemonic = req.mnemonic.as_deref().map(str::trim).filter(|m| !m.is_empty());
    let private_key = req.private_key.as_deref().map(str::trim).filter(|k| !k.is_empty());
    let wallet = match (mnemonic, private_key) {
        (Some(phrase), _) => Wallet::from_mnemonic(phrase)?,
        (None, Some(key)) => Wallet::from_private_key(key)?,
        (None, None) => return Err(ApiError::bad_request("mnemonic or privateKey is required")),
    };

    let user = register(&state, &email, password, &wallet, req.referral_code.as_deref()).await?;
    tracing::info!(user_id = %user.id, address = %user.wallet_address, "Wallet imported");
    Ok(Json(user.into()))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<AccountResponse>> {
    let Json(req) = payload?;
    let email = required("email", req.email.as_deref())?;
    let password = required("password", req.password.as_deref())?;

    let user = authenticate(&state, email, password).await?;
    Ok(Json(user.into()))
}

pub async fn balance(
    State(state): State<AppState>,
    query: Result<Query<ChainQuery>, QueryRejection>,
) -> ApiResult<Json<BalanceResponse>> {
    let Query(query) = query?;
    let address = parse_address("address", required("address", query.address.as_deref())?)?;
    let chain = required("chain", query.chain.as_deref())?;
    let client = state.chains.get(chain)?;

    let native = client.get_balance(address).await?;

    let book = client.tokens();
    let mut listed: Vec<(Address, String, u8)> = book
        .addresses()
        .iter()
        .filter_map(|a| book.by_address(a))
        .map(|t| (t.address, t.symbol.clone(), t.decimals))
        .collect();
    listed.sort_by(|a, b| a.1.cmp(&b.1));

    if let Some(user) = state.store.find_user_by_address(&address.to_string()).await? {
        for token in state.store.list_tokens(&user.id, chain).await? {
            let Ok(token_address) = token.address.parse::<Address>() else {
                continue;
            };
            if listed.iter().any(|(a, _, _)| *a == token_address) {
                continue;
            }
            let decimals = u8::try_from(token.decimals).unwrap_or(18);
            listed.push((token_address, token.symbol, decimals));
        }
    }

    let mut tokens = Vec::with_capacity(listed.len());
    for (token, symbol, decimals) in listed {
        match client.token_balance(token, address).await {
            Ok(value) => tokens.push(TokenBalance {
                address: token.to_string(),
                symbol,
                decimals,
                balance: format_units(value, decimals).unwrap_or_else(|_| value.to_string()),
            }),
            Err(e) => tracing::warn!(
                chain = %chain,
                token = %token,
                error = %e,
                "Token balance read failed"
            ),
        }
    }

    Ok(Json(BalanceResponse {
        chain: chain.to_string(),
        address: address.to_string(),
        native_symbol: client.config().native_symbol.clone(),
        native: format_ether(native),
        tokens,
    }))
}

pub async fn send(
    State(state): State<AppState>,
    payload: Result<Json<SendRequest>, JsonRejection>,
) -> ApiResult<Json<TxResponse>> {
    let Json(req) = payload?;
    let chain = required("chain", req.chain.as_deref())?;
    let to = parse_address("to", required("to", req.to.as_deref())?)?;
    let amount = required("amount", req.amount.as_deref())?;
    let token = match req.token_address.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        Some(t) => Some(parse_address("tokenAddress", t)?),
        None => None,
    };
    let client = state.chains.get(chain)?;

    let wallet = signing_wallet(
        &state,
        req.private_key.as_deref(),
        req.email.as_deref(),
        req.password.as_deref(),
    )
    .await?;
    let sender = TxSender::new(client, wallet)?;

    let tx_hash = match token {
        Some(token) => sender.send_token(token, to, amount).await?,
        None => sender.send_native(to, amount).await?,
    };

    Ok(Json(TxResponse {
        chain: chain.to_string(),
        from: sender.address().to_string(),
        tx_hash: tx_hash.to_string(),
    }))
}

pub async fn swap(
    State(state): State<AppState>,
    payload: Result<Json<SwapBody>, JsonRejection>,
) -> ApiResult<Json<TxResponse>> {
    let Json(req) = payload?;
    let chain = required("chain", req.chain.as_deref())?;
    let client = state.chains.get(chain)?;
    let from_token = resolve_token(client, "fromToken", required("fromToken", req.from_token.as_deref())?)?;
    let to_token = resolve_token(client, "toToken", required("toToken", req.to_token.as_deref())?)?;
    let amount_in = required("amountIn", req.amount_in.as_deref())?;
    let slippage = req
        .slippage
        .ok_or_else(|| ApiError::bad_request("slippage is required"))?;
    if from_token == to_token {
        return Err(ApiError::bad_request("fromToken and toToken must differ"));
    }

    let wallet = signing_wallet(
        &state,
        req.private_key.as_deref(),
        req.email.as_deref(),
        req.password.as_deref(),
    )
    .await?;
    let sender = TxSender::new(client, wallet)?;

    let tx_hash = sender
        .swap(&SwapRequest {
            from_token,
            to_token,
            amount_in: amount_in.to_string(),
            slippage_pct: slippage,
        })
        .await?;

    Ok(Json(TxResponse {
        chain: chain.to_string(),
        from: sender.address().to_string(),
        tx_hash: tx_hash.to_string(),
    }))
}

pub async fn token_info(
    State(state): State<AppState>,
    query: Result<Query<ChainQuery>, QueryRejection>,
) -> ApiResult<Json<TokenInfoResponse>> {
    let Query(query) = query?;
    let token = parse_address("address", required("address", query.address.as_deref())?)?;
    let chain = required("chain", query.chain.as_deref())?;
    let metadata = state.chains.get(chain)?.token_metadata(token).await?;

    Ok(Json(TokenInfoResponse {
        address: token.to_string(),
        name: metadata.name,
        symbol: metadata.symbol,
        decimals: metadata.decimals,
    }))
}

/// Save a custom token. Name, symbol and decimals are read from the chain
/// unless all three are supplied.
pub async fn add_token(
    State(state): State<AppState>,
    payload: Result<Json<AddTokenRequest>, JsonRejection>,
) -> ApiResult<Json<UserToken>> {
    let Json(req) = payload?;
    let token = parse_address("address", required("address", req.address.as_deref())?)?;
    let chain = required("chain", req.chain.as_deref())?;
    let user = lookup_user(&state.store, required("user", req.user.as_deref())?).await?;
    let client = state.chains.get(chain)?;

    let (symbol, name, decimals) = match (req.symbol, req.name, req.decimals) {
        (Some(symbol), Some(name), Some(decimals)) if !symbol.trim().is_empty() => {
            (symbol.trim().to_string(), name.trim().to_string(), decimals)
        }
        _ => {
            let metadata = client.token_metadata(token).await?;
            (metadata.symbol, metadata.name, metadata.decimals)
        }
    };

    let saved = state
        .store
        .add_token(&user.id, chain, &token.to_string(), &symbol, &name, decimals)
        .await?;
    tracing::info!(user_id = %user.id, chain = %chain, token = %token, symbol = %symbol, "Token added");
    Ok(Json(saved))
}

pub async fn tokens(
    State(state): State<AppState>,
    query: Result<Query<UserChainQuery>, QueryRejection>,
) -> ApiResult<Json<TokensResponse>> {
    let Query(query) = query?;
    let user = lookup_user(&state.store, required("user", query.user.as_deref())?).await?;
    let chain = required("chain", query.chain.as_deref())?;
    state.chains.get(chain)?;

    let tokens = state.store.list_tokens(&user.id, chain).await?;
    Ok(Json(TokensResponse { tokens }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_credentials() {
        let (email, password) = validate_credentials(Some(" Bob@X.io "), Some("secret1")).unwrap();
        assert_eq!(email, "bob@x.io");
        assert_eq!(password, "secret1");

        assert!(validate_credentials(None, Some("secret1")).is_err());
        assert!(validate_credentials(Some("bob"), Some("secret1")).is_err());
        let err = validate_credentials(Some("bob@x.io"), Some("short")).unwrap_err();
        assert!(err.to_string().contains("at least 6"));
    }

    #[test]
    fn test_resolve_token() {
        let config = crate::config::schema::default_chains();
        let client = BlockchainClient::new("ethereum", config["ethereum"].clone()).unwrap();

        let usdt = resolve_token(&client, "toToken", "usdt").unwrap();
        assert_eq!(usdt, client.tokens().by_symbol("USDT").unwrap().address);

        let raw = "0x6B175474E89094C44Da98b954EedeAC495271d0F";
        assert_eq!(resolve_token(&client, "toToken", raw).unwrap(), raw.parse::<Address>().unwrap());
        assert!(resolve_token(&client, "toToken", "DOGE").is_err());
    }
}
