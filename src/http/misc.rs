//! Health, chain list and prices.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::http::error::ApiResult;
use crate::http::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Unix seconds.
    pub time: u64,
    pub version: &'static str,
    pub database: bool,
}

/// 200 when the database answers, 503 otherwise.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database = state.store.ping().await;
    let time = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();

    let (code, status) = if database {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };
    (
        code,
        Json(HealthResponse {
            status,
            time,
            version: env!("CARGO_PKG_VERSION"),
            database,
        }),
    )
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenView {
    pub address: String,
    pub symbol: String,
    pub decimals: u8,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainView {
    pub key: String,
    pub name: String,
    pub chain_id: u64,
    pub native_symbol: String,
    pub explorer: String,
    pub rewards_enabled: bool,
    pub swap_enabled: bool,
    pub tokens: Vec<TokenView>,
}

pub async fn chains(State(state): State<AppState>) -> Json<Vec<ChainView>> {
    let views = state
        .config
        .chains
        .iter()
        .map(|(key, chain)| ChainView {
            key: key.clone(),
            name: chain.name.clone(),
            chain_id: chain.chain_id,
            native_symbol: chain.native_symbol.clone(),
            explorer: chain.explorer.clone(),
            rewards_enabled: chain.rewards_enabled,
            swap_enabled: !chain.router_address.is_empty(),
            tokens: chain
                .tokens
                .iter()
                .map(|t| TokenView {
                    address: t.address.clone(),
                    symbol: t.symbol.to_uppercase(),
                    decimals: t.decimals,
                })
                .collect(),
        })
        .collect();
    Json(views)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PriceQuery {
    /// Comma-separated symbols; all configured symbols when absent.
    pub symbols: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PriceResponse {
    pub prices: HashMap<String, f64>,
}

pub async fn prices(
    State(state): State<AppState>,
    query: Result<Query<PriceQuery>, QueryRejection>,
) -> ApiResult<Json<PriceResponse>> {
    let Query(query) = query?;
    let symbols: BTreeSet<String> = match query.symbols.as_deref() {
        Some(list) if !list.trim().is_empty() => list
            .split(',')
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect(),
        _ => state
            .config
            .prices
            .ids
            .keys()
            .map(|s| s.to_uppercase())
            .collect(),
    };
    let symbols: Vec<String> = symbols.into_iter().collect();

    let prices = state.prices.usd_prices(&symbols).await?;
    Ok(Json(PriceResponse { prices }))
}
