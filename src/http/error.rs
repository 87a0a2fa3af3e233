//! API error type and its JSON rendering.
//!
//! Every failure leaves the API as `{"error": <summary>, "detail": <cause>}`
//! with a status code chosen by the error's origin.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::blockchain::BlockchainError;
use crate::prices::PriceError;
use crate::rewards::RewardError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Chain(#[from] BlockchainError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Price(#[from] PriceError),

    #[error(transparent)]
    Reward(#[from] RewardError),

    #[error("{0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Wire shape of an error.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

fn chain_status(e: &BlockchainError) -> (StatusCode, &'static str) {
    match e {
        BlockchainError::UnknownChain(_) => (StatusCode::BAD_REQUEST, "Unknown chain"),
        BlockchainError::InvalidAmount(_) => (StatusCode::BAD_REQUEST, "Invalid amount"),
        BlockchainError::Wallet(_) => (StatusCode::BAD_REQUEST, "Wallet error"),
        BlockchainError::NotAvailable(_) => (StatusCode::BAD_REQUEST, "Not available on this chain"),
        BlockchainError::Reverted(_) => (StatusCode::BAD_GATEWAY, "Transaction reverted"),
        BlockchainError::Timeout(_) | BlockchainError::ConfirmationTimeout(_) => {
            (StatusCode::GATEWAY_TIMEOUT, "Chain request timed out")
        }
        BlockchainError::Rpc(_) | BlockchainError::ChainMismatch { .. } => {
            (StatusCode::BAD_GATEWAY, "Chain request failed")
        }
    }
}

fn store_status(e: &StoreError) -> (StatusCode, &'static str) {
    match e {
        StoreError::Conflict(_) => (StatusCode::CONFLICT, "Already exists"),
        StoreError::NotFound(_) => (StatusCode::NOT_FOUND, "Not found"),
        StoreError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Database error"),
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Status code and summary line.
    pub fn status(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "Bad request"),
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "Not found"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "Already exists"),
            ApiError::Chain(e) => chain_status(e),
            ApiError::Store(e) => store_status(e),
            ApiError::Price(_) => (StatusCode::BAD_GATEWAY, "Price feed unavailable"),
            ApiError::Reward(e) => match e {
                RewardError::Chain(e) => chain_status(e),
                RewardError::Store(e) => store_status(e),
                RewardError::Price(_) => (StatusCode::BAD_GATEWAY, "Price feed unavailable"),
                RewardError::InvalidAddress(_) => (StatusCode::BAD_REQUEST, "Invalid address"),
                RewardError::Payout(_) => (StatusCode::BAD_GATEWAY, "Payout failed"),
            },
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal error"),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, summary) = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "Request rejected");
        }

        let body = ErrorBody {
            error: summary.to_string(),
            detail: Some(self.to_string()),
        };
        (status, Json(body)).into_response()
    }
}
