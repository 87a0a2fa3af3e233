//! Admin API key check.
//!
//! The key may arrive as `Authorization: Bearer <key>`, as the `adminKey`
//! query parameter, or as an `adminKey` field of a JSON body (the admin
//! panel posts it that way).

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::http::error::ApiError;
use crate::http::server::AppState;

#[derive(Deserialize)]
struct KeyField {
    #[serde(rename = "adminKey")]
    admin_key: Option<String>,
}

fn bearer_key(request: &Request<Body>) -> Option<String> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|k| k.trim().to_string())
}

fn query_key(request: &Request<Body>) -> Option<String> {
    let query = request.uri().query()?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == "adminKey")
        .map(|(_, v)| v.into_owned())
}

fn is_json(request: &Request<Body>) -> bool {
    request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|h| h.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"))
}

pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let expected = state.config.admin.api_key.as_str();

    let mut request = request;
    let mut presented = bearer_key(&request).or_else(|| query_key(&request));

    if presented.is_none() && is_json(&request) {
        let (parts, body) = request.into_parts();
        let bytes = match axum::body::to_bytes(body, state.config.server.max_body_size).await {
            Ok(bytes) => bytes,
            Err(_) => {
                return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response()
            }
        };
        presented = serde_json::from_slice::<KeyField>(&bytes)
            .ok()
            .and_then(|f| f.admin_key);
        request = Request::from_parts(parts, Body::from(bytes));
    }

    match presented {
        Some(key) if !expected.is_empty() && key == expected => next.run(request).await,
        _ => {
            tracing::warn!(path = %request.uri().path(), "Admin request with missing or wrong key");
            ApiError::Unauthorized("admin key required".to_string()).into_response()
        }
    }
}
