//! Admin API: reward review and system status.

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

/// Admin routes, all behind the API key.
pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/pending-rewards", get(pending_rewards))
        .route("/admin/approve", post(approve))
        .route("/admin/reject", post(reject))
        .route_layer(middleware::from_fn_with_state(state, admin_auth_middleware))
}
