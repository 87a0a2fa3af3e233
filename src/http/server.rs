//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with every API route
//! - Wire up middleware (request id, tracing, timeout, body limit, CORS,
//!   metrics, rate limiting on auth routes)
//! - Serve on a listener until the shutdown broadcast fires

use axum::{
    body::Body,
    http::Request,
    middleware,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin;
use crate::blockchain::{ChainRegistry, KeyVault};
use crate::config::schema::AppConfig;
use crate::http::request::{
    propagate_request_id_layer, request_id, set_request_id_layer, track_metrics,
};
use crate::http::{misc, referral, tasks, wallet};
use crate::prices::PriceFeed;
use crate::rewards::Payouts;
use crate::security::{rate_limit_middleware, RateLimiter};
use crate::store::Store;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Store,
    pub chains: Arc<ChainRegistry>,
    pub prices: Arc<dyn PriceFeed>,
    pub vault: Arc<KeyVault>,
    pub payouts: Payouts,
}

/// How often idle rate-limit buckets are dropped.
const LIMITER_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// HTTP server for the wallet API.
pub struct HttpServer {
    router: Router,
    limiter: Arc<RateLimiter>,
}

impl HttpServer {
    pub fn new(state: AppState) -> Self {
        let limiter = Arc::new(RateLimiter::new(&state.config.rate_limit));
        Self {
            router: build_router(state, limiter.clone()),
            limiter,
        }
    }

    /// The fully layered router, for in-process tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let limiter = self.limiter.clone();
        let mut sweep_shutdown = shutdown.resubscribe();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(LIMITER_SWEEP_INTERVAL);
            loop {
                tokio::select! {
                    _ = ticker.tick() => limiter.evict_idle(),
                    _ = sweep_shutdown.recv() => break,
                }
            }
        });

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server received shutdown signal");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the Axum router with all middleware layers.
#[allow(deprecated)]
pub fn build_router(state: AppState, limiter: Arc<RateLimiter>) -> Router {
    let config = state.config.clone();

    let auth_routes = Router::new()
        .route("/login", post(wallet::login))
        .route("/wallet/create", post(wallet::create_wallet))
        .route("/wallet/import", post(wallet::import_wallet))
        .route_layer(middleware::from_fn_with_state(limiter, rate_limit_middleware));

    let mut app = Router::new()
        .route("/health", get(misc::health))
        .route("/chains", get(misc::chains))
        .route("/prices", get(misc::prices))
        .route("/wallet/balance", get(wallet::balance))
        .route("/wallet/send", post(wallet::send))
        .route("/wallet/swap", post(wallet::swap))
        .route("/wallet/token-info", get(wallet::token_info))
        .route("/wallet/add-token", post(wallet::add_token))
        .route("/wallet/tokens", get(wallet::tokens))
        .route("/task/status", get(tasks::task_status))
        .route("/user/xp", get(tasks::user_xp))
        .route("/referral/progress", get(referral::progress))
        .merge(auth_routes);

    if config.admin.enabled {
        app = app.merge(admin::router(state.clone()));
    } else {
        tracing::info!("Admin API disabled");
    }

    let cors = if config.server.cors_allow_any {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
    };

    app.with_state(state)
        .layer(middleware::from_fn(track_metrics))
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(config.server.max_body_size))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = %request_id(request),
                )
            }),
        )
        .layer(propagate_request_id_layer())
        .layer(set_request_id_layer())
}
