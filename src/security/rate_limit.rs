//! Per-IP token-bucket rate limiting for the auth endpoints.

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use dashmap::DashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::schema::RateLimitConfig;
use crate::http::error::ErrorBody;
use crate::observability::metrics;

/// Buckets idle this long are forgotten.
const IDLE_EVICTION: Duration = Duration::from_secs(600);

struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(capacity: f64) -> Self {
        Self {
            tokens: capacity,
            last_update: Instant::now(),
        }
    }

    fn try_acquire(&mut self, capacity: f64, refill_rate: f64, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.last_update).as_secs_f64();
        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Shared limiter state; one bucket per client IP.
pub struct RateLimiter {
    buckets: DashMap<Option<IpAddr>, TokenBucket>,
    enabled: bool,
    rate: f64,
    burst: f64,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            buckets: DashMap::new(),
            enabled: config.enabled,
            rate: config.requests_per_second as f64,
            burst: config.burst_size as f64,
        }
    }

    /// Take one token for `client`. Requests without a known peer share
    /// one bucket.
    pub fn check(&self, client: Option<IpAddr>) -> bool {
        if !self.enabled {
            return true;
        }
        let now = Instant::now();
        let mut bucket = self
            .buckets
            .entry(client)
            .or_insert_with(|| TokenBucket::new(self.burst));
        bucket.try_acquire(self.burst, self.rate, now)
    }

    /// Drop buckets not touched for a while.
    pub fn evict_idle(&self) {
        let now = Instant::now();
        self.buckets
            .retain(|_, b| now.saturating_duration_since(b.last_update) < IDLE_EVICTION);
    }

    pub fn tracked_clients(&self) -> usize {
        self.buckets.len()
    }
}

pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    if limiter.check(client) {
        return next.run(request).await;
    }

    let route = request.uri().path().to_string();
    tracing::warn!(client = ?client, route = %route, "Rate limit exceeded");
    metrics::record_rate_limited(&route);
    let body = ErrorBody {
        error: "Too many requests".to_string(),
        detail: Some("rate limit exceeded, slow down".to_string()),
    };
    (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response()
}
