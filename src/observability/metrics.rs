//! Metrics collection and exposition.
//!
//! # Metrics
//! - `cointwo_http_requests_total` (counter): requests by method, route, status
//! - `cointwo_http_request_duration_seconds` (histogram): API latency
//! - `cointwo_poll_cycles_total` (counter): completed poll cycles
//! - `cointwo_poll_cycle_duration_seconds` (histogram): poll cycle latency
//! - `cointwo_poll_users` (gauge): users scanned in the last cycle
//! - `cointwo_poll_user_errors_total` (counter): per-user failures by chain
//! - `cointwo_tasks_eligible_total` (counter): achievements by action
//! - `cointwo_price_fetch_total` (counter): price fetches by outcome
//! - `cointwo_price_cache_size` (gauge): cached price entries
//! - `cointwo_rpc_health` (gauge): 1=healthy, 0=unhealthy, per chain
//! - `cointwo_rate_limited_total` (counter): rejected requests
//! - `cointwo_reward_decisions_total` (counter): admin decisions

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a finished API request.
pub fn record_request(method: &str, route: &str, status: u16, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("route", route.to_string()),
        ("status", status.to_string()),
    ];
    counter!("cointwo_http_requests_total", &labels).increment(1);
    histogram!("cointwo_http_request_duration_seconds", &labels)
        .record(start.elapsed().as_secs_f64());
}

/// Record a finished poll cycle.
pub fn record_poll_cycle(users: usize, start: Instant) {
    counter!("cointwo_poll_cycles_total").increment(1);
    gauge!("cointwo_poll_users").set(users as f64);
    histogram!("cointwo_poll_cycle_duration_seconds").record(start.elapsed().as_secs_f64());
}

/// Record a user that could not be checked.
pub fn record_poll_error(chain: &str) {
    counter!("cointwo_poll_user_errors_total", "chain" => chain.to_string()).increment(1);
}

/// Record a task that became eligible.
pub fn record_task_eligible(action: &'static str) {
    counter!("cointwo_tasks_eligible_total", "action" => action).increment(1);
}

/// Record a price fetch outcome ("hit", "fetched", "error").
pub fn record_price_fetch(outcome: &'static str) {
    counter!("cointwo_price_fetch_total", "outcome" => outcome).increment(1);
}

/// Record the number of cached prices.
pub fn record_price_cache_size(size: usize) {
    gauge!("cointwo_price_cache_size").set(size as f64);
}

/// Record RPC reachability for a chain.
pub fn record_rpc_health(chain: &str, healthy: bool) {
    gauge!("cointwo_rpc_health", "chain" => chain.to_string()).set(if healthy { 1.0 } else { 0.0 });
}

/// Record a rate-limited request.
pub fn record_rate_limited(route: &str) {
    counter!("cointwo_rate_limited_total", "route" => route.to_string()).increment(1);
}

/// Record an admin reward decision ("approved", "rejected").
pub fn record_reward_decision(decision: &'static str) {
    counter!("cointwo_reward_decisions_total", "decision" => decision).increment(1);
}
