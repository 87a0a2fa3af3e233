//! Resilience helpers for outbound calls.
//!
//! # Design Decisions
//! - Every external call has a deadline (RPC timeouts live in the chain
//!   client, HTTP timeouts in the reqwest clients)
//! - Failed price lookups are retried with jittered exponential backoff
//! - RPC calls fail over across providers instead of retrying one endpoint

pub mod backoff;

pub use backoff::{calculate_backoff, retry_with_backoff, RetryPolicy};
