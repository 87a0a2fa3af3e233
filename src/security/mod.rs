//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! POST /login, /wallet/create, /wallet/import
//!     → rate_limit.rs (per-IP token bucket)
//!     → handler (argon2 password checks in http::wallet)
//!
//! /admin/*
//!     → admin::auth (API key)
//! ```

pub mod passwords;
pub mod rate_limit;

pub use passwords::{hash_password, verify_password};
pub use rate_limit::{rate_limit_middleware, RateLimiter};
