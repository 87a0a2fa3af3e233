//! JSON API for the WebApp.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (request id, trace, timeout, body limit, CORS, metrics)
//!     → rate limit (auth routes) / admin key (admin routes)
//!     → handlers: wallet.rs, tasks.rs, referral.rs, misc.rs
//!     → error.rs (`{"error", "detail"}` with a status code)
//! ```

pub mod error;
pub mod extract;
pub mod misc;
pub mod referral;
pub mod request;
pub mod server;
pub mod tasks;
pub mod wallet;

pub use error::{ApiError, ApiResult};
pub use request::X_REQUEST_ID;
pub use server::{build_router, AppState, HttpServer};
