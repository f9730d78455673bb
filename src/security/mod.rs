//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → headers.rs (security response headers, body limit)
//!     → access_control.rs (admin pages, mutating API calls)
//!     → rate_limit.rs (per-route quota classes)
//!     → Pass to handler
//! ```
//!
//! # Design Decisions
//! - The gate and the limiter are independent; neither calls the other
//! - Fail closed: a missing admin identity admits nobody
//! - No trust in client input: role claims are re-checked against config

pub mod access_control;
pub mod headers;
pub mod rate_limit;
pub mod session;

pub use access_control::{is_admin, AccessGate, AdminSession, GateDecision, RejectMode};
pub use rate_limit::{with_rate_limit, RateLimiter, RateLimiters};
pub use session::{Principal, Role, SessionSigner};
