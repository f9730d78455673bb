//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing, limits)
//!     → security::access_control (edge gate)
//!     → security::rate_limit (per-route quota class)
//!     → feature handlers (menu, contact, social, admin)
//!     → error.rs (JSON error bodies)
//! ```

pub mod error;
pub mod sanitize;
pub mod server;

pub use error::ApiError;
pub use server::{build_router, AppState, HttpServer};
