//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → HTTP server stops accepting and drains
//!             → rate limit sweepers exit
//!             → store snapshot written
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
