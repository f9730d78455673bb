//! Café site backend.
//!
//! Serves the public menu, contact form and social links, and the admin
//! surface that edits them. Every request passes the access gate; every
//! route is assigned to one of three fixed-window rate limit classes.

// Configuration and runtime
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod security;

// Features
pub mod admin;
pub mod contact;
pub mod menu;
pub mod social;

// Collaborators
pub mod blob;
pub mod mail;
pub mod store;

pub use config::ServerConfig;
pub use http::{build_router, AppState, HttpServer};
pub use lifecycle::Shutdown;
