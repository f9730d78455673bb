//! Public contact form.

pub mod handlers;
pub mod types;

use axum::{routing::post, Router};

use crate::http::AppState;
use crate::security::RateLimiters;

pub fn routes(limiters: &RateLimiters) -> Router<AppState> {
    Router::new().route(
        "/api/contact",
        limiters.guard(post(handlers::submit_contact), &limiters.contact),
    )
}
