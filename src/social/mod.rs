//! Social media links shown in the site footer.

pub mod handlers;
pub mod types;

use axum::{
    routing::{get, put},
    Router,
};

use crate::http::AppState;
use crate::security::RateLimiters;

pub fn routes(limiters: &RateLimiters) -> Router<AppState> {
    Router::new().route(
        "/api/social-links",
        limiters
            .guard(get(handlers::list_links), &limiters.general)
            .merge(limiters.guard(put(handlers::update_links), &limiters.admin)),
    )
}
