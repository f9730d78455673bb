//! Administrator surface: credential login, session endpoints and the
//! admin pages.

pub mod auth;
pub mod pages;

use axum::{
    routing::{get, post},
    Router,
};

use crate::http::AppState;
use crate::security::RateLimiters;

use self::auth::{login, logout, session};
use self::pages::{dashboard, list_contacts, login_page, new_menu_item_page};

pub fn routes(limiters: &RateLimiters) -> Router<AppState> {
    Router::new()
        .route("/api/auth/login", limiters.guard(post(login), &limiters.admin))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/session", get(session))
        .route(
            "/api/admin/contacts",
            limiters.guard(get(list_contacts), &limiters.admin),
        )
        .route("/admin/login", get(login_page))
        .route("/admin", get(dashboard))
        .route("/admin/menu/new", get(new_menu_item_page))
}
