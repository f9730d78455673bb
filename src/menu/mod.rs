//! Menu items and milk upcharges.
//!
//! Reads are public and share the general quota. Writes, including image
//! uploads, sit behind the access gate and the admin quota.

pub mod handlers;
pub mod types;
pub mod upload;

use axum::{
    routing::{delete, get, post, put, MethodRouter},
    Router,
};

use crate::http::AppState;
use crate::security::RateLimiters;

use self::handlers::*;
use self::upload::upload_image;

pub fn routes(limiters: &RateLimiters) -> Router<AppState> {
    let read = |r: MethodRouter<AppState>| limiters.guard(r, &limiters.general);
    let write = |r: MethodRouter<AppState>| limiters.guard(r, &limiters.admin);

    Router::new()
        .route(
            "/api/menu",
            read(get(list_menu))
                .merge(write(post(create_menu_item)))
                .merge(write(delete(delete_menu_items))),
        )
        .route(
            "/api/menu/milk-upcharges",
            read(get(list_milk_upcharges)).merge(write(put(upsert_milk_upcharges))),
        )
        .route(
            "/api/menu/{id}",
            read(get(get_menu_item))
                .merge(write(put(update_menu_item).patch(update_menu_item)))
                .merge(write(delete(delete_menu_item))),
        )
        .route("/api/upload", write(post(upload_image)))
}
