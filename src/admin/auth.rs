//! Credential check and session endpoints.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use subtle::ConstantTimeEq;

use crate::config::AdminConfig;
use crate::http::{ApiError, AppState};
use crate::security::is_admin;
use crate::security::session::{clear_session_cookie, emails_match, session_cookie, Principal};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Check submitted credentials against the configured administrator.
///
/// Fails closed when either configured value is empty.
pub fn authenticate(config: &AdminConfig, email: &str, password: &str) -> Option<Principal> {
    if config.password.is_empty() || password.is_empty() {
        return None;
    }
    let password_ok: bool = config
        .password
        .as_bytes()
        .ct_eq(password.as_bytes())
        .into();

    if emails_match(email, &config.email) && password_ok {
        Some(Principal::for_email(email.trim(), &config.email))
    } else {
        None
    }
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;

    let Some(principal) = authenticate(&state.config.admin, &request.email, &request.password) else {
        tracing::warn!(email = %request.email.trim(), "Admin login failed");
        return Err(ApiError::Unauthorized);
    };

    let token = state.signer.issue(&principal);
    tracing::info!(email = %principal.email, "Admin logged in");

    let mut response = Json(json!({
        "ok": true,
        "email": principal.email,
        "role": principal.role,
        "token": token,
    }))
    .into_response();
    if let Some(cookie) = session_cookie(&state.config.session, &token) {
        response.headers_mut().insert(header::SET_COOKIE, cookie);
    }
    Ok(response)
}

pub async fn logout(State(state): State<AppState>) -> Response {
    let mut response = Json(json!({ "ok": true })).into_response();
    if let Some(cookie) = clear_session_cookie(&state.config.session) {
        response.headers_mut().insert(header::SET_COOKIE, cookie);
    }
    response
}

/// Session summary for the site header. Display only; never used to
/// authorize anything.
pub async fn session(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let principal = state.gate.principal(&headers);
    let admin = is_admin(principal.as_ref(), state.gate.admin_email());

    Json(json!({
        "authenticated": principal.is_some(),
        "email": principal.as_ref().map(|p| p.email.as_str()),
        "role": principal.as_ref().map(|p| p.role),
        "isAdmin": admin,
    }))
    .into_response()
}
