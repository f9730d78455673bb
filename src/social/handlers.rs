use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde_json::{json, Value};

use crate::http::sanitize::{is_http_url, sanitize_string};
use crate::http::{ApiError, AppState};
use crate::social::types::{SocialLinkInput, SocialLinksUpdate};

const MAX_PLATFORM: usize = 50;
const MAX_URL: usize = 500;

/// A link that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidLink {
    pub platform: String,
    pub url: String,
    pub enabled: bool,
}

fn validate_link(input: &SocialLinkInput) -> Result<ValidLink, ApiError> {
    let platform = sanitize_string(input.platform.as_deref().unwrap_or_default()).to_lowercase();
    let url = input.url.as_deref().unwrap_or_default().trim().to_string();

    if platform.is_empty() || url.is_empty() {
        return Err(ApiError::bad_request("Each link needs a platform and a url."));
    }
    if platform.chars().count() > MAX_PLATFORM || url.chars().count() > MAX_URL {
        return Err(ApiError::bad_request("Platform or url is too long."));
    }
    if !is_http_url(&url) {
        return Err(ApiError::bad_request(format!("Invalid URL for {platform}.")));
    }

    Ok(ValidLink {
        platform,
        url,
        enabled: input.enabled.unwrap_or(true),
    })
}

/// Validate a whole update. Nothing is written unless every link is valid.
pub fn validate_update(update: SocialLinksUpdate) -> Result<Vec<ValidLink>, ApiError> {
    let links = update
        .links
        .ok_or_else(|| ApiError::bad_request("Links must be an array."))?;
    links.iter().map(validate_link).collect()
}

pub async fn list_links(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let links = state.store.list_social_links(true).await?;
    Ok(Json(json!({ "links": links })))
}

pub async fn update_links(
    State(state): State<AppState>,
    payload: Result<Json<SocialLinksUpdate>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(update) = payload?;
    let links = validate_update(update)?;

    let mut saved = Vec::with_capacity(links.len());
    for link in links {
        saved.push(
            state
                .store
                .upsert_social_link(&link.platform, &link.url, link.enabled)
                .await?,
        );
    }
    tracing::info!(count = saved.len(), "Social links updated");
    Ok(Json(json!({ "links": saved })))
}
