//! Menu API handlers.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::http::sanitize::{sanitize_optional, sanitize_string};
use crate::http::{ApiError, AppState};
use crate::menu::types::{MenuItem, MenuItemPatch, MilkUpcharge, NewMenuItem, Pricing};
use crate::store::MenuFilter;

const MAX_NAME_LEN: usize = 100;
const MAX_DESCRIPTION_LEN: usize = 1000;

#[derive(Debug, Default, Deserialize)]
pub struct MenuQuery {
    pub featured: Option<String>,
}

impl MenuQuery {
    fn featured_only(&self) -> bool {
        self.featured
            .as_deref()
            .is_some_and(|v| !matches!(v.trim(), "" | "0" | "false"))
    }
}

#[derive(Debug, Deserialize)]
pub struct BulkDeleteQuery {
    pub category: Option<String>,
}

fn required(field: &str, value: &str, max: usize) -> Result<String, ApiError> {
    let value = sanitize_string(value);
    if value.is_empty() {
        return Err(ApiError::bad_request(format!("{field} is required.")));
    }
    if value.chars().count() > max {
        return Err(ApiError::bad_request(format!("{field} is too long.")));
    }
    Ok(value)
}

fn optional(field: &str, value: Option<&str>, max: usize) -> Result<Option<String>, ApiError> {
    match sanitize_optional(value) {
        Some(v) if v.chars().count() > max => {
            Err(ApiError::bad_request(format!("{field} is too long.")))
        }
        other => Ok(other),
    }
}

fn clean_ingredients(ingredients: Option<Vec<String>>) -> Option<Vec<String>> {
    ingredients
        .map(|list| {
            list.iter()
                .map(|i| sanitize_string(i))
                .filter(|i| !i.is_empty())
                .collect::<Vec<_>>()
        })
        .filter(|list| !list.is_empty())
}

fn check_pricing(pricing: &Pricing) -> Result<(), ApiError> {
    pricing.validate().map_err(ApiError::bad_request)
}

fn validate_new_item(item: NewMenuItem) -> Result<NewMenuItem, ApiError> {
    check_pricing(&item.pricing)?;
    Ok(NewMenuItem {
        name: required("Name", &item.name, MAX_NAME_LEN)?,
        description: optional("Description", item.description.as_deref(), MAX_DESCRIPTION_LEN)?,
        category: required("Category", &item.category, MAX_NAME_LEN)?.to_lowercase(),
        is_featured: item.is_featured,
        ingredients: clean_ingredients(item.ingredients),
        pricing: item.pricing,
        image_url: item.image_url.filter(|u| !u.trim().is_empty()),
    })
}

fn validate_patch(mut patch: MenuItemPatch) -> Result<MenuItemPatch, ApiError> {
    if patch.is_empty() {
        return Err(ApiError::bad_request("Nothing to update."));
    }
    if let Some(name) = patch.name.take() {
        patch.name = Some(required("Name", &name, MAX_NAME_LEN)?);
    }
    if let Some(category) = patch.category.take() {
        patch.category = Some(required("Category", &category, MAX_NAME_LEN)?.to_lowercase());
    }
    if let Some(description) = patch.description.take() {
        patch.description = Some(optional(
            "Description",
            description.as_deref(),
            MAX_DESCRIPTION_LEN,
        )?);
    }
    if let Some(ingredients) = patch.ingredients.take() {
        patch.ingredients = Some(clean_ingredients(ingredients));
    }
    if let Some(pricing) = &patch.pricing {
        check_pricing(pricing)?;
    }
    Ok(patch)
}

pub async fn list_menu(
    State(state): State<AppState>,
    query: Result<Query<MenuQuery>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(query) = query?;
    let items = state.store.list_menu(query.featured_only()).await?;
    let milk_upcharges = state.store.list_milk_upcharges().await?;
    Ok(Json(json!({ "items": items, "milkUpcharges": milk_upcharges })))
}

pub async fn get_menu_item(
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
) -> Result<Json<MenuItem>, ApiError> {
    let Path(id) = id?;
    state
        .store
        .get_menu_item(id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

pub async fn create_menu_item(
    State(state): State<AppState>,
    payload: Result<Json<NewMenuItem>, JsonRejection>,
) -> Result<(StatusCode, Json<MenuItem>), ApiError> {
    let Json(item) = payload?;
    let item = validate_new_item(item)?;
    let created = state.store.create_menu_item(item).await?;
    tracing::info!(id = created.id, name = %created.name, "Menu item created");
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_menu_item(
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
    payload: Result<Json<MenuItemPatch>, JsonRejection>,
) -> Result<Json<MenuItem>, ApiError> {
    let Path(id) = id?;
    let Json(patch) = payload?;
    let patch = validate_patch(patch)?;
    let updated = state.store.update_menu_item(id, patch).await?;
    tracing::info!(id, "Menu item updated");
    Ok(Json(updated))
}

pub async fn delete_menu_item(
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
) -> Result<Json<Value>, ApiError> {
    let Path(id) = id?;
    state.store.delete_menu_item(id).await?;
    tracing::info!(id, "Menu item deleted");
    Ok(Json(json!({ "ok": true })))
}

/// Remove every item in a category. A category is required.
pub async fn delete_menu_items(
    State(state): State<AppState>,
    query: Result<Query<BulkDeleteQuery>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(query) = query?;
    let category = query
        .category
        .map(|c| sanitize_string(&c))
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::bad_request("A category is required."))?;

    let removed = state
        .store
        .delete_menu_where(MenuFilter {
            category: Some(category.clone()),
            featured: None,
        })
        .await?;
    tracing::info!(category = %category, removed, "Menu category cleared");
    Ok(Json(json!({ "ok": true, "removed": removed })))
}

pub async fn list_milk_upcharges(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let upcharges = state.store.list_milk_upcharges().await?;
    Ok(Json(json!({ "milkUpcharges": upcharges })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MilkUpchargesUpdate {
    pub milk_upcharges: Vec<MilkUpcharge>,
}

pub async fn upsert_milk_upcharges(
    State(state): State<AppState>,
    payload: Result<Json<MilkUpchargesUpdate>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(update) = payload?;

    let mut cleaned = Vec::with_capacity(update.milk_upcharges.len());
    for upcharge in update.milk_upcharges {
        let milk_type = required("Milk type", &upcharge.milk_type, 50)?.to_lowercase();
        if !upcharge.price.is_finite() || upcharge.price < 0.0 {
            return Err(ApiError::bad_request("Price must be a non-negative number."));
        }
        cleaned.push(MilkUpcharge {
            milk_type,
            price: upcharge.price,
        });
    }

    let mut saved = Vec::with_capacity(cleaned.len());
    for upcharge in cleaned {
        saved.push(state.store.upsert_milk_upcharge(upcharge).await?);
    }
    Ok(Json(json!({ "milkUpcharges": saved })))
}
