//! Tag and ingredient endpoints. Both are read-only over HTTP.

use axum::{extract::State, Json};
use serde::Deserialize;
use std::sync::Arc;

use super::error::{ApiError, ApiResult};
use super::extract::{Path, Query};
use super::handlers::AppState;
use crate::models::{Ingredient, Tag};

#[derive(Debug, Deserialize)]
pub struct IngredientQuery {
    /// Case-insensitive name fragment
    pub name: Option<String>,
}

pub async fn list_tags(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Tag>>> {
    let tags = state.storage.list_tags().await?;
    Ok(Json(tags))
}

pub async fn get_tag(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Tag>> {
    state
        .storage
        .get_tag(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Tag not found"))
}

pub async fn list_ingredients(
    State(state): State<Arc<AppState>>,
    Query(query): Query<IngredientQuery>,
) -> ApiResult<Json<Vec<Ingredient>>> {
    let name = query
        .name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty());

    let ingredients = state.storage.search_ingredients(name).await?;
    Ok(Json(ingredients))
}

pub async fn get_ingredient(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Ingredient>> {
    state
        .storage
        .get_ingredient(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Ingredient not found"))
}
