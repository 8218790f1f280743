use anyhow::Context;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use super::error::{ApiError, ApiResult};
use super::extract::{JsonBody, Path, Query};
use super::handlers::AppState;
use crate::auth::{CurrentUser, MaybeUser};
use crate::models::{
    Recipe, RecipeBrief, RecipeFilter, RecipeList, RecipeRequest, RecipeView, ShortLinkResponse,
    User,
};
use crate::shopping::{render_shopping_list, SHOPPING_LIST_FILENAME};

/// Query string of the recipe list. `tags` may repeat, so this is parsed
/// from raw pairs rather than through a derived deserializer.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RecipeQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub author: Option<i64>,
    pub tags: Vec<String>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

fn parse_int(key: &str, value: &str) -> ApiResult<i64> {
    value
        .parse::<i64>()
        .map_err(|_| ApiError::bad_request(format!("'{key}' must be an integer")))
}

fn parse_flag(value: &str) -> bool {
    matches!(value, "1" | "true" | "True")
}

impl RecipeQuery {
    pub fn parse(params: &[(String, String)]) -> ApiResult<Self> {
        let mut query = RecipeQuery::default();

        for (key, value) in params {
            match key.as_str() {
                "limit" => query.limit = Some(parse_int(key, value)?),
                "offset" => query.offset = Some(parse_int(key, value)?),
                "author" => query.author = Some(parse_int(key, value)?),
                "tags" if !value.is_empty() => query.tags.push(value.clone()),
                "is_favorited" => query.is_favorited = parse_flag(value),
                "is_in_shopping_cart" => query.is_in_shopping_cart = parse_flag(value),
                _ => {}
            }
        }

        Ok(query)
    }

    /// Favorite and cart filters only apply to an authenticated viewer.
    pub fn into_filter(self, viewer: Option<i64>, limit: i64, offset: i64) -> RecipeFilter {
        RecipeFilter {
            author: self.author,
            tags: self.tags,
            favorited_by: viewer.filter(|_| self.is_favorited),
            in_cart_of: viewer.filter(|_| self.is_in_shopping_cart),
            limit,
            offset,
        }
    }
}

async fn recipe_view(
    state: &AppState,
    recipe: Recipe,
    viewer: Option<i64>,
) -> anyhow::Result<RecipeView> {
    let author = state
        .storage
        .get_user(recipe.author_id)
        .await?
        .with_context(|| format!("author of recipe {} is missing", recipe.id))?;
    let author = state.user_view(author, viewer).await?;

    let tags = state.storage.recipe_tags(recipe.id).await?;
    let ingredients = state.storage.recipe_ingredients(recipe.id).await?;

    let (is_favorited, is_in_shopping_cart) = match viewer {
        Some(user_id) => (
            state
                .storage
                .is_in_list(RecipeList::Favorites, user_id, recipe.id)
                .await?,
            state
                .storage
                .is_in_list(RecipeList::ShoppingCart, user_id, recipe.id)
                .await?,
        ),
        None => (false, false),
    };

    Ok(RecipeView {
        id: recipe.id,
        tags,
        author,
        ingredients,
        is_favorited,
        is_in_shopping_cart,
        name: recipe.name,
        text: recipe.text,
        cooking_time: recipe.cooking_time,
    })
}

/// Field checks plus existence of every referenced tag and ingredient
async fn validate_request(state: &AppState, request: &RecipeRequest) -> ApiResult<()> {
    request.validate().map_err(ApiError::BadRequest)?;

    let known_tags = state.storage.count_tags(&request.tags).await?;
    if known_tags != request.tags.len() as i64 {
        return Err(ApiError::bad_request("Unknown tag id in 'tags'"));
    }

    let ingredient_ids = request.ingredient_ids();
    let known_ingredients = state.storage.count_ingredients(&ingredient_ids).await?;
    if known_ingredients != ingredient_ids.len() as i64 {
        return Err(ApiError::bad_request(
            "Unknown ingredient id in 'ingredients'",
        ));
    }

    Ok(())
}

async fn find_recipe(state: &AppState, id: i64) -> ApiResult<Recipe> {
    state
        .storage
        .get_recipe(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Recipe not found"))
}

/// Load a recipe the user is allowed to change
async fn find_own_recipe(state: &AppState, id: i64, user: &User) -> ApiResult<Recipe> {
    let recipe = find_recipe(state, id).await?;
    if recipe.author_id != user.id {
        return Err(ApiError::Forbidden);
    }
    Ok(recipe)
}

pub async fn list_recipes(
    State(state): State<Arc<AppState>>,
    viewer: MaybeUser,
    Query(params): Query<Vec<(String, String)>>,
) -> ApiResult<Json<Vec<RecipeView>>> {
    let query = RecipeQuery::parse(&params)?;
    let (limit, offset) = state.page(query.limit, query.offset);
    let filter = query.into_filter(viewer.id(), limit, offset);

    let recipes = state.storage.list_recipes(&filter).await?;

    let mut views = Vec::with_capacity(recipes.len());
    for recipe in recipes {
        views.push(recipe_view(&state, recipe, viewer.id()).await?);
    }

    Ok(Json(views))
}

pub async fn get_recipe(
    State(state): State<Arc<AppState>>,
    viewer: MaybeUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<RecipeView>> {
    let recipe = find_recipe(&state, id).await?;
    Ok(Json(recipe_view(&state, recipe, viewer.id()).await?))
}

pub async fn create_recipe(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    JsonBody(payload): JsonBody<RecipeRequest>,
) -> ApiResult<(StatusCode, Json<RecipeView>)> {
    validate_request(&state, &payload).await?;

    let recipe = state.storage.create_recipe(user.id, &payload).await?;
    tracing::info!(recipe_id = recipe.id, author_id = user.id, "recipe created");

    let view = recipe_view(&state, recipe, Some(user.id)).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn update_recipe(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    JsonBody(payload): JsonBody<RecipeRequest>,
) -> ApiResult<Json<RecipeView>> {
    find_own_recipe(&state, id, &user).await?;
    validate_request(&state, &payload).await?;

    let recipe = state
        .storage
        .update_recipe(id, &payload)
        .await?
        .ok_or_else(|| ApiError::not_found("Recipe not found"))?;

    Ok(Json(recipe_view(&state, recipe, Some(user.id)).await?))
}

pub async fn delete_recipe(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    find_own_recipe(&state, id, &user).await?;

    if !state.storage.delete_recipe(id).await? {
        return Err(ApiError::not_found("Recipe not found"));
    }

    tracing::info!(recipe_id = id, author_id = user.id, "recipe deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Short link to the recipe's frontend page
pub async fn get_short_link(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<ShortLinkResponse>> {
    let recipe = find_recipe(&state, id).await?;

    let full_url = state.short_links.config().recipe_url(recipe.id);
    let short_link = state.short_links.shorten(&full_url).await?;

    Ok(Json(ShortLinkResponse { short_link }))
}

async fn add_recipe_to_list(
    state: &AppState,
    list: RecipeList,
    user: &User,
    recipe_id: i64,
) -> ApiResult<(StatusCode, Json<RecipeBrief>)> {
    let recipe = find_recipe(state, recipe_id).await?;

    if !state.storage.add_to_list(list, user.id, recipe.id).await? {
        return Err(ApiError::bad_request(format!(
            "Recipe is already in your {}",
            list.label()
        )));
    }

    Ok((StatusCode::CREATED, Json(RecipeBrief::from(&recipe))))
}

async fn remove_recipe_from_list(
    state: &AppState,
    list: RecipeList,
    user: &User,
    recipe_id: i64,
) -> ApiResult<StatusCode> {
    let recipe = find_recipe(state, recipe_id).await?;

    if !state.storage.remove_from_list(list, user.id, recipe.id).await? {
        return Err(ApiError::bad_request(format!(
            "Recipe is not in your {}",
            list.label()
        )));
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_favorite(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<(StatusCode, Json<RecipeBrief>)> {
    add_recipe_to_list(&state, RecipeList::Favorites, &user, id).await
}

pub async fn remove_favorite(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    remove_recipe_from_list(&state, RecipeList::Favorites, &user, id).await
}

pub async fn add_to_shopping_cart(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<(StatusCode, Json<RecipeBrief>)> {
    add_recipe_to_list(&state, RecipeList::ShoppingCart, &user, id).await
}

pub async fn remove_from_shopping_cart(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    remove_recipe_from_list(&state, RecipeList::ShoppingCart, &user, id).await
}

pub async fn download_shopping_cart(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<impl IntoResponse> {
    let items = state.storage.shopping_cart_totals(user.id).await?;
    let body = render_shopping_list(&items);

    Ok((
        [
            (
                header::CONTENT_TYPE,
                "text/plain; charset=utf-8".to_string(),
            ),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{SHOPPING_LIST_FILENAME}\""),
            ),
        ],
        body,
    ))
}
