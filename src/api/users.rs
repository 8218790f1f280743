use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use super::error::{ApiError, ApiResult};
use super::extract::{Path, Query};
use super::handlers::{AppState, ListQuery};
use crate::auth::{CurrentUser, MaybeUser};
use crate::models::{SubscriptionView, User, UserView};

#[derive(Debug, Default, Deserialize)]
pub struct SubscriptionsQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    /// Cap on recipes listed per followed author
    pub recipes_limit: Option<i64>,
}

async fn subscription_view(
    state: &AppState,
    author: User,
    recipes_limit: Option<i64>,
) -> anyhow::Result<SubscriptionView> {
    let recipes_limit = recipes_limit.map(|limit| limit.max(0));
    let recipes = state.storage.author_recipes(author.id, recipes_limit).await?;
    let recipes_count = state.storage.count_author_recipes(author.id).await?;

    Ok(SubscriptionView {
        user: UserView::new(author, true),
        recipes,
        recipes_count,
    })
}

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    viewer: MaybeUser,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<UserView>>> {
    let (limit, offset) = state.page(query.limit, query.offset);
    let users = state.storage.list_users(limit, offset).await?;

    let mut views = Vec::with_capacity(users.len());
    for user in users {
        views.push(state.user_view(user, viewer.id()).await?);
    }

    Ok(Json(views))
}

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    viewer: MaybeUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<UserView>> {
    let user = state
        .storage
        .get_user(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(state.user_view(user, viewer.id()).await?))
}

pub async fn me(CurrentUser(user): CurrentUser) -> Json<UserView> {
    Json(UserView::new(user, false))
}

pub async fn subscribe(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(author_id): Path<i64>,
    Query(query): Query<SubscriptionsQuery>,
) -> ApiResult<(StatusCode, Json<SubscriptionView>)> {
    let author = state
        .storage
        .get_user(author_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    if author.id == user.id {
        return Err(ApiError::bad_request("You cannot subscribe to yourself"));
    }

    if !state.storage.subscribe(user.id, author.id).await? {
        return Err(ApiError::bad_request(
            "You are already subscribed to this user",
        ));
    }

    tracing::debug!(user_id = user.id, author_id = author.id, "subscribed");

    let view = subscription_view(&state, author, query.recipes_limit).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn unsubscribe(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(author_id): Path<i64>,
) -> ApiResult<StatusCode> {
    if state.storage.get_user(author_id).await?.is_none() {
        return Err(ApiError::not_found("User not found"));
    }

    if !state.storage.unsubscribe(user.id, author_id).await? {
        return Err(ApiError::bad_request("You are not subscribed to this user"));
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_subscriptions(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<SubscriptionsQuery>,
) -> ApiResult<Json<Vec<SubscriptionView>>> {
    let (limit, offset) = state.page(query.limit, query.offset);
    let authors = state
        .storage
        .list_subscriptions(user.id, limit, offset)
        .await?;

    let mut views = Vec::with_capacity(authors.len());
    for author in authors {
        views.push(subscription_view(&state, author, query.recipes_limit).await?);
    }

    Ok(Json(views))
}
