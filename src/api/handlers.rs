use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::models::{User, UserView};
use crate::shortlink::ShortLinkService;
use crate::storage::Storage;

pub const MAX_LIMIT: i64 = 100;

pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub short_links: Arc<ShortLinkService>,
    /// Page size used when a list request has no `limit`
    pub default_limit: i64,
}

impl AppState {
    /// Clamp client-supplied paging to sane bounds
    pub fn page(&self, limit: Option<i64>, offset: Option<i64>) -> (i64, i64) {
        let limit = limit.unwrap_or(self.default_limit).clamp(1, MAX_LIMIT);
        let offset = offset.unwrap_or(0).max(0);
        (limit, offset)
    }

    /// Serialize `user` as seen by `viewer`
    pub async fn user_view(&self, user: User, viewer: Option<i64>) -> anyhow::Result<UserView> {
        let is_subscribed = match viewer {
            Some(viewer_id) if viewer_id != user.id => {
                self.storage.is_subscribed(viewer_id, user.id).await?
            }
            _ => false,
        };
        Ok(UserView::new(user, is_subscribed))
    }
}

#[derive(Serialize)]
pub struct SuccessResponse {
    pub message: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Health check endpoint
pub async fn health_check() -> Json<SuccessResponse> {
    Json(SuccessResponse {
        message: "OK".to_string(),
    })
}
