use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::api::ApiError;
use crate::shortlink::{ShortLinkError, ShortLinkService};

pub struct RedirectState {
    pub short_links: Arc<ShortLinkService>,
}

/// Redirect a short code to the URL it stands for
pub async fn redirect_short_link(
    State(state): State<Arc<RedirectState>>,
    Path(code): Path<String>,
) -> Response {
    match state.short_links.resolve(&code).await {
        Ok(full_url) => (StatusCode::FOUND, [(header::LOCATION, full_url)]).into_response(),
        Err(ShortLinkError::NotFound(_)) => {
            tracing::debug!(short_code = %code, "unknown short code");
            ApiError::not_found("Short link not found").into_response()
        }
        Err(ShortLinkError::Storage(err)) => ApiError::Internal(err).into_response(),
    }
}
