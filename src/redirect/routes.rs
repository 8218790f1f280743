use axum::{routing::get, Router};
use std::sync::Arc;

use crate::shortlink::ShortLinkService;

use super::handlers::{redirect_short_link, RedirectState};

/// Serves `/{prefix}/{code}`, with or without a trailing slash.
pub fn create_redirect_router(short_links: Arc<ShortLinkService>) -> Router {
    let prefix = short_links.config().path_prefix.clone();
    let state = Arc::new(RedirectState { short_links });

    Router::new()
        .route(&format!("/{prefix}/{{code}}"), get(redirect_short_link))
        .route(&format!("/{prefix}/{{code}}/"), get(redirect_short_link))
        .with_state(state)
}
