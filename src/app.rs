use axum::Router;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::api::{self, AppState};
use crate::auth::AuthService;
use crate::config::Config;
use crate::redirect;
use crate::shortlink::ShortLinkService;
use crate::storage::Storage;

/// Full HTTP surface: the JSON API under `/api`, `/health`, and short link redirects.
pub fn build_router(storage: Arc<dyn Storage>, config: &Config) -> Router {
    let short_links = Arc::new(ShortLinkService::new(
        Arc::clone(&storage),
        config.short_links.clone(),
    ));

    let state = Arc::new(AppState {
        storage: Arc::clone(&storage),
        short_links: Arc::clone(&short_links),
        default_limit: config.pagination.default_limit,
    });
    let auth_service = Arc::new(AuthService::new(storage));

    api::create_api_router(state, auth_service)
        .merge(redirect::create_redirect_router(short_links))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
