use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use larder::app::build_router;
use larder::config::Config;
use larder::storage;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("larder=info,tower_http=info")),
        )
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!("Loaded configuration");

    // Initialize storage
    info!("Using {}", config.database.summary());
    let storage = storage::connect(&config.database).await?;

    info!("Initializing database...");
    storage.init().await?;
    info!("Database initialized successfully");

    info!(
        "🔗 Short links: {}/{}/{{code}} -> {}/recipes/{{id}}/ ({} characters)",
        config.short_links.backend_base_url,
        config.short_links.path_prefix,
        config.short_links.frontend_base_url,
        config.short_links.code_length
    );

    let app = build_router(storage, &config);

    let addr = format!("{}:{}", config.api_server.host, config.api_server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("🚀 Server listening on http://{}", addr);
    info!("   - API endpoints available at http://{}/api/...", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
