use std::sync::Arc;

use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use connectsphere::aggregator::{start_background_refresh, FeedAggregator};
use connectsphere::assets::AssetCatalog;
use connectsphere::cache::FeedCache;
use connectsphere::comments::CommentFetcher;
use connectsphere::config::Config;
use connectsphere::db::Database;
use connectsphere::routes::{self, AppState};
use connectsphere::sources::http_client;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "connectsphere=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load("connectsphere.toml")?;
    info!(
        "Loaded {} sources across {} categories",
        config.sources.len(),
        config.active_categories().len()
    );

    // Initialize database
    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite:connectsphere.db?mode=rwc".to_string());
    let db = Database::new(&database_url).await?;
    db.initialize().await?;
    info!("Database initialized");

    // Shared collaborators
    let client = http_client()?;
    let assets = Arc::new(AssetCatalog::from_config(&config.assets));
    let cache = Arc::new(FeedCache::new());

    let feed = Arc::new(FeedAggregator::from_config(
        &config,
        client.clone(),
        cache,
        assets.clone(),
    ));
    let comments = Arc::new(CommentFetcher::from_config(&config, client, assets));

    // Start background refresh task
    if config.refresh_interval > 0 {
        let bg_feed = feed.clone();
        let refresh_interval = config.refresh_interval;
        tokio::spawn(async move {
            start_background_refresh(bg_feed, refresh_interval).await;
        });
    }

    let state = Arc::new(AppState {
        db: Arc::new(db),
        feed,
        comments,
    });

    let app = routes::router(state).layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

    // Start server
    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Server starting on http://{}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
