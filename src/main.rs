use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use wcwp::config::Config;
use wcwp::db;
use wcwp::routes::{create_router, AppState};
use wcwp::services::providers::steam::SteamWebApiProvider;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    let redis_client = db::create_redis_client(&config.redis_url)?;
    // The writer handle must outlive the server so queued cache writes flush.
    let (cache, _cache_writer) = db::Cache::new(redis_client).await;

    let provider = Arc::new(SteamWebApiProvider::new(
        cache,
        config.steam_api_key.clone(),
        config.steam_api_url.clone(),
    ));

    let state = Arc::new(AppState {
        provider,
        openid_url: config.steam_openid_url.clone(),
        public_url: config.public_url.clone(),
        http_client: reqwest::Client::new(),
    });

    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Server running");
    axum::serve(listener, app).await?;

    Ok(())
}
