use anyhow::Context;
use tracing_subscriber::EnvFilter;

use diary_api::database::PgStorage;
use diary_api::{app, config, is_development};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, TOKEN_SECRET_KEY, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Initialize configuration (this loads the config singleton)
    let config = config::config();
    tracing::info!("Starting Diary API in {:?} mode", config.environment);
    if is_development!() {
        tracing::warn!("Development mode: fallback JWT secret is in effect unless TOKEN_SECRET_KEY is set");
    }
    if config.security.jwt_secret.is_empty() {
        anyhow::bail!("TOKEN_SECRET_KEY must be set outside development");
    }

    let app = app(PgStorage::shared());

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Diary API listening on http://{}", bind_addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
