use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use keyshare_custodian::{
    config::Config,
    router::{app_router, cors_layer},
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // before the subscriber, so RUST_LOG from .env applies
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!("✅ Configuration loaded successfully");

    let state = AppState::new(&config)
        .await
        .context("Failed to initialize application state")?;
    tracing::info!("✅ AppState initialized");

    let mut app = app_router(state);
    if !config.cors_origins.is_empty() {
        tracing::info!("🌐 CORS enabled for {} origin(s)", config.cors_origins.len());
        app = app.layer(cors_layer(config.cors_origins.clone()));
    }

    tracing::info!("🚀 Custodian listening on http://{}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
