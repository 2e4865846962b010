use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kharji::{AppState, Config, build_router, repositories::reset_token as reset_repo};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    tracing::info!("✅ Configuration loaded ({:?})", config.app_env);

    let state = AppState::new(&config)?;
    tracing::info!("✅ AppState initialized");

    let app = build_router(state.clone());

    let cleanup_state = state.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            match reset_repo::purge_expired(&cleanup_state.db).await {
                Ok(deleted) => {
                    tracing::info!("🧹 Purged {} expired reset tokens", deleted);
                }
                Err(e) => {
                    tracing::error!("❌ Reset token cleanup failed: {}", e);
                }
            }
        }
    });

    let addr = config.bind_addr;
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
