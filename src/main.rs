use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use twittix_recommendation::{
    api::{create_router, AppState, RecommendationSettings},
    config::Config,
    db,
    services::PgPostStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "twittix_recommendation=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let db_pool = db::create_pool(&config.database_url, config.db_max_connections).await?;
    if config.run_migrations {
        db::run_migrations(&db_pool).await?;
    }

    let store = Arc::new(PgPostStore::new(db_pool));
    let state = AppState::new(store, RecommendationSettings::from(&config));
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    tracing::info!(
        addr = %config.bind_addr(),
        default_count = config.default_post_count,
        seeded = config.rng_seed.is_some(),
        "Recommendation server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
