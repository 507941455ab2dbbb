// Trackit - personal data tracker
// Entry point and server setup

use clap::Parser;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::SqliteStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trackit::config::ServerConfig;
use trackit::{app, routes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trackit=debug,tower_http=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Trackit server");

    let config = ServerConfig::parse();
    let state = app::setup(&config).await?;

    // Sessions share the application database
    let store = SqliteStore::new(state.repo.pool().clone());
    store.migrate().await?;

    let sessions = SessionManagerLayer::new(store)
        .with_secure(false)
        .with_expiry(Expiry::OnInactivity(time::Duration::hours(
            config.session_expiry_hours,
        )));

    let app = routes::router(state).layer(sessions);

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    tracing::info!("Listening on {}", config.bind);
    axum::serve(listener, app).await?;

    Ok(())
}
