//! owlblog - A personal blog with a public API and an admin console

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use owlblog::{
    api::{self, AppState},
    config::Config,
    db::{migrations, Store},
    services::AuthService,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "owlblog=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting owlblog...");

    // Load configuration
    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    // Connect the store; without one the public API serves samples
    let store = Store::connect(&config.database).await?;
    if let Some(pool) = store.pool() {
        tracing::info!("Database connected: {:?}", config.database.driver);
        let applied = migrations::run_migrations(pool).await?;
        tracing::info!("Database migrations completed ({} applied)", applied);
    }

    let state = AppState::new(store.clone(), &config.auth);

    if let Some(admin) = &config.auth.initial_admin {
        if store.is_available() {
            if state
                .auth
                .ensure_initial_admin(&admin.username, &admin.password)
                .await?
            {
                tracing::info!("Created initial admin '{}'", admin.username);
            }
        } else {
            tracing::warn!("Initial admin configured but no database is available");
        }
    }

    // Expired session cleanup
    if store.is_available() {
        spawn_session_cleanup(
            state.auth.clone(),
            Duration::from_secs(config.auth.session_cleanup_secs.max(1)),
        );
    }

    // Build router
    let app = api::build_router(state, &config.server.cors_origin)?;

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn spawn_session_cleanup(auth: Arc<AuthService>, every: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            match auth.purge_expired_sessions().await {
                Ok(0) => {}
                Ok(removed) => tracing::debug!("Purged {} expired sessions", removed),
                Err(e) => tracing::warn!("Session cleanup failed: {}", e),
            }
        }
    });
}
