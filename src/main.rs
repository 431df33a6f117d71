//! EventHub server
//!
//! Main application entry point

use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};

use EventHub::{
    api::{build_router, AppState},
    config::Settings,
    database::DatabaseService,
    utils::logging,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::new().context("Failed to load configuration")?;
    settings.validate().context("Invalid configuration")?;

    // Hold the guard so buffered file logs are flushed on exit
    let _log_guard = logging::init_logging(&settings.logging)?;

    info!("Starting {}...", EventHub::info());

    info!(backend = ?settings.database.backend, "Connecting to event store...");
    let database = DatabaseService::connect(&settings.database)
        .await
        .context("Failed to connect to the event store")?;

    let state = AppState::new(database, &settings);
    spawn_rate_limit_cleanup(&state);

    let app = build_router(state);
    let address = settings.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;

    info!("EventHub listening on {}", address);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("EventHub stopped");
    Ok(())
}

fn spawn_rate_limit_cleanup(state: &AppState) {
    let limiter = state.rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(300));
        loop {
            interval.tick().await;
            limiter.cleanup_old_entries();
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
