pub mod api;
pub mod auth;
pub mod board;
pub mod config;
pub mod core_state;
pub mod db;
pub mod models;
pub mod search;
pub mod workflow;

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Start the backend: tracing, database, first-run admin, API server.
/// Runs until interrupted.
pub async fn run() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("Praxia starting v{}", config::APP_VERSION);

    let core = Arc::new(core_state::CoreState::new());

    // Open once at startup so migrations and the first-run admin happen
    // before the server accepts requests.
    let conn = match core.open_db() {
        Ok(conn) => conn,
        Err(e) => {
            tracing::error!("Cannot open database: {e}");
            return;
        }
    };
    match auth::ensure_admin_account(&conn) {
        Ok(Some(password)) => {
            // Printed once on first run; change it after signing in.
            tracing::warn!("Initial admin password: {password}");
        }
        Ok(None) => {}
        Err(e) => {
            tracing::error!("Cannot prepare admin account: {e}");
            return;
        }
    }
    drop(conn);

    let mut server = match api::start_api_server(core, &config::listen_addr()).await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("{e}");
            return;
        }
    };

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Cannot listen for shutdown signal: {e}");
    }
    tracing::info!("Shutting down");
    server.shutdown();
}
