//! ChatHub Server — real-time one-to-one chat relay.
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;

use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt};

use chathub_core::config::AppConfig;
use chathub_core::error::AppError;
use chathub_realtime::{ChatRelay, PgChatStore, run_typing_sweep};

#[tokio::main]
async fn main() {
    let env = std::env::var("CHATHUB_ENV").unwrap_or_else(|_| "development".to_string());

    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting ChatHub v{}", env!("CARGO_PKG_VERSION"));

    // Database connection + migrations
    let db = chathub_database::connection::DatabasePool::connect(&config.database).await?;
    chathub_database::migration::run_migrations(db.pool()).await?;

    // Realtime relay over the Postgres-backed store
    let store = Arc::new(PgChatStore::new(db.pool().clone()));
    let relay = Arc::new(ChatRelay::new(store, config.realtime.clone()));

    // Shutdown channel shared with background tasks
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Typing-expiry sweep
    let sweep_handle = tokio::spawn(run_typing_sweep(Arc::clone(&relay), shutdown_rx));
    tracing::info!(
        interval_ms = config.realtime.typing_sweep_interval_ms,
        "Typing sweep task started"
    );

    // HTTP + WebSocket server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = chathub_api::AppState::new(Arc::new(config), db.clone(), Arc::clone(&relay));
    let app = chathub_api::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    tracing::info!("ChatHub server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            tracing::info!("Shutdown signal received, starting graceful shutdown...");
            let _ = shutdown_tx.send(true);
        })
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), sweep_handle).await;
    db.close().await;

    tracing::info!("ChatHub server shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
