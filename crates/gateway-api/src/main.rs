//! # Model Services Gateway
//!
//! Binary entry point for the orchestration gateway.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gateway_api::{AppState, Config, build_cache_store, build_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    tracing::info!(
        version = gateway_api::VERSION,
        "Starting model services gateway"
    );

    // Initialize cache store (connects lazily)
    let store = build_cache_store(&config)?;
    tracing::info!(
        backend = store.backend_name(),
        redis_host = %config.redis.host,
        redis_port = config.redis.port,
        default_ttl_secs = config.cache_default_ttl.as_secs(),
        "Cache store configured"
    );

    tracing::info!(
        data_processing = %config.backends.data_processing,
        model_training = %config.backends.model_training,
        model_serving = %config.backends.model_serving,
        experiments = %config.backends.experiments,
        timeout_secs = config.backend_timeout.as_secs(),
        "Backend services configured"
    );

    let state = AppState::from_config(&config, store)?;
    let app = build_router(state);

    // Start server
    let addr = config.server_addr;
    tracing::info!(%addr, "Starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, shutting down");
        }
    }
}
