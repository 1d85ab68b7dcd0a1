//! HTTP server with graceful shutdown

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::{
    catch_panic::CatchPanicLayer,
    compression::CompressionLayer,
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

use crate::{config::Config, error::Result, http, state::AppState};

/// Server instance
pub struct Server {
    state: AppState,
}

impl Server {
    /// Create a new server instance
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        self.state.config()
    }

    /// Router with the full middleware stack applied
    pub fn app(&self) -> Router {
        let config = self.config();
        let body_limit = config.middleware.body_limit_mb * 1024 * 1024;

        // Layers wrap outwards: the last one added sees the request first
        http::router(self.state.clone())
            .layer(build_cors_layer(&config.middleware.cors_mode))
            .layer(CompressionLayer::new())
            .layer(TimeoutLayer::with_status_code(
                ::http::StatusCode::REQUEST_TIMEOUT,
                Duration::from_secs(config.service.timeout_secs),
            ))
            .layer(RequestBodyLimitLayer::new(body_limit))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().include_headers(true))
                    .on_response(DefaultOnResponse::new().include_headers(true)),
            )
            .layer(CatchPanicLayer::new())
    }

    /// Run until SIGINT/SIGTERM
    ///
    /// The result cache sweeper runs for the lifetime of the server and the
    /// cache is closed once in-flight requests have drained.
    pub async fn serve(self) -> Result<()> {
        let config = self.config();
        let addr = SocketAddr::from(([0, 0, 0, 0], config.service.port));

        tracing::info!("Starting {} on {}", config.service.name, addr);
        self.log_middleware_config();

        let cache = self.state.cache();
        cache.spawn_sweeper(config.cache.sweep_interval()).await?;

        let listener = TcpListener::bind(&addr).await?;
        tracing::info!("Server listening on {}", addr);

        let served = axum::serve(listener, self.app())
            .with_graceful_shutdown(shutdown_signal())
            .await;

        cache.shutdown().await;
        served?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }

    fn log_middleware_config(&self) {
        let config = self.config();
        tracing::info!("Middleware configuration:");
        tracing::info!("  - Panic recovery: enabled");
        tracing::info!(
            "  - Request body limit: {} MB",
            config.middleware.body_limit_mb
        );
        tracing::info!("  - Compression: enabled");
        tracing::info!("  - CORS mode: {}", config.middleware.cors_mode);
        tracing::info!("  - Request timeout: {} seconds", config.service.timeout_secs);
        tracing::info!(
            "  - Result cache: ttl {}s, max {} entries, sweep every {}s",
            config.cache.ttl_secs,
            config.cache.max_entries,
            config.cache.sweep_interval_secs
        );
    }
}

/// Build CORS layer based on configuration
fn build_cors_layer(mode: &str) -> CorsLayer {
    match mode {
        "permissive" => {
            tracing::debug!("Enabling permissive CORS");
            CorsLayer::permissive()
        }
        "restrictive" => {
            tracing::debug!("Enabling restrictive CORS (default deny)");
            CorsLayer::new()
        }
        "disabled" => {
            tracing::debug!("CORS disabled (using restrictive)");
            CorsLayer::new()
        }
        _ => {
            tracing::warn!("Unknown CORS mode: {}, defaulting to permissive", mode);
            CorsLayer::permissive()
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl+C), starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }

    tracing::info!("Shutdown signal received, draining requests...");
}
