//! Health check handlers

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{cache::CacheStats, datasource::DataSource, state::AppState};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service name
    pub service: String,

    /// Version
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Readiness check response with dependency status
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    /// Overall readiness status
    pub ready: bool,

    /// Service name
    pub service: String,

    /// Dependency statuses
    pub dependencies: HashMap<String, DependencyStatus>,

    /// Result cache counters at the time of the check
    pub cache: CacheStats,
}

/// Individual dependency status
#[derive(Debug, Serialize, Deserialize)]
pub struct DependencyStatus {
    /// Dependency is healthy
    pub healthy: bool,

    /// Optional message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl DependencyStatus {
    fn up(message: impl Into<String>) -> Self {
        Self {
            healthy: true,
            message: Some(message.into()),
        }
    }

    fn down(message: impl Into<String>) -> Self {
        Self {
            healthy: false,
            message: Some(message.into()),
        }
    }
}

/// Simple health check (liveness)
///
/// Always returns 200 OK if the service is running.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let response = HealthResponse {
        status: "healthy".to_string(),
        service: state.config().service.name.clone(),
        version: Some(env!("CARGO_PKG_VERSION").to_string()),
    };

    (StatusCode::OK, Json(response))
}

/// Readiness check
///
/// Returns 200 OK when the data source answers a ping and the result cache
/// is open, 503 Service Unavailable otherwise.
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let mut dependencies = HashMap::new();
    let source = state.listing().engine().source();

    let source_status = match source.ping().await {
        Ok(()) => DependencyStatus::up(format!("Connected ({})", source.kind())),
        Err(e) => {
            tracing::error!(source = source.kind(), "Data source health check failed: {}", e);
            DependencyStatus::down(e.to_string())
        }
    };
    dependencies.insert("data_source".to_string(), source_status);

    let cache = state.cache();
    let cache_status = if cache.is_closed() {
        DependencyStatus::down("Closed")
    } else {
        DependencyStatus::up("Open")
    };
    dependencies.insert("result_cache".to_string(), cache_status);

    let ready = dependencies.values().all(|d| d.healthy);
    let response = ReadinessResponse {
        ready,
        service: state.config().service.name.clone(),
        dependencies,
        cache: cache.stats(),
    };

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}
