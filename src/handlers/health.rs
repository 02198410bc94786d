//! `/health` and `/metrics`. Grounded in `original_source`'s
//! `api/server.py` `health_check` (connection-pool status) and the
//! teacher's plain-`#[utoipa::path]` handler composition.

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub database: DatabaseHealth,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DatabaseHealth {
    pub initialized: bool,
    pub pool_size: u32,
    pub idle_connections: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RootResponse {
    pub service: String,
    pub version: String,
    pub routes: Vec<&'static str>,
}

#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Service name, version, and route list", body = RootResponse)),
    tag = "Observability"
)]
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        service: "personality-engine".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        routes: vec![
            "/health",
            "/metrics",
            "/v1/questions",
            "/v1/assessments",
            "/v1/assessments/{id}",
            "/v1/assessments/{id}/generate_explanation",
            "/v1/assessments/sync",
            "/v1/assessments/{user_id}/history",
            "/v1/profiles/{user_id}",
            "/v1/auth/signup",
            "/v1/auth/login",
            "/v1/auth/reset-password",
            "/v1/auth/update-password",
            "/v1/auth/logout",
        ],
    })
}

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Liveness and pool status", body = HealthResponse)),
    tag = "Observability"
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match state.connection_manager.get_client().await {
        Ok(pool) => {
            DatabaseHealth { initialized: true, pool_size: pool.size(), idle_connections: pool.num_idle() }
        },
        Err(_) => DatabaseHealth { initialized: false, pool_size: 0, idle_connections: 0 },
    };
    let status = if database.initialized { "ok" } else { "degraded" };
    Json(HealthResponse { status: status.to_string(), database })
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CacheSizes {
    pub persona: usize,
    pub assessment: usize,
    pub history: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MetricsResponse {
    pub uptime_secs: u64,
    pub requests: u64,
    pub errors: u64,
    pub avg_latency_ms: f64,
    pub cache_sizes: CacheSizes,
}

#[utoipa::path(
    get,
    path = "/metrics",
    responses((status = 200, description = "Uptime, request/error counters, latency, cache sizes", body = MetricsResponse)),
    tag = "Observability"
)]
pub async fn metrics(State(state): State<AppState>) -> Json<MetricsResponse> {
    let snapshot = state.metrics.snapshot();
    let (persona, assessment, history) = state.caches.sizes();
    Json(MetricsResponse {
        uptime_secs: snapshot.uptime_secs,
        requests: snapshot.requests,
        errors: snapshot.errors,
        avg_latency_ms: snapshot.avg_latency_ms,
        cache_sizes: CacheSizes { persona, assessment, history },
    })
}
