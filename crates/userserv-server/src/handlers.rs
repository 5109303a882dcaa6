use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};
use serde::Serialize;

use crate::server::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Serialize)]
struct ReadinessResponse {
    status: &'static str,
    store: StoreStatus,
    cache: CacheStatus,
}

#[derive(Serialize)]
struct StoreStatus {
    backend: &'static str,
    reachable: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CacheStatus {
    mode: String,
    l1_entries: usize,
    redis_available: bool,
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

/// Ready when the record store answers. The cache is reported but never
/// blocks readiness: the services run without it.
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let reachable = match state.store.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check: record store unreachable");
            false
        }
    };

    let backend = state.cache.backend();
    let stats = backend.stats();
    let body = ReadinessResponse {
        status: if reachable { "ready" } else { "unavailable" },
        store: StoreStatus {
            backend: state.store.backend_name(),
            reachable,
        },
        cache: CacheStatus {
            mode: stats.mode,
            l1_entries: stats.l1_entries,
            redis_available: backend.is_redis_available().await,
        },
    };

    let status = if reachable {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

/// Prometheus text exposition.
pub async fn metrics() -> impl IntoResponse {
    match crate::metrics::render_metrics() {
        Some(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "metrics not initialized").into_response(),
    }
}
