use crate::error::{HealthResponse, UnhealthyResponse};
use crate::routes;
use crate::state::AppState;
use axum::{
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
    Json,
};

/// GET /health handler - Liveness check
///
/// Answers 200 with an empty body without touching the store.
#[utoipa::path(
    get,
    path = routes::HEALTH,
    responses(
        (status = 200, description = "Service is alive")
    ),
    tag = "health"
)]
pub async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, [(header::CONTENT_TYPE, "application/json")])
}

/// GET /health/ready handler - Readiness check
///
/// Round-trips to the store. Returns 200 OK if it is reachable,
/// 503 Service Unavailable otherwise.
#[utoipa::path(
    get,
    path = routes::READY,
    responses(
        (status = 200, description = "Store is reachable", body = HealthResponse),
        (status = 503, description = "Store is unreachable", body = UnhealthyResponse)
    ),
    tag = "health"
)]
pub async fn ready_handler(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<HealthResponse>), (StatusCode, Json<UnhealthyResponse>)> {
    match state.store.health_check().await {
        Ok(()) => {
            tracing::debug!("Readiness check passed");
            Ok((
                StatusCode::OK,
                Json(HealthResponse {
                    status: "healthy".to_string(),
                }),
            ))
        }
        Err(e) => {
            tracing::error!("Readiness check failed: {:#}", e);
            Err((
                StatusCode::SERVICE_UNAVAILABLE,
                Json(UnhealthyResponse {
                    status: "unhealthy".to_string(),
                    error: "Cannot reach the product store".to_string(),
                }),
            ))
        }
    }
}
