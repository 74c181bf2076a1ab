use axum::http::{StatusCode, Uri};
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::error::{ApiError, ApiErrorResponse};
use crate::rest::{health, sensor};
use crate::state::AppState;

async fn not_found(uri: Uri) -> ApiErrorResponse {
    ApiErrorResponse {
        status: StatusCode::NOT_FOUND,
        error: ApiError::not_found(&format!("Route {}", uri.path())),
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/health", get(health::health))
        .route("/api/v1/sensor", get(sensor::snapshot))
        .route("/api/v1/sensor/refresh", post(sensor::refresh))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
