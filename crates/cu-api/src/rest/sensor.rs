use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use cu_usage::{RefreshOutcome, SensorSnapshot};
use serde::Serialize;

use crate::error::{ApiError, ApiErrorResponse};
use crate::state::AppState;

#[derive(Serialize)]
pub struct RefreshResponse {
    #[serde(flatten)]
    pub outcome: RefreshOutcome,
    pub success: bool,
    pub snapshot: SensorSnapshot,
}

pub async fn snapshot(State(state): State<AppState>) -> Json<SensorSnapshot> {
    Json(state.fetcher.snapshot())
}

pub async fn refresh(
    State(state): State<AppState>,
) -> Result<Json<RefreshResponse>, ApiErrorResponse> {
    tracing::info!(sensor = %state.fetcher.name(), "manual refresh requested");
    let outcome = state.fetcher.refresh_forced().await;
    let snapshot = state.fetcher.snapshot();

    if outcome == RefreshOutcome::Failed {
        let (code, message) = match &snapshot.last_error {
            Some(err) => (err.code, err.message.clone()),
            None => ("USAGE_REFRESH_FAILED", "refresh failed".to_string()),
        };
        let details = serde_json::to_value(&snapshot).unwrap_or_default();
        return Err(ApiErrorResponse {
            status: StatusCode::BAD_GATEWAY,
            error: ApiError::upstream(code, message).with_details(details),
        });
    }

    Ok(Json(RefreshResponse {
        success: outcome.is_success(),
        outcome,
        snapshot,
    }))
}
