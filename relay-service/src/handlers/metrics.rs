use crate::AppState;
use axum::extract::State;
use service_core::error::AppError;

/// Prometheus exposition; only available when the binary installed a recorder.
pub async fn metrics(State(state): State<AppState>) -> Result<String, AppError> {
    state
        .metrics
        .as_ref()
        .map(|handle| handle.render())
        .ok_or_else(|| AppError::NotFound("/metrics".to_string()))
}
