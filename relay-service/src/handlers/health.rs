use crate::models::{CredentialStatus, HealthSnapshot, PlatformInfo};
use crate::services::system;
use crate::AppState;
use axum::{extract::State, Json};
use chrono::Utc;

pub const LIVENESS_MESSAGE: &str = "Restored OS relay is running";

/// Plain-text liveness probe.
pub async fn liveness() -> &'static str {
    LIVENESS_MESSAGE
}

/// Detailed process snapshot. Reads only; regenerated on every call.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthSnapshot> {
    Json(HealthSnapshot {
        status: "ok",
        service: state.config.service_name.clone(),
        version: state.config.service_version.clone(),
        environment: state.config.environment.as_str(),
        timestamp: Utc::now(),
        uptime_seconds: state.started_at.elapsed().as_secs_f64(),
        memory: system::memory_usage(),
        api_key: CredentialStatus::from(state.config.gemini.is_configured()),
        model: state.config.model().to_string(),
        platform: PlatformInfo::current(),
    })
}
