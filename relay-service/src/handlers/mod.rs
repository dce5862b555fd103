//! HTTP handlers for the relay.

pub mod generate;
pub mod health;
pub mod metrics;
pub mod models;

use crate::AppState;
use axum::http::Uri;
use service_core::error::AppError;

/// Fail fast when the provider credential is missing from the running
/// configuration, before any input is parsed or the provider is touched.
pub(crate) fn ensure_provider_configured(state: &AppState) -> Result<(), AppError> {
    if state.config.gemini.is_configured() {
        return Ok(());
    }

    tracing::error!("GEMINI_API_KEY is not configured; rejecting provider request");
    Err(AppError::config(anyhow::anyhow!(
        "The AI provider API key is not configured on the server"
    )))
}

/// Fallback for unknown routes.
pub async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(uri.path().to_string())
}
