use crate::handlers::ensure_provider_configured;
use crate::models::ModelsResponse;
use crate::services::providers::ModelListing;
use crate::AppState;
use axum::{extract::State, Json};
use service_core::error::AppError;
use service_core::middleware::client_ip::ClientIp;

/// Diagnostic listing of models that support text generation.
pub async fn list_models(
    State(state): State<AppState>,
    client_ip: ClientIp,
) -> Result<Json<ModelsResponse>, AppError> {
    ensure_provider_configured(&state)?;

    match state.provider.list_models().await {
        Ok(ModelListing::Available(models)) => {
            tracing::info!(client_ip = %client_ip, count = models.len(), "Listed provider models");
            Ok(Json(ModelsResponse { models }))
        }
        Ok(ModelListing::Unsupported) => {
            tracing::info!(client_ip = %client_ip, "Model listing not supported by provider client");
            Err(AppError::NotImplemented {
                message: "Model listing not supported".to_string(),
                details: Some(
                    "The configured AI provider client cannot enumerate models".to_string(),
                ),
            })
        }
        Err(err) => {
            tracing::error!(
                client_ip = %client_ip,
                category = err.category(),
                error = %err,
                "Failed to list provider models"
            );
            Err(AppError::upstream("Failed to list models", err.to_string()))
        }
    }
}
