use crate::handlers::ensure_provider_configured;
use crate::models::{GenerateResponse, GenerationRequest};
use crate::services::metrics;
use crate::services::providers::ProviderError;
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde_json::Value;
use service_core::error::AppError;
use service_core::middleware::client_ip::ClientIp;
use std::time::Instant;

pub const QUOTA_GUIDANCE: &str = "The AI provider's usage quota or rate limit has been reached. \
     Please wait a minute before trying again, or check the API plan and billing settings.";

/// Relay a prompt to the provider and return its text verbatim.
pub async fn generate(
    State(state): State<AppState>,
    client_ip: ClientIp,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<GenerateResponse>, AppError> {
    ensure_provider_configured(&state)?;

    let Json(body) = payload.map_err(|rejection| {
        tracing::warn!(
            client_ip = %client_ip,
            reason = %rejection.body_text(),
            "Rejected malformed generation request"
        );
        AppError::bad_request("Invalid request body", Some(rejection.body_text()))
    })?;

    let request = GenerationRequest::from_json(&body, state.config.limits.max_prompt_chars)
        .map_err(|e| {
            tracing::warn!(client_ip = %client_ip, reason = %e, "Rejected invalid generation request");
            AppError::from(e)
        })?;

    let started = Instant::now();
    let result = state
        .provider
        .generate(&request.prompt, request.system_instruction.as_deref())
        .await;
    let latency = started.elapsed();

    match result {
        Ok(output) => {
            let output_chars = output.chars().count();
            tracing::info!(
                client_ip = %client_ip,
                model = %state.provider.model(),
                latency_ms = latency.as_millis() as u64,
                prompt_chars = request.prompt_chars(),
                system_instruction_chars = request.system_instruction_chars(),
                output_chars,
                "Generation completed"
            );
            metrics::record_generation("success", latency);
            metrics::record_generated_chars(request.prompt_chars(), output_chars);

            Ok(Json(GenerateResponse { output }))
        }
        Err(err) => {
            tracing::error!(
                client_ip = %client_ip,
                model = %state.provider.model(),
                category = err.category(),
                latency_ms = latency.as_millis() as u64,
                prompt_chars = request.prompt_chars(),
                error = %err,
                "Generation failed"
            );
            metrics::record_generation(err.category(), latency);

            Err(generation_error(err, state.provider.model()))
        }
    }
}

/// Translate a provider failure into what the caller is allowed to see.
fn generation_error(err: ProviderError, model: &str) -> AppError {
    match err {
        ProviderError::QuotaExceeded(_) => AppError::QuotaExceeded(QUOTA_GUIDANCE.to_string()),
        ProviderError::ModelNotFound { .. } => AppError::upstream(
            "Model not found",
            format!(
                "The model '{}' is not available for this API key. Set GEMINI_MODEL to a \
                 supported model; GET /api/models lists the available ones.",
                model
            ),
        ),
        ProviderError::NotConfigured(_) => AppError::config(anyhow::anyhow!(
            "The AI provider API key is not configured on the server"
        )),
        ProviderError::ContentBlocked(reason) => AppError::upstream(
            "Failed to generate content",
            format!("The provider blocked the response ({})", reason),
        ),
        other => AppError::upstream("Failed to generate content", other.to_string()),
    }
}
