//! AI provider abstractions and implementations.
//!
//! The relay only needs two things from a provider: turn a prompt into
//! text, and optionally enumerate the models it can generate with.

pub mod gemini;
pub mod mock;

use async_trait::async_trait;
use thiserror::Error;

/// Error type for provider operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Model '{model}' not found: {message}")]
    ModelNotFound { model: String, message: String },

    #[error("Content blocked: {0}")]
    ContentBlocked(String),

    #[error("Provider returned no candidates")]
    EmptyResponse,

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Stable label for logs and metrics.
    pub fn category(&self) -> &'static str {
        match self {
            ProviderError::NotConfigured(_) => "not_configured",
            ProviderError::QuotaExceeded(_) => "quota_exceeded",
            ProviderError::ModelNotFound { .. } => "model_not_found",
            ProviderError::ContentBlocked(_) => "content_blocked",
            ProviderError::EmptyResponse => "empty_response",
            ProviderError::Api { .. } => "api_error",
            ProviderError::Network(_) => "network_error",
            ProviderError::InvalidResponse(_) => "invalid_response",
        }
    }
}

/// Outcome of asking a provider for its model catalogue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelListing {
    /// Names of models that support text generation.
    Available(Vec<String>),
    /// The provider client has no listing capability.
    Unsupported,
}

/// Trait for text generation providers (e.g., Gemini).
#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Generate text for `prompt`, optionally steered by a system instruction.
    async fn generate(
        &self,
        prompt: &str,
        system_instruction: Option<&str>,
    ) -> Result<String, ProviderError>;

    /// List models usable for generation.
    async fn list_models(&self) -> Result<ModelListing, ProviderError> {
        Ok(ModelListing::Unsupported)
    }

    /// Model that `generate` targets.
    fn model(&self) -> &str;
}
