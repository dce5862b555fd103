//! Request and response bodies of the relay's HTTP contract.

use crate::services::system::MemoryUsage;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use service_core::error::AppError;
use thiserror::Error;

/// A validated generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub system_instruction: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestValidationError {
    #[error("Request body must be a JSON object")]
    NotAnObject,

    #[error("Prompt is missing, empty or not a string")]
    InvalidPrompt,

    #[error("Prompt exceeds the maximum length of {max} characters")]
    PromptTooLong { max: usize, actual: usize },

    #[error("systemInstruction must be a string")]
    InvalidSystemInstruction,

    #[error("System instruction exceeds the maximum length of {max} characters")]
    SystemInstructionTooLong { max: usize, actual: usize },
}

impl GenerationRequest {
    /// Validate an untyped body. `max_chars` bounds both the prompt and the
    /// system instruction, counted in Unicode scalar values.
    pub fn from_json(body: &Value, max_chars: usize) -> Result<Self, RequestValidationError> {
        let fields = body
            .as_object()
            .ok_or(RequestValidationError::NotAnObject)?;

        let prompt = match fields.get("prompt") {
            Some(Value::String(prompt)) if !prompt.trim().is_empty() => prompt,
            _ => return Err(RequestValidationError::InvalidPrompt),
        };
        let prompt_chars = prompt.chars().count();
        if prompt_chars > max_chars {
            return Err(RequestValidationError::PromptTooLong {
                max: max_chars,
                actual: prompt_chars,
            });
        }

        let system_instruction = match fields.get("systemInstruction") {
            None | Some(Value::Null) => None,
            Some(Value::String(text)) if text.trim().is_empty() => None,
            Some(Value::String(text)) => {
                let chars = text.chars().count();
                if chars > max_chars {
                    return Err(RequestValidationError::SystemInstructionTooLong {
                        max: max_chars,
                        actual: chars,
                    });
                }
                Some(text.clone())
            }
            Some(_) => return Err(RequestValidationError::InvalidSystemInstruction),
        };

        Ok(Self {
            prompt: prompt.clone(),
            system_instruction,
        })
    }

    pub fn prompt_chars(&self) -> usize {
        self.prompt.chars().count()
    }

    pub fn system_instruction_chars(&self) -> usize {
        self.system_instruction
            .as_deref()
            .map_or(0, |s| s.chars().count())
    }
}

impl From<RequestValidationError> for AppError {
    fn from(err: RequestValidationError) -> Self {
        match err {
            RequestValidationError::NotAnObject => {
                AppError::bad_request("Invalid request body", Some(err.to_string()))
            }
            RequestValidationError::InvalidPrompt => AppError::bad_request("Invalid prompt", None),
            RequestValidationError::PromptTooLong { .. } => {
                AppError::bad_request("Invalid prompt", Some(err.to_string()))
            }
            RequestValidationError::InvalidSystemInstruction
            | RequestValidationError::SystemInstructionTooLong { .. } => {
                AppError::bad_request("Invalid system instruction", Some(err.to_string()))
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateResponse {
    pub output: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelsResponse {
    pub models: Vec<String>,
}

/// Whether the provider credential is present in the running configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialStatus {
    Configured,
    Missing,
}

impl From<bool> for CredentialStatus {
    fn from(configured: bool) -> Self {
        if configured {
            CredentialStatus::Configured
        } else {
            CredentialStatus::Missing
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlatformInfo {
    pub os: &'static str,
    pub arch: &'static str,
    pub family: &'static str,
}

impl PlatformInfo {
    pub fn current() -> Self {
        Self {
            os: std::env::consts::OS,
            arch: std::env::consts::ARCH,
            family: std::env::consts::FAMILY,
        }
    }
}

/// Point-in-time process status served by `GET /health`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthSnapshot {
    pub status: &'static str,
    pub service: String,
    pub version: String,
    pub environment: &'static str,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "uptime")]
    pub uptime_seconds: f64,
    pub memory: MemoryUsage,
    pub api_key: CredentialStatus,
    pub model: String,
    pub platform: PlatformInfo,
}
