//! Prometheus metrics for relay-service.
//!
//! HTTP request metrics come from the shared middleware; this module adds
//! the generation-specific series and owns the exporter handle.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use service_core::error::AppError;
use std::time::Duration;

/// Install the Prometheus recorder. Call once, from the binary.
pub fn init_metrics() -> Result<PrometheusHandle, AppError> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| AppError::InternalError(anyhow::anyhow!("Failed to install Prometheus recorder: {}", e)))
}

/// Record the outcome of one generation call. `outcome` is `success` or a
/// provider error category.
pub fn record_generation(outcome: &'static str, latency: Duration) {
    counter!("genai_requests_total", "outcome" => outcome).increment(1);
    histogram!("genai_provider_latency_seconds", "outcome" => outcome)
        .record(latency.as_secs_f64());
}

pub fn record_generated_chars(prompt_chars: usize, output_chars: usize) {
    counter!("genai_prompt_chars_total").increment(prompt_chars as u64);
    counter!("genai_output_chars_total").increment(output_chars as u64);
}
