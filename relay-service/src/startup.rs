//! Application startup and lifecycle management.

use crate::config::RelayConfig;
use crate::services::providers::gemini::{GeminiConfig, GeminiTextProvider};
use crate::services::providers::TextProvider;
use crate::{build_router, AppState, RateLimiters};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use service_core::error::AppError;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;

/// How often idle rate-limit keys are purged and histograms rolled over.
const HOUSEKEEPING_INTERVAL: Duration = Duration::from_secs(60);

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
    limiters: RateLimiters,
    metrics: Option<PrometheusHandle>,
}

impl Application {
    /// Build the application with the Gemini provider.
    pub async fn build(
        config: RelayConfig,
        metrics: Option<PrometheusHandle>,
    ) -> Result<Self, AppError> {
        let provider = GeminiTextProvider::new(GeminiConfig::from(&config.gemini)).map_err(|e| {
            tracing::error!("Failed to initialize Gemini provider: {}", e);
            AppError::InternalError(anyhow::anyhow!("Failed to initialize Gemini provider: {}", e))
        })?;

        if config.gemini.is_configured() {
            tracing::info!(model = %config.model(), "Initialized Gemini text provider");
        } else {
            tracing::warn!(
                model = %config.model(),
                "GEMINI_API_KEY is not set; generation requests will fail until it is configured"
            );
        }

        Self::build_with_provider(config, Arc::new(provider), metrics).await
    }

    /// Build the application around an already constructed provider.
    pub async fn build_with_provider(
        config: RelayConfig,
        provider: Arc<dyn TextProvider>,
        metrics: Option<PrometheusHandle>,
    ) -> Result<Self, AppError> {
        let limiters = RateLimiters::new(&config.rate_limit)?;

        // Port 0 = random port for testing
        let addr = config.common.bind_address();
        let listener = TcpListener::bind(&addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(
            port,
            environment = %config.environment,
            api_limit = config.rate_limit.api.max_requests,
            api_window_secs = config.rate_limit.api.window.as_secs(),
            generation_limit = config.rate_limit.generation.max_requests,
            generation_window_secs = config.rate_limit.generation.window.as_secs(),
            "Relay listening"
        );

        let mut state = AppState::new(config, provider);
        if let Some(handle) = metrics.clone() {
            state = state.with_metrics(handle);
        }
        let router = build_router(state, limiters.clone());

        Ok(Self {
            port,
            listener,
            router,
            limiters,
            metrics,
        })
    }

    /// Get the HTTP port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Serve until SIGINT/SIGTERM.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let housekeeping = tokio::spawn(housekeeping(self.limiters, self.metrics));

        let result = axum::serve(
            self.listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await;

        housekeeping.abort();

        if let Err(e) = &result {
            tracing::error!("HTTP server error: {}", e);
        }
        result
    }
}

async fn housekeeping(limiters: RateLimiters, metrics: Option<PrometheusHandle>) {
    let mut interval = tokio::time::interval(HOUSEKEEPING_INTERVAL);
    // The first tick completes immediately.
    interval.tick().await;

    loop {
        interval.tick().await;
        limiters.retain_recent();
        if let Some(handle) = &metrics {
            handle.run_upkeep();
        }
        tracing::debug!(
            api_keys = limiters.api.tracked_keys(),
            generation_keys = limiters.generation.tracked_keys(),
            "Rate limiter housekeeping complete"
        );
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
