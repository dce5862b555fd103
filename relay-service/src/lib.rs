pub mod config;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{any, get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use service_core::error::AppError;
use service_core::governor::clock::{Clock, DefaultClock};
use service_core::middleware::{
    client_ip::{client_ip_middleware, ClientIpSource},
    metrics::metrics_middleware,
    rate_limit::{ip_rate_limit_middleware, IpRateLimiter},
    tracing::{request_id_middleware, REQUEST_ID_HEADER},
};
use std::sync::Arc;
use std::time::Instant;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::config::{RateLimitConfig, RelayConfig};
use crate::services::providers::TextProvider;

pub const API_RATE_LIMIT_MESSAGE: &str =
    "Too many requests from this IP, please try again later.";
pub const GENERATION_RATE_LIMIT_MESSAGE: &str =
    "Too many AI generation requests from this IP, please slow down and try again shortly.";

/// Process-scoped state shared by the handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: RelayConfig,
    pub provider: Arc<dyn TextProvider>,
    pub started_at: Instant,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(config: RelayConfig, provider: Arc<dyn TextProvider>) -> Self {
        Self {
            config,
            provider,
            started_at: Instant::now(),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// The two independent per-IP windows.
pub struct RateLimiters<C: Clock = DefaultClock> {
    /// Every `/api/*` request.
    pub api: Arc<IpRateLimiter<C>>,
    /// `POST /api/generate` only.
    pub generation: Arc<IpRateLimiter<C>>,
}

impl<C: Clock> Clone for RateLimiters<C> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            generation: Arc::clone(&self.generation),
        }
    }
}

impl RateLimiters<DefaultClock> {
    pub fn new(config: &RateLimitConfig) -> Result<Self, AppError> {
        Self::with_clock(config, DefaultClock::default())
    }
}

impl<C: Clock> RateLimiters<C> {
    pub fn with_clock(config: &RateLimitConfig, clock: C) -> Result<Self, AppError> {
        Ok(Self {
            api: Arc::new(IpRateLimiter::with_clock(
                "api",
                config.api,
                API_RATE_LIMIT_MESSAGE,
                clock.clone(),
            )?),
            generation: Arc::new(IpRateLimiter::with_clock(
                "generation",
                config.generation,
                GENERATION_RATE_LIMIT_MESSAGE,
                clock,
            )?),
        })
    }

    /// Forget callers whose windows have fully elapsed.
    pub fn retain_recent(&self) {
        self.api.retain_recent();
        self.generation.retain_recent();
    }
}

pub fn build_router<C>(state: AppState, limiters: RateLimiters<C>) -> Router
where
    C: Clock + Send + Sync + 'static,
{
    let generate_route: Router<AppState> = Router::new()
        .route("/api/generate", post(handlers::generate::generate))
        .layer(from_fn_with_state(
            limiters.generation.clone(),
            ip_rate_limit_middleware::<C>,
        ));

    let api_routes: Router<AppState> = Router::new()
        .merge(generate_route)
        .route("/api/models", get(handlers::models::list_models))
        // Unknown API paths still count against the api window.
        .route("/api/*rest", any(handlers::not_found))
        .layer(from_fn_with_state(
            limiters.api.clone(),
            ip_rate_limit_middleware::<C>,
        ));

    let ip_source = ClientIpSource {
        trust_forwarded_for: state.config.rate_limit.trust_proxy,
    };
    let cors = cors_layer(&state.config);
    let max_body_bytes = state.config.limits.max_body_bytes;

    Router::new()
        .route("/", get(handlers::health::liveness))
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics::metrics))
        .merge(api_routes)
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            },
        ))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn_with_state(ip_source, client_ip_middleware))
        .layer(cors)
}

fn cors_layer(config: &RelayConfig) -> CorsLayer {
    let origins = &config.security.allowed_origins;
    let allow_origin = if origins.is_empty() || origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins.iter().filter_map(|o| {
            o.parse::<HeaderValue>()
                .map_err(|e| tracing::error!("Invalid CORS origin '{}': {}. Skipping.", o, e))
                .ok()
        }))
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
        .expose_headers([
            HeaderName::from_static(REQUEST_ID_HEADER),
            header::RETRY_AFTER,
        ])
}
