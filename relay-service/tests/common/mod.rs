//! Shared setup for relay-service integration tests.
//!
//! Routers are driven in-process with `tower::ServiceExt::oneshot` against a
//! mock provider and a manually advanced rate-limit clock.

#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    extract::ConnectInfo,
    http::{header, Request, Response},
    Router,
};
use relay_service::{
    build_router,
    config::{Environment, RelayConfig},
    services::providers::mock::MockTextProvider,
    AppState, RateLimiters,
};
use secrecy::Secret;
use serde_json::Value;
use service_core::governor::clock::FakeRelativeClock;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

pub const TEST_API_KEY: &str = "test-gemini-key";
pub const TEST_CLIENT_IP: IpAddr = IpAddr::V4(Ipv4Addr::new(203, 0, 113, 7));

/// Configuration with a credential present and test-friendly limits.
pub fn test_config() -> RelayConfig {
    let mut config = RelayConfig::default();
    config.environment = Environment::Test;
    config.log_level = "error".to_string();
    config.gemini.api_key = Some(Secret::new(TEST_API_KEY.to_string()));
    config.gemini.model = "gemini-test-model".to_string();
    config
}

/// Configuration without a provider credential.
pub fn unconfigured_config() -> RelayConfig {
    let mut config = test_config();
    config.gemini.api_key = None;
    config
}

pub struct TestApp {
    pub router: Router,
    pub provider: Arc<MockTextProvider>,
    pub clock: FakeRelativeClock,
    pub limiters: RateLimiters<FakeRelativeClock>,
}

impl TestApp {
    pub fn new(provider: MockTextProvider) -> Self {
        Self::with_config(test_config(), provider)
    }

    pub fn with_config(config: RelayConfig, provider: MockTextProvider) -> Self {
        let provider = Arc::new(provider);
        let clock = FakeRelativeClock::default();
        let limiters = RateLimiters::with_clock(&config.rate_limit, clock.clone())
            .expect("Failed to build rate limiters");
        let state = AppState::new(config, provider.clone());
        let router = build_router(state, limiters.clone());

        Self {
            router,
            provider,
            clock,
            limiters,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        use tower::util::ServiceExt;

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("Router failed to respond")
    }

    pub async fn generate(&self, body: Value) -> Response<Body> {
        self.send(generate_request(TEST_CLIENT_IP, body.to_string()))
            .await
    }

    pub async fn generate_from(&self, ip: IpAddr, body: Value) -> Response<Body> {
        self.send(generate_request(ip, body.to_string())).await
    }

    pub async fn get(&self, path: &str) -> Response<Body> {
        self.send(get_request(TEST_CLIENT_IP, path)).await
    }

    pub async fn get_from(&self, ip: IpAddr, path: &str) -> Response<Body> {
        self.send(get_request(ip, path)).await
    }
}

fn with_peer(mut request: Request<Body>, ip: IpAddr) -> Request<Body> {
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::new(ip, 40_000)));
    request
}

pub fn generate_request(ip: IpAddr, body: impl Into<Body>) -> Request<Body> {
    let request = Request::builder()
        .method("POST")
        .uri("/api/generate")
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .expect("Failed to build request");
    with_peer(request, ip)
}

pub fn get_request(ip: IpAddr, path: &str) -> Request<Body> {
    let request = Request::builder()
        .method("GET")
        .uri(path)
        .body(Body::empty())
        .expect("Failed to build request");
    with_peer(request, ip)
}

pub async fn read_json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&bytes).expect("Response body is not JSON")
}

pub async fn read_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    String::from_utf8(bytes.to_vec()).expect("Response body is not UTF-8")
}
