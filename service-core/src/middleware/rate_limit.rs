use crate::error::AppError;
use crate::middleware::client_ip::{ClientIp, resolve_client_ip};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use governor::{
    Quota, RateLimiter,
    clock::{Clock, DefaultClock},
    middleware::NoOpMiddleware,
    state::keyed::DashMapStateStore,
};
use std::{net::IpAddr, num::NonZeroU32, sync::Arc, time::Duration};

/// Threshold and window for one limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub max_requests: u32,
    pub window: Duration,
}

impl RateLimitPolicy {
    pub fn new(max_requests: u32, window_seconds: u64) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(window_seconds),
        }
    }

    /// GCRA quota equivalent to `max_requests` per `window`: the burst is the
    /// whole threshold and one cell is replenished every `window / max`.
    fn quota(&self) -> Result<Quota, AppError> {
        let burst = NonZeroU32::new(self.max_requests).ok_or_else(|| {
            AppError::ConfigError(anyhow::anyhow!("rate limit must allow at least one request"))
        })?;
        let period = self.window / self.max_requests;
        let quota = Quota::with_period(period).ok_or_else(|| {
            AppError::ConfigError(anyhow::anyhow!(
                "rate limit window {:?} is too short for {} requests",
                self.window,
                self.max_requests
            ))
        })?;
        Ok(quota.allow_burst(burst))
    }
}

/// Rate limiter keyed by caller IP, with a fixed rejection message.
pub struct IpRateLimiter<C: Clock = DefaultClock> {
    name: &'static str,
    message: String,
    limiter: RateLimiter<IpAddr, DashMapStateStore<IpAddr>, C, NoOpMiddleware<C::Instant>>,
    clock: C,
}

impl IpRateLimiter<DefaultClock> {
    pub fn new(
        name: &'static str,
        policy: RateLimitPolicy,
        message: impl Into<String>,
    ) -> Result<Self, AppError> {
        Self::with_clock(name, policy, message, DefaultClock::default())
    }
}

impl<C: Clock> IpRateLimiter<C> {
    pub fn with_clock(
        name: &'static str,
        policy: RateLimitPolicy,
        message: impl Into<String>,
        clock: C,
    ) -> Result<Self, AppError> {
        let limiter = RateLimiter::new(policy.quota()?, DashMapStateStore::default(), &clock);
        Ok(Self {
            name,
            message: message.into(),
            limiter,
            clock,
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Records one request for `ip`. On rejection returns how long the
    /// caller has to wait before the next request would be admitted.
    pub fn check(&self, ip: IpAddr) -> Result<(), Duration> {
        self.limiter
            .check_key(&ip)
            .map_err(|negative| negative.wait_time_from(self.clock.now()))
    }

    /// Drops keys whose quota has fully replenished.
    pub fn retain_recent(&self) {
        self.limiter.retain_recent();
    }

    /// Number of callers currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.limiter.len()
    }
}

/// Middleware for IP-based rate limiting
pub async fn ip_rate_limit_middleware<C>(
    State(limiter): State<Arc<IpRateLimiter<C>>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError>
where
    C: Clock + Send + Sync + 'static,
{
    let ip = match request.extensions().get::<ClientIp>() {
        Some(ClientIp(ip)) => *ip,
        None => resolve_client_ip(request.headers(), request.extensions(), false),
    };

    let Some(ip) = ip else {
        tracing::warn!(limiter = limiter.name(), "Could not determine IP for rate limiting");
        return Ok(next.run(request).await);
    };

    if let Err(wait_time) = limiter.check(ip) {
        tracing::warn!(
            limiter = limiter.name(),
            client_ip = %ip,
            retry_after_secs = wait_time.as_secs(),
            "Rate limit exceeded"
        );
        metrics::counter!("rate_limit_rejections_total", "limiter" => limiter.name())
            .increment(1);
        // Round up so clients never retry before the quota has replenished.
        let retry_after = wait_time.as_secs() + u64::from(wait_time.subsec_nanos() > 0);
        return Err(AppError::TooManyRequests(
            limiter.message().to_string(),
            Some(retry_after),
        ));
    }

    Ok(next.run(request).await)
}
