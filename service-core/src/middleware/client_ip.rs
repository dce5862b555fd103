//! Caller address resolution shared by rate limiting and request logging.

use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts, Request, State},
    http::{Extensions, HeaderMap, request::Parts},
    middleware::Next,
    response::Response,
};
use std::{
    convert::Infallible,
    fmt,
    net::{IpAddr, SocketAddr},
};

pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Resolved caller address; `None` when neither the socket nor a trusted
/// proxy header identified it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIp(pub Option<IpAddr>);

impl fmt::Display for ClientIp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(ip) => write!(f, "{}", ip),
            None => f.write_str("unknown"),
        }
    }
}

/// Where the caller address is taken from.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClientIpSource {
    /// Honour the first `X-Forwarded-For` hop. Only safe behind a proxy
    /// that overwrites the header.
    pub trust_forwarded_for: bool,
}

pub fn resolve_client_ip(
    headers: &HeaderMap,
    extensions: &Extensions,
    trust_forwarded_for: bool,
) -> Option<IpAddr> {
    let forwarded_ip = if trust_forwarded_for {
        headers
            .get(FORWARDED_FOR_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
    } else {
        None
    };

    forwarded_ip.or_else(|| {
        extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
    })
}

/// Resolves the caller once per request and stores it as a [`ClientIp`]
/// extension for the layers and handlers below.
pub async fn client_ip_middleware(
    State(source): State<ClientIpSource>,
    mut request: Request,
    next: Next,
) -> Response {
    let ip = resolve_client_ip(
        request.headers(),
        request.extensions(),
        source.trust_forwarded_for,
    );
    request.extensions_mut().insert(ClientIp(ip));
    next.run(request).await
}

#[async_trait]
impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(resolved) = parts.extensions.get::<ClientIp>() {
            return Ok(*resolved);
        }
        Ok(ClientIp(resolve_client_ip(
            &parts.headers,
            &parts.extensions,
            false,
        )))
    }
}
