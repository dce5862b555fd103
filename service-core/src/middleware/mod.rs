pub mod client_ip;
pub mod metrics;
pub mod rate_limit;
pub mod tracing;
