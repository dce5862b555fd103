//! service-core: Shared infrastructure for the relay services.
pub mod config;
pub mod error;
pub mod middleware;
pub mod observability;

pub use axum;
pub use governor;
pub use serde_json;
pub use tokio;
pub use tracing;
