pub mod metrics;
pub mod providers;
pub mod system;
