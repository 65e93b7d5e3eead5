pub mod api;
pub mod config;
pub mod error;
pub mod host;
pub mod store;
pub mod telemetry;
