//! HTTP API server for network measurement data.
//!
//! This crate provides:
//! - Report file and measurement listings with offset pagination
//! - Raw measurement retrieval from range-addressed LZ4 archives
//! - Cached VPN credentials for probes
//! - Health, version and Prometheus endpoints

pub mod error;
pub mod extractor;
pub mod handlers;
pub mod metrics;
pub mod routes;
pub mod state;
pub mod vpn;

pub use error::ApiError;
pub use extractor::RecordExtractor;
pub use routes::create_router;
pub use state::AppState;
pub use vpn::{HttpVpnCertSource, VpnCertSource};
