//! Archive file access for the measurement data API.
//!
//! Archive files are concatenations of independently compressed LZ4 frames.
//! This crate only fetches byte ranges; decoding lives in `msmt_core::frame`.
//! Backends: HTTP (range requests) and local filesystem.

pub mod backends;
pub mod error;
pub mod traits;

pub use backends::{filesystem::FilesystemBackend, http::HttpBackend};
pub use error::{ArchiveError, ArchiveResult};
pub use traits::ArchiveStore;

use msmt_core::config::{ArchiveConfig, ArchiveStoreConfig};
use std::sync::Arc;
use std::time::Duration;

/// Create an archive store from configuration.
pub async fn from_config(config: &ArchiveConfig) -> ArchiveResult<Arc<dyn ArchiveStore>> {
    config.validate().map_err(ArchiveError::Config)?;

    match &config.store {
        ArchiveStoreConfig::Http {
            base_url,
            timeout_secs,
        } => {
            let backend = HttpBackend::new(
                base_url,
                Duration::from_secs(*timeout_secs),
                config.max_frame_size,
            )?;
            tracing::info!(base_url = %base_url, "Using HTTP archive store");
            Ok(Arc::new(backend))
        }
        ArchiveStoreConfig::Filesystem { path } => {
            let backend = FilesystemBackend::new(path, config.max_frame_size).await?;
            tracing::info!(path = %path.display(), "Using filesystem archive store");
            Ok(Arc::new(backend))
        }
    }
}
