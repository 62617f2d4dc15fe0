//! Application state shared across handlers.

use crate::vpn::VpnCertSource;
use msmt_archive::ArchiveStore;
use msmt_core::config::AppConfig;
use msmt_metadata::MetadataStore;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Metadata store.
    pub metadata: Arc<dyn MetadataStore>,
    /// Archive store holding the compressed measurement frames.
    pub archive: Arc<dyn ArchiveStore>,
    /// Upstream source of fresh VPN credentials.
    pub vpn_source: Arc<dyn VpnCertSource>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Configuration is expected to be validated already; anything unusual
    /// but legal is logged here.
    pub fn new(
        config: AppConfig,
        metadata: Arc<dyn MetadataStore>,
        archive: Arc<dyn ArchiveStore>,
        vpn_source: Arc<dyn VpnCertSource>,
    ) -> Self {
        if config.vpn.providers.is_empty() {
            tracing::warn!("No VPN providers configured, vpn-config endpoint will always 404");
        }
        if config.archive.max_frame_size > msmt_core::DEFAULT_MAX_FRAME_SIZE {
            tracing::warn!(
                max_frame_size = config.archive.max_frame_size,
                "archive.max_frame_size is above the default, frames are buffered in memory"
            );
        }

        Self {
            config: Arc::new(config),
            metadata,
            archive,
            vpn_source,
        }
    }
}
