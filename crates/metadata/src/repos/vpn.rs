//! VPN configuration repository.

use crate::error::MetadataResult;
use crate::models::VpnConfigRow;
use async_trait::async_trait;

/// Repository for cached VPN provider credentials.
#[async_trait]
pub trait VpnConfigRepo: Send + Sync {
    /// Get the stored credentials for `provider`.
    async fn get_vpn_config(&self, provider: &str) -> MetadataResult<Option<VpnConfigRow>>;

    /// Insert credentials for a new provider or replace them for a known one.
    ///
    /// `date_created` is kept from the existing row on update.
    async fn upsert_vpn_config(&self, row: &VpnConfigRow) -> MetadataResult<()>;
}
