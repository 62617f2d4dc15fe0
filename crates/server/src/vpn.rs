//! VPN credential provisioning.
//!
//! Credentials are cached in the metadata store per provider and refreshed
//! from the provider's API once they are older than the configured interval.

use crate::error::{ApiError, ApiResult};
use crate::metrics::VPN_UPSTREAM_REFRESHES;
use async_trait::async_trait;
use msmt_core::VpnCredentials;
use msmt_core::config::VpnConfig;
use msmt_metadata::MetadataStore;
use msmt_metadata::models::VpnConfigRow;
use msmt_metadata::repos::VpnConfigRepo;
use time::OffsetDateTime;
use url::Url;

/// Protocol of every credential set we hand out.
pub const OPENVPN_PROTOCOL: &str = "openvpn";

/// Source of freshly issued VPN credentials.
#[async_trait]
pub trait VpnCertSource: Send + Sync {
    /// Fetch a new credential set for `provider`.
    async fn fetch(&self, provider: &str) -> ApiResult<VpnCredentials>;
}

/// Fetches credentials over HTTP: the CA from one URL and a combined private
/// key + client certificate bundle from another.
pub struct HttpVpnCertSource {
    client: reqwest::Client,
    ca_url: Url,
    cert_url: Url,
}

impl HttpVpnCertSource {
    pub fn new(config: &VpnConfig) -> ApiResult<Self> {
        let parse = |field: &str, raw: &str| {
            Url::parse(raw).map_err(|e| ApiError::Internal(format!("invalid vpn.{field}: {e}")))
        };
        let ca_url = parse("ca_url", &config.ca_url)?;
        let cert_url = parse("cert_url", &config.cert_url)?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ApiError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            ca_url,
            cert_url,
        })
    }

    async fn get_text(&self, url: &Url) -> ApiResult<String> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| ApiError::Upstream(format!("GET {url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Upstream(format!("GET {url}: HTTP {status}")));
        }

        response
            .text()
            .await
            .map_err(|e| ApiError::Upstream(format!("GET {url}: {e}")))
    }
}

#[async_trait]
impl VpnCertSource for HttpVpnCertSource {
    async fn fetch(&self, provider: &str) -> ApiResult<VpnCredentials> {
        tracing::info!(provider, "Fetching VPN credentials from upstream");
        let ca = self.get_text(&self.ca_url).await?;
        let bundle = self.get_text(&self.cert_url).await?;
        Ok(VpnCredentials::from_bundle(&ca, &bundle)?)
    }
}

/// Return stored credentials for `provider`, refreshing them from `source`
/// when missing or stale.
///
/// Two concurrent refreshes both hit upstream; the upsert keeps a single row.
pub async fn get_or_refresh(
    metadata: &dyn MetadataStore,
    source: &dyn VpnCertSource,
    config: &VpnConfig,
    provider: &str,
    now: OffsetDateTime,
) -> ApiResult<VpnConfigRow> {
    let existing = metadata.get_vpn_config(provider).await?;
    let fresh_after = now - config.refresh_interval();

    if let Some(row) = &existing {
        if row.date_updated > fresh_after {
            return Ok(row.clone());
        }
        tracing::debug!(
            provider,
            date_updated = %row.date_updated,
            "Stored VPN credentials are stale"
        );
    }

    let credentials = match source.fetch(provider).await {
        Ok(credentials) => {
            VPN_UPSTREAM_REFRESHES
                .with_label_values(&[provider, "ok"])
                .inc();
            credentials
        }
        Err(e) => {
            VPN_UPSTREAM_REFRESHES
                .with_label_values(&[provider, "error"])
                .inc();
            return Err(e);
        }
    };

    let row = VpnConfigRow {
        provider: provider.to_string(),
        protocol: OPENVPN_PROTOCOL.to_string(),
        openvpn_ca: credentials.ca,
        openvpn_cert: credentials.cert,
        openvpn_key: credentials.key,
        date_created: existing.map_or(now, |r| r.date_created),
        date_updated: now,
    };
    metadata.upsert_vpn_config(&row).await?;

    tracing::info!(provider, "Stored refreshed VPN credentials");
    Ok(row)
}
