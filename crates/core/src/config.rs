//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Public base URL used to build `next_url`, `download_url` and
    /// `measurement_url` links.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Added to `report_no` to produce the public report index.
    #[serde(default)]
    pub report_index_offset: i64,
    /// Content type of raw measurement bodies.
    #[serde(default = "default_raw_content_type")]
    pub raw_content_type: String,
    /// Page size when the client does not pass `limit`.
    #[serde(default = "default_limit")]
    pub default_limit: u32,
    /// Largest `limit` a client may request.
    #[serde(default = "default_max_limit")]
    pub max_limit: u32,
    /// Enable the /metrics endpoint for Prometheus scraping (default: true).
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_base_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_raw_content_type() -> String {
    "application/json".to_string()
}

fn default_limit() -> u32 {
    crate::DEFAULT_LIMIT
}

fn default_max_limit() -> u32 {
    crate::MAX_LIMIT
}

fn default_metrics_enabled() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            base_url: default_base_url(),
            report_index_offset: 0,
            raw_content_type: default_raw_content_type(),
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            metrics_enabled: default_metrics_enabled(),
        }
    }
}

impl ServerConfig {
    /// Validate server configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        Url::parse(&self.base_url)
            .map_err(|e| format!("server.base_url '{}' is not a valid URL: {e}", self.base_url))?;

        if self.default_limit == 0 {
            return Err("server.default_limit must be > 0".to_string());
        }
        if self.default_limit > self.max_limit {
            return Err(format!(
                "server.default_limit ({}) exceeds server.max_limit ({})",
                self.default_limit, self.max_limit
            ));
        }
        if self.report_index_offset < 0 {
            return Err("server.report_index_offset cannot be negative".to_string());
        }
        Ok(())
    }
}

/// PostgreSQL SSL mode configuration.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PgSslMode {
    /// Disable SSL/TLS entirely.
    Disable,
    /// Prefer SSL/TLS but allow unencrypted connections (default).
    #[default]
    Prefer,
    /// Require SSL/TLS for all connections.
    Require,
}

/// Metadata store configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MetadataConfig {
    /// SQLite database (testing and local development).
    Sqlite {
        /// Database file path.
        path: PathBuf,
    },
    /// PostgreSQL database.
    Postgres {
        /// Connection URL. Takes precedence over individual fields.
        url: Option<String>,
        /// Database host.
        host: Option<String>,
        /// Database port (default: 5432).
        #[serde(default = "default_pg_port")]
        port: Option<u16>,
        /// Database username.
        username: Option<String>,
        /// Database password.
        /// WARNING: Prefer MSMT_METADATA__PASSWORD env var over storing in config.
        password: Option<String>,
        /// Database name.
        database: Option<String>,
        /// SSL mode for connections.
        ssl_mode: Option<PgSslMode>,
        /// Maximum connections in the pool.
        #[serde(default = "default_max_connections")]
        max_connections: u32,
        /// Statement timeout in milliseconds.
        #[serde(default = "default_statement_timeout_ms")]
        statement_timeout_ms: Option<u64>,
    },
}

fn default_max_connections() -> u32 {
    10
}

fn default_pg_port() -> Option<u16> {
    Some(5432)
}

fn default_statement_timeout_ms() -> Option<u64> {
    Some(60_000)
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self::Sqlite {
            path: PathBuf::from("./data/metadata.db"),
        }
    }
}

impl MetadataConfig {
    /// Validate metadata configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            MetadataConfig::Sqlite { .. } => Ok(()),
            MetadataConfig::Postgres {
                url,
                host,
                database,
                ..
            } => match (url.as_ref(), host.as_ref(), database.as_ref()) {
                (Some(_), _, _) => Ok(()),
                (None, Some(_), Some(_)) => Ok(()),
                (None, None, _) => Err(
                    "postgres config requires either 'url' or 'host' + 'database'".to_string(),
                ),
                (None, Some(_), None) => Err(
                    "postgres config requires 'database' when using individual fields".to_string(),
                ),
            },
        }
    }
}

/// Where archive files are read from.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ArchiveStoreConfig {
    /// HTTP server supporting `Range` requests.
    Http {
        /// Base URL that archive filenames are joined onto.
        base_url: String,
        /// Per-request timeout in seconds.
        #[serde(default = "default_archive_timeout_secs")]
        timeout_secs: u64,
    },
    /// Local directory holding archive files.
    Filesystem {
        /// Root directory.
        path: PathBuf,
    },
}

fn default_archive_timeout_secs() -> u64 {
    30
}

impl Default for ArchiveStoreConfig {
    fn default() -> Self {
        Self::Filesystem {
            path: PathBuf::from("./data/autoclaved"),
        }
    }
}

/// Archive access configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Backend holding the archive files.
    #[serde(default)]
    pub store: ArchiveStoreConfig,
    /// Largest compressed frame the extractor will fetch and buffer.
    #[serde(default = "default_max_frame_size")]
    pub max_frame_size: u64,
}

fn default_max_frame_size() -> u64 {
    crate::DEFAULT_MAX_FRAME_SIZE
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            store: ArchiveStoreConfig::default(),
            max_frame_size: default_max_frame_size(),
        }
    }
}

impl ArchiveConfig {
    /// Validate archive configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_frame_size == 0 {
            return Err("archive.max_frame_size must be > 0".to_string());
        }
        match &self.store {
            ArchiveStoreConfig::Http {
                base_url,
                timeout_secs,
            } => {
                Url::parse(base_url).map_err(|e| {
                    format!("archive.store.base_url '{base_url}' is not a valid URL: {e}")
                })?;
                if *timeout_secs == 0 {
                    return Err("archive.store.timeout_secs must be > 0".to_string());
                }
                Ok(())
            }
            ArchiveStoreConfig::Filesystem { .. } => Ok(()),
        }
    }
}

/// VPN provisioning configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VpnConfig {
    /// Providers this deployment serves configuration for.
    #[serde(default = "default_vpn_providers")]
    pub providers: Vec<String>,
    /// URL of the provider CA certificate.
    #[serde(default = "default_vpn_ca_url")]
    pub ca_url: String,
    /// URL returning a client private key followed by its certificate.
    #[serde(default = "default_vpn_cert_url")]
    pub cert_url: String,
    /// Stored credentials older than this are refreshed from upstream.
    #[serde(default = "default_vpn_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    /// Per-request timeout for upstream fetches.
    #[serde(default = "default_vpn_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_vpn_providers() -> Vec<String> {
    vec!["riseupvpn".to_string()]
}

fn default_vpn_ca_url() -> String {
    "https://api.black.riseup.net/ca.crt".to_string()
}

fn default_vpn_cert_url() -> String {
    "https://api.black.riseup.net/3/cert".to_string()
}

fn default_vpn_refresh_interval_secs() -> u64 {
    7 * 24 * 60 * 60
}

fn default_vpn_timeout_secs() -> u64 {
    30
}

impl Default for VpnConfig {
    fn default() -> Self {
        Self {
            providers: default_vpn_providers(),
            ca_url: default_vpn_ca_url(),
            cert_url: default_vpn_cert_url(),
            refresh_interval_secs: default_vpn_refresh_interval_secs(),
            timeout_secs: default_vpn_timeout_secs(),
        }
    }
}

impl VpnConfig {
    /// How long stored credentials stay fresh.
    pub fn refresh_interval(&self) -> time::Duration {
        let secs = i64::try_from(self.refresh_interval_secs).unwrap_or(i64::MAX);
        time::Duration::seconds(secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn serves(&self, provider: &str) -> bool {
        self.providers.iter().any(|p| p == provider)
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Metadata store configuration.
    #[serde(default)]
    pub metadata: MetadataConfig,
    /// Archive store configuration.
    #[serde(default)]
    pub archive: ArchiveConfig,
    /// VPN provisioning configuration.
    #[serde(default)]
    pub vpn: VpnConfig,
}

impl AppConfig {
    /// Create a test configuration with sensible defaults.
    ///
    /// **For testing only.** Uses SQLite metadata and filesystem archives
    /// under `./data`.
    pub fn for_testing() -> Self {
        Self::default()
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<(), String> {
        self.server.validate()?;
        self.metadata.validate()?;
        self.archive.validate()
    }
}
