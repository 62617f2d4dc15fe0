//! Measurement API server binary.

use anyhow::{Context, Result};
use clap::Parser;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use msmt_core::config::AppConfig;
use msmt_server::{AppState, HttpVpnCertSource, create_router};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Measurement data API server
#[derive(Parser, Debug)]
#[command(name = "msmtd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "MSMT_CONFIG", default_value = "config/server.toml")]
    config: String,
}

/// Load configuration from an optional TOML file overlaid with `MSMT_*`
/// environment variables.
fn load_config(path: &str) -> Result<AppConfig> {
    let mut figment = Figment::new();

    if std::path::Path::new(path).exists() {
        tracing::info!(config_path = %path, "Loading configuration from file");
        figment = figment.merge(Toml::file(path));
    } else {
        tracing::info!(
            config_path = %path,
            "No config file found, using defaults and environment variables"
        );
    }

    let config: AppConfig = figment
        .merge(Env::prefixed("MSMT_").ignore(&["CONFIG"]).split("__"))
        .extract()
        .context("failed to load configuration")?;

    config
        .validate()
        .map_err(|e| anyhow::anyhow!(e))
        .context("invalid configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("msmtd v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args.config)?;

    msmt_server::metrics::register_metrics();
    tracing::info!("Prometheus metrics registered");

    let metadata = msmt_metadata::from_config(&config.metadata)
        .await
        .context("failed to initialize metadata store")?;
    metadata
        .health_check()
        .await
        .context("metadata store health check failed")?;
    tracing::info!("Metadata store initialized");

    let archive = msmt_archive::from_config(&config.archive)
        .await
        .context("failed to initialize archive store")?;
    archive
        .health_check()
        .await
        .context("archive store health check failed")?;
    tracing::info!(backend = archive.backend_name(), "Archive store initialized");

    let vpn_source = HttpVpnCertSource::new(&config.vpn)
        .map_err(|e| anyhow::anyhow!(e.to_string()))
        .context("failed to initialize VPN credential source")?;

    let state = AppState::new(config.clone(), metadata, archive, Arc::new(vpn_source));
    let app = create_router(state);

    let addr: SocketAddr = config.server.bind.parse().context("invalid bind address")?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use msmt_core::config::{ArchiveStoreConfig, MetadataConfig};

    #[test]
    fn load_config_from_file() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("server.toml");
        std::fs::write(
            &path,
            r#"
[server]
bind = "0.0.0.0:9000"
base_url = "https://api.example.org"
report_index_offset = 3000000

[metadata]
type = "sqlite"
path = "/var/lib/msmt/metadata.db"

[archive]
max_frame_size = 1048576

[archive.store]
type = "http"
base_url = "https://s3.example.org/autoclaved/"

[vpn]
providers = ["riseupvpn"]
"#,
        )
        .unwrap();

        let config = load_config(path.to_str().unwrap()).unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:9000");
        assert_eq!(config.server.report_index_offset, 3_000_000);
        assert!(matches!(config.metadata, MetadataConfig::Sqlite { .. }));
        assert!(matches!(config.archive.store, ArchiveStoreConfig::Http { .. }));
        assert_eq!(config.archive.max_frame_size, 1_048_576);
    }

    #[test]
    fn load_config_rejects_invalid_values() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("server.toml");
        std::fs::write(&path, "[server]\nbase_url = \"not a url\"\n").unwrap();
        assert!(load_config(path.to_str().unwrap()).is_err());
    }
}
