//! Server test utilities.

use super::fixtures::{Dataset, StaticVpnSource, seed_sqlite};
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use bytes::Bytes;
use msmt_archive::{ArchiveStore, FilesystemBackend};
use msmt_core::config::{AppConfig, ArchiveStoreConfig, MetadataConfig};
use msmt_metadata::{MetadataStore, SqliteStore};
use msmt_server::{AppState, VpnCertSource, create_router};
use serde_json::Value;
use sqlx::{Pool, Sqlite};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

/// A test server wrapper with all dependencies.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    pub archive_dir: PathBuf,
    sqlite: Arc<SqliteStore>,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestServer {
    /// Create a test server with default configuration.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test server with custom config modifications.
    pub async fn with_config<F>(modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        Self::build(modifier, Arc::new(StaticVpnSource::default()), None).await
    }

    /// Create a test server with a custom VPN credential source.
    pub async fn with_vpn_source(source: Arc<dyn VpnCertSource>) -> Self {
        Self::build(|_| {}, source, None).await
    }

    /// Create a test server reading archives through `archive` instead of
    /// the temp directory.
    pub async fn with_archive(archive: Arc<dyn ArchiveStore>) -> Self {
        Self::build(|_| {}, Arc::new(StaticVpnSource::default()), Some(archive)).await
    }

    async fn build<F>(
        modifier: F,
        vpn_source: Arc<dyn VpnCertSource>,
        archive: Option<Arc<dyn ArchiveStore>>,
    ) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");

        let archive_dir = temp_dir.path().join("autoclaved");
        std::fs::create_dir_all(&archive_dir).expect("Failed to create archive directory");

        let db_path = temp_dir.path().join("metadata.db");
        let sqlite = Arc::new(
            SqliteStore::new(&db_path)
                .await
                .expect("Failed to create metadata store"),
        );

        let mut config = AppConfig {
            metadata: MetadataConfig::Sqlite { path: db_path },
            ..AppConfig::for_testing()
        };
        config.archive.store = ArchiveStoreConfig::Filesystem {
            path: archive_dir.clone(),
        };
        config.server.base_url = "http://api.test".to_string();
        modifier(&mut config);

        let archive = match archive {
            Some(archive) => archive,
            None => Arc::new(
                FilesystemBackend::new(&archive_dir, config.archive.max_frame_size)
                    .await
                    .expect("Failed to create archive backend"),
            ),
        };

        let metadata: Arc<dyn MetadataStore> = sqlite.clone();
        let state = AppState::new(config, metadata, archive, vpn_source);
        let router = create_router(state.clone());

        Self {
            router,
            state,
            archive_dir,
            sqlite,
            _temp_dir: temp_dir,
        }
    }

    /// SQLite pool for raw queries.
    pub fn pool(&self) -> &Pool<Sqlite> {
        self.sqlite.pool()
    }

    /// Load rows into the metadata database.
    pub async fn seed(&self, data: &Dataset) {
        seed_sqlite(self.pool(), data).await;
    }

    /// Write an archive file below the archive root.
    pub fn write_archive(&self, name: &str, data: &[u8]) {
        let path = self.archive_dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, data).unwrap();
    }

    /// Issue a GET request and return status, headers and raw body.
    pub async fn get_raw(&self, uri: &str) -> (StatusCode, HeaderMap, Bytes) {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, headers, body)
    }

    /// Issue a GET request and parse the body as JSON.
    pub async fn get_json(&self, uri: &str) -> (StatusCode, Value) {
        let (status, _, body) = self.get_raw(uri).await;
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap_or(Value::Null)
        };
        (status, json)
    }
}
