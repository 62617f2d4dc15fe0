//! Metadata store trait and SQLite implementation.

use crate::error::MetadataResult;
use crate::repos::{MeasurementRepo, ReportRepo, VpnConfigRepo};
use crate::sql::SqlValue;
use async_trait::async_trait;
use sqlx::query::QueryAs;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Combined metadata store trait.
#[async_trait]
pub trait MetadataStore: ReportRepo + MeasurementRepo + VpnConfigRepo + Send + Sync {
    /// Create any missing tables and indexes.
    async fn migrate(&self) -> MetadataResult<()>;

    /// Check database connectivity and health.
    async fn health_check(&self) -> MetadataResult<()>;
}

/// SQLite-based metadata store.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path` and apply the schema.
    pub async fn new(path: impl AsRef<Path>) -> MetadataResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            // A single connection avoids "database is locked" under concurrent handlers.
            .max_connections(1)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;

        tracing::debug!(path = %path.display(), "Opened SQLite metadata store");
        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

fn bind_values<'q, O>(
    mut query: QueryAs<'q, Sqlite, O, SqliteArguments<'q>>,
    values: &'q [SqlValue],
) -> QueryAs<'q, Sqlite, O, SqliteArguments<'q>> {
    for value in values {
        query = match value {
            SqlValue::Int(v) => query.bind(*v),
            SqlValue::Text(v) => query.bind(v.as_str()),
            SqlValue::Bool(v) => query.bind(*v),
            SqlValue::Timestamp(v) => query.bind(*v),
        };
    }
    query
}

#[async_trait]
impl MetadataStore for SqliteStore {
    async fn migrate(&self) -> MetadataResult<()> {
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    async fn health_check(&self) -> MetadataResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

mod sqlite_impl {
    use super::*;
    use crate::filter::{FileFilter, MeasurementFilter};
    use crate::models::*;
    use crate::sql::{self, Dialect};
    use msmt_core::Pagination;

    #[async_trait]
    impl ReportRepo for SqliteStore {
        async fn list_files(
            &self,
            filter: &FileFilter,
            page: &Pagination,
        ) -> MetadataResult<Vec<FileRow>> {
            let query = sql::list_files(Dialect::Sqlite, filter, page);
            let rows = bind_values(sqlx::query_as::<_, FileRow>(&query.sql), &query.binds)
                .fetch_all(&self.pool)
                .await?;
            Ok(rows)
        }

        async fn count_files(&self, filter: &FileFilter) -> MetadataResult<i64> {
            let query = sql::count_files(Dialect::Sqlite, filter);
            let (count,) = bind_values(sqlx::query_as::<_, (i64,)>(&query.sql), &query.binds)
                .fetch_one(&self.pool)
                .await?;
            Ok(count)
        }
    }

    #[async_trait]
    impl MeasurementRepo for SqliteStore {
        async fn list_measurements(
            &self,
            filter: &MeasurementFilter,
            page: &Pagination,
        ) -> MetadataResult<Vec<MeasurementRow>> {
            let query = sql::list_measurements(Dialect::Sqlite, filter, page);
            let rows = bind_values(sqlx::query_as::<_, MeasurementRow>(&query.sql), &query.binds)
                .fetch_all(&self.pool)
                .await?;
            Ok(rows)
        }

        async fn find_measurement_locations(
            &self,
            measurement_id: &str,
        ) -> MetadataResult<Vec<MeasurementLocationRow>> {
            let query = sql::measurement_locations(Dialect::Sqlite, measurement_id);
            let rows = bind_values(
                sqlx::query_as::<_, MeasurementLocationRow>(&query.sql),
                &query.binds,
            )
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        }
    }

    #[async_trait]
    impl VpnConfigRepo for SqliteStore {
        async fn get_vpn_config(&self, provider: &str) -> MetadataResult<Option<VpnConfigRow>> {
            let row = sqlx::query_as::<_, VpnConfigRow>(
                "SELECT * FROM vpn_configs WHERE provider = ?",
            )
            .bind(provider)
            .fetch_optional(&self.pool)
            .await?;
            Ok(row)
        }

        async fn upsert_vpn_config(&self, row: &VpnConfigRow) -> MetadataResult<()> {
            sqlx::query(
                r#"
                INSERT INTO vpn_configs (
                    provider, protocol, openvpn_ca, openvpn_cert, openvpn_key,
                    date_created, date_updated
                ) VALUES (?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT (provider) DO UPDATE SET
                    protocol = excluded.protocol,
                    openvpn_ca = excluded.openvpn_ca,
                    openvpn_cert = excluded.openvpn_cert,
                    openvpn_key = excluded.openvpn_key,
                    date_updated = excluded.date_updated
                "#,
            )
            .bind(&row.provider)
            .bind(&row.protocol)
            .bind(&row.openvpn_ca)
            .bind(&row.openvpn_cert)
            .bind(&row.openvpn_key)
            .bind(row.date_created)
            .bind(row.date_updated)
            .execute(&self.pool)
            .await?;
            Ok(())
        }
    }
}

/// SQL schema for SQLite.
const SCHEMA_SQL: &str = r#"
-- Archive files holding concatenated LZ4 frames
CREATE TABLE IF NOT EXISTS autoclaved (
    autoclaved_no INTEGER PRIMARY KEY,
    filename TEXT NOT NULL UNIQUE
);

-- One row per report file
CREATE TABLE IF NOT EXISTS reports (
    report_no INTEGER PRIMARY KEY,
    autoclaved_no INTEGER NOT NULL REFERENCES autoclaved(autoclaved_no),
    report_id TEXT NOT NULL,
    textname TEXT NOT NULL,
    test_start_time TEXT NOT NULL,
    probe_cc TEXT NOT NULL,
    probe_asn INTEGER NOT NULL,
    test_name TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_reports_test_start_time ON reports(test_start_time);
CREATE INDEX IF NOT EXISTS idx_reports_report_id ON reports(report_id);
CREATE INDEX IF NOT EXISTS idx_reports_probe ON reports(probe_cc, probe_asn);

CREATE TABLE IF NOT EXISTS inputs (
    input_no INTEGER PRIMARY KEY,
    input TEXT NOT NULL UNIQUE
);

-- Measurement ids are not unique: the same id can appear in several rows.
CREATE TABLE IF NOT EXISTS measurements (
    msm_no INTEGER PRIMARY KEY,
    id TEXT NOT NULL,
    report_no INTEGER NOT NULL REFERENCES reports(report_no),
    input_no INTEGER REFERENCES inputs(input_no),
    measurement_start_time TEXT NOT NULL,
    frame_off INTEGER NOT NULL,
    frame_size INTEGER NOT NULL,
    intra_off INTEGER NOT NULL,
    intra_size INTEGER NOT NULL,
    anomaly INTEGER,
    confirmed INTEGER,
    msm_failure INTEGER,
    exc TEXT,
    residual_no INTEGER
);
CREATE INDEX IF NOT EXISTS idx_measurements_id ON measurements(id);
CREATE INDEX IF NOT EXISTS idx_measurements_report ON measurements(report_no);
CREATE INDEX IF NOT EXISTS idx_measurements_start_time ON measurements(measurement_start_time);

-- Manual label overrides, keyed by measurement surrogate
CREATE TABLE IF NOT EXISTS labels (
    msm_no INTEGER PRIMARY KEY REFERENCES measurements(msm_no),
    anomaly INTEGER,
    confirmed INTEGER,
    msm_failure INTEGER
);

CREATE TABLE IF NOT EXISTS vpn_configs (
    provider TEXT PRIMARY KEY,
    protocol TEXT NOT NULL,
    openvpn_ca TEXT NOT NULL,
    openvpn_cert TEXT NOT NULL,
    openvpn_key TEXT NOT NULL,
    date_created TEXT NOT NULL,
    date_updated TEXT NOT NULL
);
"#;
