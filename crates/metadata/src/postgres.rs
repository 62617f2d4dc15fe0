//! PostgreSQL-based metadata store implementation.

use crate::error::MetadataResult;
use crate::filter::{FileFilter, MeasurementFilter};
use crate::models::*;
use crate::repos::{MeasurementRepo, ReportRepo, VpnConfigRepo};
use crate::sql::{self, Dialect, SqlValue};
use crate::store::MetadataStore;
use async_trait::async_trait;
use msmt_core::Pagination;
use msmt_core::config::PgSslMode;
use sqlx::postgres::{PgArguments, PgConnectOptions, PgPoolOptions, PgSslMode as SqlxPgSslMode};
use sqlx::query::QueryAs;
use sqlx::{Pool, Postgres};
use std::str::FromStr;

/// PostgreSQL schema (embedded).
const POSTGRES_SCHEMA: &str = include_str!("postgres_schema.sql");

fn postgres_schema_statements(schema: &str) -> Vec<&str> {
    schema
        .split(';')
        .filter_map(|statement| {
            let trimmed = statement.trim();
            if trimmed.is_empty() {
                return None;
            }
            let has_sql = trimmed.lines().any(|line| {
                let line = line.trim();
                !line.is_empty() && !line.starts_with("--")
            });
            has_sql.then_some(trimmed)
        })
        .collect()
}

fn bind_values<'q, O>(
    mut query: QueryAs<'q, Postgres, O, PgArguments>,
    values: &'q [SqlValue],
) -> QueryAs<'q, Postgres, O, PgArguments> {
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

/// PostgreSQL-based metadata store.
pub struct PostgresStore {
    pool: Pool<Postgres>,
}

impl PostgresStore {
    /// Create a new PostgreSQL store from a connection URL.
    pub async fn from_url(
        url: &str,
        max_connections: u32,
        statement_timeout_ms: Option<u64>,
    ) -> MetadataResult<Self> {
        let opts = PgConnectOptions::from_str(url)?;
        Self::connect(opts, max_connections, statement_timeout_ms).await
    }

    /// Create a new PostgreSQL store from individual connection parameters.
    ///
    /// Lets the password arrive separately, e.g. through `MSMT_METADATA__PASSWORD`.
    #[allow(clippy::too_many_arguments)]
    pub async fn from_params(
        host: &str,
        port: u16,
        username: Option<&str>,
        password: Option<&str>,
        database: &str,
        ssl_mode: Option<PgSslMode>,
        max_connections: u32,
        statement_timeout_ms: Option<u64>,
    ) -> MetadataResult<Self> {
        let mut opts = PgConnectOptions::new()
            .host(host)
            .port(port)
            .database(database);

        if let Some(user) = username {
            opts = opts.username(user);
        }

        if let Some(pass) = password {
            opts = opts.password(pass);
        }

        if let Some(mode) = ssl_mode {
            let sqlx_mode = match mode {
                PgSslMode::Disable => SqlxPgSslMode::Disable,
                PgSslMode::Prefer => SqlxPgSslMode::Prefer,
                PgSslMode::Require => SqlxPgSslMode::Require,
            };
            opts = opts.ssl_mode(sqlx_mode);
        }

        tracing::info!(
            host = host,
            port = port,
            database = database,
            username = username.unwrap_or("<none>"),
            ssl_mode = ?ssl_mode,
            "Connecting to PostgreSQL with individual parameters"
        );

        Self::connect(opts, max_connections, statement_timeout_ms).await
    }

    async fn connect(
        mut opts: PgConnectOptions,
        max_connections: u32,
        statement_timeout_ms: Option<u64>,
    ) -> MetadataResult<Self> {
        // Listing queries over large tables must not hold a connection forever.
        if let Some(timeout_ms) = statement_timeout_ms {
            opts = opts.options([("statement_timeout", format!("{}ms", timeout_ms))]);
            tracing::info!("PostgreSQL statement_timeout set to {}ms", timeout_ms);
        }

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;

        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }
}

#[async_trait]
impl MetadataStore for PostgresStore {
    async fn migrate(&self) -> MetadataResult<()> {
        // Prepared statements cannot carry several commands.
        for statement in postgres_schema_statements(POSTGRES_SCHEMA) {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    async fn health_check(&self) -> MetadataResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl ReportRepo for PostgresStore {
    async fn list_files(
        &self,
        filter: &FileFilter,
        page: &Pagination,
    ) -> MetadataResult<Vec<FileRow>> {
        let query = sql::list_files(Dialect::Postgres, filter, page);
        let rows = bind_values(sqlx::query_as::<_, FileRow>(&query.sql), &query.binds)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn count_files(&self, filter: &FileFilter) -> MetadataResult<i64> {
        let query = sql::count_files(Dialect::Postgres, filter);
        let (count,) = bind_values(sqlx::query_as::<_, (i64,)>(&query.sql), &query.binds)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl MeasurementRepo for PostgresStore {
    async fn list_measurements(
        &self,
        filter: &MeasurementFilter,
        page: &Pagination,
    ) -> MetadataResult<Vec<MeasurementRow>> {
        let query = sql::list_measurements(Dialect::Postgres, filter, page);
        let rows = bind_values(sqlx::query_as::<_, MeasurementRow>(&query.sql), &query.binds)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn find_measurement_locations(
        &self,
        measurement_id: &str,
    ) -> MetadataResult<Vec<MeasurementLocationRow>> {
        let query = sql::measurement_locations(Dialect::Postgres, measurement_id);
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
impl VpnConfigRepo for PostgresStore {
    async fn get_vpn_config(&self, provider: &str) -> MetadataResult<Option<VpnConfigRow>> {
        let row =
            sqlx::query_as::<_, VpnConfigRow>("SELECT * FROM vpn_configs WHERE provider = $1")
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
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (provider) DO UPDATE SET
                protocol = EXCLUDED.protocol,
                openvpn_ca = EXCLUDED.openvpn_ca,
                openvpn_cert = EXCLUDED.openvpn_cert,
                openvpn_key = EXCLUDED.openvpn_key,
                date_updated = EXCLUDED.date_updated
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
