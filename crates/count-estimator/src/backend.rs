use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{mysql::MySqlPoolOptions, postgres::PgPoolOptions};

use crate::{
    CountQuery, Engine, EstimatorConfig, EstimatorError, MySqlCountBackend, PostgresCountBackend,
    Result, TableName,
};

/// Engine-maintained metadata about one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableStatistics {
    pub table: TableName,

    /// Row count as last sampled by the engine. May be stale.
    pub approximate_rows: u64,

    /// When the statistics were read.
    pub fetched_at: DateTime<Utc>,
}

impl TableStatistics {
    pub fn new(table: TableName, approximate_rows: u64) -> Self {
        Self {
            table,
            approximate_rows,
            fetched_at: Utc::now(),
        }
    }
}

/// Core trait for counting backends.
///
/// A backend knows which engine it talks to, how to run an exact count and,
/// for engines that keep them, how to read table statistics.
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait CountBackend: Send + Sync {
    /// The storage engine behind this backend.
    fn engine(&self) -> Engine;

    /// Counts rows matching every filter of the query.
    ///
    /// Pagination bounds are ignored here; the estimator applies them.
    async fn count_rows(&self, query: &CountQuery) -> Result<u64>;

    /// Reads the engine's row estimate for a table.
    ///
    /// Fails with `UnsupportedEngine` on engines without statistics and with
    /// `StatisticsUnavailable` when the engine has nothing for the table.
    async fn table_statistics(&self, table: &TableName) -> Result<TableStatistics>;
}

/// Extension trait providing convenience methods for counting backends.
#[async_trait]
pub trait CountBackendExt: CountBackend {
    /// Counts every row of a table.
    async fn count_table(&self, table: &TableName) -> Result<u64> {
        self.count_rows(&CountQuery::new(table.clone())).await
    }

    /// Returns the engine's row estimate for a table.
    async fn approximate_rows(&self, table: &TableName) -> Result<u64> {
        Ok(self.table_statistics(table).await?.approximate_rows)
    }
}

// Blanket implementation for all CountBackend implementations
impl<T: CountBackend + ?Sized> CountBackendExt for T {}

#[async_trait]
impl<T: CountBackend + ?Sized> CountBackend for std::sync::Arc<T> {
    fn engine(&self) -> Engine {
        (**self).engine()
    }

    async fn count_rows(&self, query: &CountQuery) -> Result<u64> {
        (**self).count_rows(query).await
    }

    async fn table_statistics(&self, table: &TableName) -> Result<TableStatistics> {
        (**self).table_statistics(table).await
    }
}

/// A SQL backend chosen from a connection URL.
#[derive(Clone)]
pub enum SqlCountBackend {
    MySql(MySqlCountBackend),
    Postgres(PostgresCountBackend),
}

impl SqlCountBackend {
    /// Connects a pool for `config.database_url`, picking the backend from
    /// the URL scheme.
    #[tracing::instrument(skip(config), fields(engine))]
    pub async fn connect(config: &EstimatorConfig) -> Result<Self> {
        let engine = config.engine()?;
        tracing::Span::current().record("engine", engine.as_str());

        let backend = match engine {
            Engine::MySql => {
                let pool = MySqlPoolOptions::new()
                    .max_connections(config.max_connections)
                    .connect(&config.database_url)
                    .await?;
                SqlCountBackend::MySql(MySqlCountBackend::new(pool))
            }
            Engine::Postgres => {
                let pool = PgPoolOptions::new()
                    .max_connections(config.max_connections)
                    .connect(&config.database_url)
                    .await?;
                SqlCountBackend::Postgres(PostgresCountBackend::new(pool))
            }
            Engine::Memory => {
                return Err(EstimatorError::Config(
                    "memory engine has no SQL connection".to_string(),
                ));
            }
        };

        tracing::debug!("connection pool ready");
        Ok(backend)
    }
}

#[async_trait]
impl CountBackend for SqlCountBackend {
    fn engine(&self) -> Engine {
        match self {
            SqlCountBackend::MySql(backend) => backend.engine(),
            SqlCountBackend::Postgres(backend) => backend.engine(),
        }
    }

    async fn count_rows(&self, query: &CountQuery) -> Result<u64> {
        match self {
            SqlCountBackend::MySql(backend) => backend.count_rows(query).await,
            SqlCountBackend::Postgres(backend) => backend.count_rows(query).await,
        }
    }

    async fn table_statistics(&self, table: &TableName) -> Result<TableStatistics> {
        match self {
            SqlCountBackend::MySql(backend) => backend.table_statistics(table).await,
            SqlCountBackend::Postgres(backend) => backend.table_statistics(table).await,
        }
    }
}

/// Converts a signed count from the database, rejecting negatives.
pub(crate) fn count_from_i64(count: i64) -> Result<u64> {
    u64::try_from(count)
        .map_err(|_| EstimatorError::Database(sqlx::Error::Protocol(format!("negative count {count}"))))
}
