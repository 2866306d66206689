use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    CountQuery, Engine, EstimatorError, Result, TableName, Value,
    backend::{CountBackend, TableStatistics, count_from_i64},
    sql::{Dialect, render_count},
};

/// PostgreSQL-backed counting backend.
///
/// PostgreSQL exposes no table-status command with the shape the estimator
/// reads, so every count runs `COUNT(*)`.
#[derive(Clone)]
pub struct PostgresCountBackend {
    pool: PgPool,
}

impl PostgresCountBackend {
    /// Creates a new PostgreSQL counting backend.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl CountBackend for PostgresCountBackend {
    fn engine(&self) -> Engine {
        Engine::Postgres
    }

    #[tracing::instrument(skip(self, query), fields(table = %query.table))]
    async fn count_rows(&self, query: &CountQuery) -> Result<u64> {
        query.validate()?;
        let sql = render_count(query, Dialect::Postgres);

        let mut count_query = sqlx::query_scalar::<_, i64>(&sql);
        for value in query.bind_values() {
            count_query = match value {
                Value::Int(v) => count_query.bind(*v),
                Value::Float(v) => count_query.bind(*v),
                Value::Text(v) => count_query.bind(v.as_str()),
                Value::Bool(v) => count_query.bind(*v),
            };
        }

        let count = count_query.fetch_one(&self.pool).await?;
        count_from_i64(count)
    }

    async fn table_statistics(&self, _table: &TableName) -> Result<TableStatistics> {
        Err(EstimatorError::UnsupportedEngine(Engine::Postgres))
    }
}
