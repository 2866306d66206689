use async_trait::async_trait;
use sqlx::{Executor, MySqlPool, Row, mysql::MySqlRow};

use crate::{
    CountQuery, Engine, EstimatorError, Result, TableName, Value,
    backend::{CountBackend, TableStatistics, count_from_i64},
    sql::{Dialect, escape_like_literal, render_count},
};

/// Position of the `Rows` column in `SHOW TABLE STATUS` output.
pub const ROWS_COLUMN: usize = 4;

/// MySQL-backed counting backend.
///
/// Table statistics come from `SHOW TABLE STATUS`, which for InnoDB reports
/// the optimizer's sampled row estimate rather than an exact count.
#[derive(Clone)]
pub struct MySqlCountBackend {
    pool: MySqlPool,
}

impl MySqlCountBackend {
    /// Creates a new MySQL counting backend.
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    fn status_sql(table: &TableName) -> String {
        let pattern = escape_like_literal(table.table());
        match table.schema() {
            Some(schema) => format!(
                "SHOW TABLE STATUS FROM {} LIKE '{pattern}'",
                Dialect::MySql.quote_identifier(schema)
            ),
            None => format!("SHOW TABLE STATUS LIKE '{pattern}'"),
        }
    }

    fn rows_from_status(row: &MySqlRow) -> Result<Option<u64>> {
        match row.try_get::<Option<u64>, _>(ROWS_COLUMN) {
            Ok(rows) => Ok(rows),
            // Some server versions report the column as signed
            Err(sqlx::Error::ColumnDecode { .. }) => row
                .try_get::<Option<i64>, _>(ROWS_COLUMN)?
                .map(count_from_i64)
                .transpose(),
            Err(e) => Err(e.into()),
        }
    }

    /// Maps the `Rows` cell of the first status row to statistics. A missing
    /// row or a NULL estimate means the engine has nothing for the table.
    fn statistics_from_rows(table: &TableName, rows: Option<u64>) -> Result<TableStatistics> {
        match rows {
            Some(rows) => Ok(TableStatistics::new(table.clone(), rows)),
            None => {
                tracing::warn!(%table, "no row estimate in table status");
                Err(EstimatorError::StatisticsUnavailable {
                    table: table.clone(),
                })
            }
        }
    }
}

#[async_trait]
impl CountBackend for MySqlCountBackend {
    fn engine(&self) -> Engine {
        Engine::MySql
    }

    #[tracing::instrument(skip(self, query), fields(table = %query.table))]
    async fn count_rows(&self, query: &CountQuery) -> Result<u64> {
        query.validate()?;
        let sql = render_count(query, Dialect::MySql);

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

    #[tracing::instrument(skip(self), fields(table = %table))]
    async fn table_statistics(&self, table: &TableName) -> Result<TableStatistics> {
        // SHOW cannot be prepared, so the name is escaped into the text instead
        let sql = Self::status_sql(table);
        let row: Option<MySqlRow> = self.pool.fetch_optional(sqlx::raw_sql(&sql)).await?;

        let rows = match row {
            Some(row) => Self::rows_from_status(&row)?,
            None => None,
        };
        Self::statistics_from_rows(table, rows)
    }
}
