use common::{Engine, InvalidTableName, TableName};
use thiserror::Error;

/// Errors that can occur while counting rows.
#[derive(Debug, Error)]
pub enum EstimatorError {
    /// A database error occurred, including an unavailable connection.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The engine returned no usable statistics row for the table.
    #[error("No table statistics for {table}")]
    StatisticsUnavailable { table: TableName },

    /// The table does not exist in the backend.
    #[error("Table not found: {0}")]
    TableNotFound(TableName),

    /// Table statistics were requested from an engine that has none.
    #[error("Engine {0} does not report table statistics")]
    UnsupportedEngine(Engine),

    /// The table name failed validation.
    #[error("Invalid table name: {0}")]
    InvalidTableName(#[from] InvalidTableName),

    /// The upper pagination bound is below the lower one.
    #[error("Invalid bounds: upper bound {high} is below lower bound {low}")]
    InvalidBounds { low: u64, high: u64 },

    /// A filter cannot be rendered or evaluated.
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    /// The environment configuration is unusable.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for estimator operations.
pub type Result<T> = std::result::Result<T, EstimatorError>;
