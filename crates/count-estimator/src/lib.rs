//! Row counting that reads engine table statistics instead of running
//! `COUNT(*)` when a query carries no filters.
//!
//! [`CountEstimator`] picks between the exact path and the approximate path
//! per call. Which engines may take the approximate path is decided once, at
//! construction, from the backend's [`Engine`].

pub mod backend;
pub mod config;
pub mod error;
pub mod estimator;
pub mod memory;
pub mod mysql;
pub mod postgres;
pub mod query;
pub mod sql;
pub mod telemetry;

pub use backend::{CountBackend, CountBackendExt, SqlCountBackend, TableStatistics};
pub use common::{Engine, TableName};
pub use config::{EstimatorConfig, LogFormat};
pub use error::{EstimatorError, Result};
pub use estimator::{CountEstimate, CountEstimator, CountMethod, CountStrategy, apply_bounds};
pub use memory::{InMemoryCountBackend, Row};
pub use mysql::MySqlCountBackend;
pub use postgres::PostgresCountBackend;
pub use query::{CountQuery, Filter, FilterOp, Value};
pub use sql::Dialect;
pub use telemetry::init_tracing;
