//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p count-estimator --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use count_estimator::{
    CountBackend, CountBackendExt, CountEstimator, CountMethod, CountQuery, CountStrategy, Engine,
    EstimatorError, Filter, PostgresCountBackend, TableName,
};
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS orders (
    id BIGSERIAL PRIMARY KEY,
    status TEXT NOT NULL,
    total BIGINT NOT NULL,
    paid BOOLEAN NOT NULL DEFAULT FALSE
);
"#;

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            // Create a temporary pool just for the schema
            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(SCHEMA).execute(&temp_pool).await.unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh backend with its own pool and `rows` orders, every third one paid.
async fn get_test_backend(rows: usize) -> PostgresCountBackend {
    let info = get_container_info().await;

    // Create a fresh pool for each test to avoid connection issues
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    // Clear tables for test isolation
    sqlx::query("TRUNCATE TABLE orders")
        .execute(&pool)
        .await
        .unwrap();

    for i in 0..rows {
        sqlx::query("INSERT INTO orders (status, total, paid) VALUES ($1, $2, $3)")
            .bind(if i % 2 == 0 { "shipped" } else { "pending" })
            .bind(i as i64)
            .bind(i % 3 == 0)
            .execute(&pool)
            .await
            .unwrap();
    }

    PostgresCountBackend::new(pool)
}

fn orders() -> TableName {
    TableName::new("orders").unwrap()
}

#[tokio::test]
async fn postgres_estimator_counts_exactly() {
    let backend = get_test_backend(17).await;
    let estimator = CountEstimator::new(backend);
    assert_eq!(estimator.strategy(), CountStrategy::Exact);

    let estimate = estimator
        .estimate(&CountQuery::new(orders()))
        .await
        .unwrap();
    assert_eq!(estimate.count, 17);
    assert_eq!(estimate.method, CountMethod::Exact);
}

#[tokio::test]
async fn exact_path_applies_bounds() {
    let backend = get_test_backend(17).await;
    let estimator = CountEstimator::new(backend);

    let query = CountQuery::new(orders()).offset(10);
    assert_eq!(estimator.count(&query).await.unwrap(), 7);

    let query = CountQuery::new(orders()).offset(10).limit(3);
    assert_eq!(estimator.count(&query).await.unwrap(), 3);

    let query = CountQuery::new(orders()).offset(40);
    assert_eq!(estimator.count(&query).await.unwrap(), 0);
}

#[tokio::test]
async fn filters_bind_in_order() {
    let backend = get_test_backend(30).await;
    let estimator = CountEstimator::new(backend);

    let query = CountQuery::new(orders())
        .filter(Filter::eq("status", "shipped"))
        .filter(Filter::lt("total", 10))
        .filter(Filter::eq("paid", true));
    // shipped: even totals; below 10: 0,2,4,6,8; paid: multiples of 3 -> 0,6
    assert_eq!(estimator.count(&query).await.unwrap(), 2);

    let query = CountQuery::new(orders()).filter(Filter::like("status", "pend%"));
    assert_eq!(estimator.count(&query).await.unwrap(), 15);
}

#[tokio::test]
async fn postgres_has_no_table_statistics() {
    let backend = get_test_backend(0).await;
    assert_eq!(backend.engine(), Engine::Postgres);

    let err = backend.approximate_rows(&orders()).await.unwrap_err();
    assert!(matches!(
        err,
        EstimatorError::UnsupportedEngine(Engine::Postgres)
    ));

    let forced = CountEstimator::with_strategy(backend, CountStrategy::Approximate);
    assert!(forced.is_err());
}

#[tokio::test]
async fn missing_table_error_propagates() {
    let backend = get_test_backend(0).await;
    let estimator = CountEstimator::new(backend);

    let query = CountQuery::for_table("no_such_table").unwrap();
    let err = estimator.count(&query).await.unwrap_err();
    assert!(matches!(err, EstimatorError::Database(_)));
}

#[tokio::test]
async fn count_table_helper() {
    let backend = get_test_backend(4).await;
    assert_eq!(backend.count_table(&orders()).await.unwrap(), 4);
}
