//! The count estimator: exact `COUNT(*)` for filtered queries, engine table
//! statistics for unfiltered ones.

use std::time::Instant;

use crate::{
    CountBackend, CountQuery, Engine, EstimatorConfig, EstimatorError, Result,
    backend::CountBackendExt,
};

/// How unfiltered queries are counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountStrategy {
    /// Always run `COUNT(*)`.
    Exact,
    /// Read table statistics when the query has no filters.
    Approximate,
}

impl CountStrategy {
    /// The strategy an engine supports: approximate only where the engine
    /// keeps table statistics.
    pub fn for_engine(engine: Engine) -> Self {
        if engine.supports_table_statistics() {
            CountStrategy::Approximate
        } else {
            CountStrategy::Exact
        }
    }
}

/// Which path produced a count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountMethod {
    Exact,
    Approximate,
}

impl CountMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            CountMethod::Exact => "exact",
            CountMethod::Approximate => "approximate",
        }
    }
}

/// A row count and the method that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountEstimate {
    pub count: u64,
    pub method: CountMethod,
}

impl CountEstimate {
    pub fn is_exact(&self) -> bool {
        self.method == CountMethod::Exact
    }
}

/// Adjusts a full row count for pagination bounds.
///
/// Subtracts the lower bound, floors at zero and, when an upper bound is
/// set, caps the result at the window size `high - low`.
pub fn apply_bounds(count: u64, low: u64, high: Option<u64>) -> u64 {
    let count = count.saturating_sub(low);
    match high {
        Some(high) => count.min(high.saturating_sub(low)),
        None => count,
    }
}

/// Counts rows, substituting engine statistics for `COUNT(*)` on
/// unfiltered queries when the backend's engine supports it.
///
/// Errors from either path are returned as-is; a failed statistics read
/// never falls back to an exact count.
pub struct CountEstimator<B: CountBackend> {
    backend: B,
    strategy: CountStrategy,
}

impl<B: CountBackend> CountEstimator<B> {
    /// Creates an estimator with the strategy the backend's engine supports.
    pub fn new(backend: B) -> Self {
        let strategy = CountStrategy::for_engine(backend.engine());
        Self { backend, strategy }
    }

    /// Creates an estimator with an explicit strategy.
    ///
    /// Requesting [`CountStrategy::Approximate`] on an engine without table
    /// statistics fails with `UnsupportedEngine`.
    pub fn with_strategy(backend: B, strategy: CountStrategy) -> Result<Self> {
        let engine = backend.engine();
        if strategy == CountStrategy::Approximate && !engine.supports_table_statistics() {
            return Err(EstimatorError::UnsupportedEngine(engine));
        }
        Ok(Self { backend, strategy })
    }

    /// Creates an estimator honoring `config.approximate`.
    pub fn from_config(backend: B, config: &EstimatorConfig) -> Self {
        if config.approximate {
            Self::new(backend)
        } else {
            Self {
                backend,
                strategy: CountStrategy::Exact,
            }
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn strategy(&self) -> CountStrategy {
        self.strategy
    }

    /// Returns the row count for a query.
    pub async fn count(&self, query: &CountQuery) -> Result<u64> {
        Ok(self.estimate(query).await?.count)
    }

    /// Returns the row count for a query along with the method used.
    ///
    /// Filtered queries, and every query on an exact-only estimator, run
    /// `COUNT(*)`. Otherwise the engine's table statistics are read once.
    /// Inverted bounds or malformed filters are rejected before either path.
    #[tracing::instrument(
        skip(self, query),
        fields(table = %query.table, engine = %self.backend.engine(), method)
    )]
    pub async fn estimate(&self, query: &CountQuery) -> Result<CountEstimate> {
        query.validate()?;
        let started = Instant::now();
        let method = if query.has_filters() || self.strategy == CountStrategy::Exact {
            CountMethod::Exact
        } else {
            CountMethod::Approximate
        };
        tracing::Span::current().record("method", method.as_str());

        let count = match method {
            CountMethod::Exact => self.exact_count(query).await?,
            CountMethod::Approximate => self.approximate_count(query).await?,
        };

        let engine = self.backend.engine().as_str();
        match method {
            CountMethod::Exact => {
                metrics::counter!("count_estimator_exact_total", "engine" => engine).increment(1)
            }
            CountMethod::Approximate => {
                metrics::counter!("count_estimator_approximate_total", "engine" => engine)
                    .increment(1)
            }
        }
        metrics::histogram!("count_estimator_duration_seconds", "method" => method.as_str())
            .record(started.elapsed().as_secs_f64());

        tracing::debug!(count, "row count ready");
        Ok(CountEstimate { count, method })
    }

    /// Runs `COUNT(*)` honoring all filters, then applies pagination bounds.
    pub async fn exact_count(&self, query: &CountQuery) -> Result<u64> {
        let count = self.backend.count_rows(query).await?;
        Ok(apply_bounds(count, query.low_mark, query.high_mark))
    }

    async fn approximate_count(&self, query: &CountQuery) -> Result<u64> {
        let rows = self.backend.approximate_rows(&query.table).await?;
        Ok(apply_bounds(rows, query.low_mark, query.high_mark))
    }
}
