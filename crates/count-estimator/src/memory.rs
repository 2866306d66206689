use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    CountQuery, Engine, EstimatorError, Filter, FilterOp, Result, TableName, Value,
    backend::{CountBackend, TableStatistics},
};

/// A stored row. Columns missing from the map are NULL.
pub type Row = HashMap<String, Value>;

/// In-memory counting backend for testing.
///
/// Rows and table statistics are stored separately, so statistics can be
/// made stale the way a real engine's sampled estimates drift from the
/// true row count. The reported engine is configurable: a backend built with
/// [`Engine::MySql`] answers statistics requests, any other engine rejects
/// them.
#[derive(Clone)]
pub struct InMemoryCountBackend {
    engine: Engine,
    tables: Arc<RwLock<HashMap<TableName, Vec<Row>>>>,
    statistics: Arc<RwLock<HashMap<TableName, u64>>>,
    statistics_reads: Arc<AtomicUsize>,
    exact_counts: Arc<AtomicUsize>,
}

impl InMemoryCountBackend {
    /// Creates an empty backend reporting [`Engine::Memory`].
    pub fn new() -> Self {
        Self::with_engine(Engine::Memory)
    }

    /// Creates an empty backend that reports the given engine.
    pub fn with_engine(engine: Engine) -> Self {
        Self {
            engine,
            tables: Arc::default(),
            statistics: Arc::default(),
            statistics_reads: Arc::default(),
            exact_counts: Arc::default(),
        }
    }

    /// Creates an empty table. Existing rows are kept.
    pub async fn create_table(&self, table: &TableName) {
        self.tables
            .write()
            .await
            .entry(table.clone())
            .or_default();
    }

    /// Appends rows to a table, creating it if needed.
    ///
    /// Statistics are not touched; call [`analyze`](Self::analyze) to refresh
    /// them.
    pub async fn insert(&self, table: &TableName, rows: impl IntoIterator<Item = Row>) {
        self.tables
            .write()
            .await
            .entry(table.clone())
            .or_default()
            .extend(rows);
    }

    /// Overrides the statistics reported for a table.
    pub async fn set_statistics(&self, table: &TableName, approximate_rows: u64) {
        self.statistics
            .write()
            .await
            .insert(table.clone(), approximate_rows);
    }

    /// Refreshes a table's statistics from its current row count.
    pub async fn analyze(&self, table: &TableName) -> Result<()> {
        let rows = self
            .tables
            .read()
            .await
            .get(table)
            .map(|rows| rows.len() as u64)
            .ok_or_else(|| EstimatorError::TableNotFound(table.clone()))?;
        self.set_statistics(table, rows).await;
        Ok(())
    }

    /// Number of `table_statistics` calls served so far.
    pub fn statistics_reads(&self) -> usize {
        self.statistics_reads.load(Ordering::SeqCst)
    }

    /// Number of `count_rows` calls served so far.
    pub fn exact_counts(&self) -> usize {
        self.exact_counts.load(Ordering::SeqCst)
    }

    /// Clears all tables, statistics and call counters.
    pub async fn clear(&self) {
        self.tables.write().await.clear();
        self.statistics.write().await.clear();
        self.statistics_reads.store(0, Ordering::SeqCst);
        self.exact_counts.store(0, Ordering::SeqCst);
    }
}

impl Default for InMemoryCountBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CountBackend for InMemoryCountBackend {
    fn engine(&self) -> Engine {
        self.engine
    }

    async fn count_rows(&self, query: &CountQuery) -> Result<u64> {
        self.exact_counts.fetch_add(1, Ordering::SeqCst);
        query.validate()?;

        let tables = self.tables.read().await;
        let rows = tables
            .get(&query.table)
            .ok_or_else(|| EstimatorError::TableNotFound(query.table.clone()))?;

        let count = rows
            .iter()
            .filter(|row| query.filters.iter().all(|f| matches_filter(row, f)))
            .count();
        Ok(count as u64)
    }

    async fn table_statistics(&self, table: &TableName) -> Result<TableStatistics> {
        self.statistics_reads.fetch_add(1, Ordering::SeqCst);
        if !self.engine.supports_table_statistics() {
            return Err(EstimatorError::UnsupportedEngine(self.engine));
        }

        let statistics = self.statistics.read().await;
        let rows = statistics
            .get(table)
            .copied()
            .ok_or_else(|| EstimatorError::StatisticsUnavailable {
                table: table.clone(),
            })?;
        Ok(TableStatistics::new(table.clone(), rows))
    }
}

fn matches_filter(row: &Row, filter: &Filter) -> bool {
    let cell = row.get(&filter.column);
    match filter.op {
        FilterOp::IsNull => cell.is_none(),
        FilterOp::IsNotNull => cell.is_some(),
        op => {
            let (Some(cell), Some(value)) = (cell, filter.value.as_ref()) else {
                return false;
            };
            if op == FilterOp::Like {
                return match (cell, value) {
                    (Value::Text(text), Value::Text(pattern)) => like_matches(text, pattern),
                    _ => false,
                };
            }
            let Some(ordering) = cell.compare(value) else {
                return false;
            };
            match op {
                FilterOp::Eq => ordering.is_eq(),
                FilterOp::Ne => ordering.is_ne(),
                FilterOp::Lt => ordering.is_lt(),
                FilterOp::Le => ordering.is_le(),
                FilterOp::Gt => ordering.is_gt(),
                FilterOp::Ge => ordering.is_ge(),
                _ => false,
            }
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
enum LikeToken {
    AnyRun,
    AnyChar,
    Literal(char),
}

fn like_tokens(pattern: &str) -> Vec<LikeToken> {
    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        tokens.push(match c {
            '%' => LikeToken::AnyRun,
            '_' => LikeToken::AnyChar,
            // a trailing backslash matches itself
            '\\' => LikeToken::Literal(chars.next().unwrap_or('\\')),
            c => LikeToken::Literal(c),
        });
    }
    tokens
}

/// Case-sensitive SQL `LIKE`: `%` matches any run, `_` one character and
/// `\` escapes the next character.
///
/// Runs in `O(text * pattern)`: on a mismatch only the most recent `%` is
/// retried, one character further along.
fn like_matches(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let tokens = like_tokens(pattern);

    let (mut t, mut p) = (0, 0);
    // token index after the last `%`, and the text index it is anchored at
    let mut resume: Option<(usize, usize)> = None;

    while t < text.len() {
        match tokens.get(p) {
            Some(LikeToken::AnyRun) => {
                p += 1;
                resume = Some((p, t));
            }
            Some(LikeToken::AnyChar) => {
                t += 1;
                p += 1;
            }
            Some(LikeToken::Literal(c)) if *c == text[t] => {
                t += 1;
                p += 1;
            }
            _ => match resume {
                Some((after_run, anchor)) => {
                    p = after_run;
                    t = anchor + 1;
                    resume = Some((after_run, anchor + 1));
                }
                None => return false,
            },
        }
    }

    tokens[p..].iter().all(|token| *token == LikeToken::AnyRun)
}
