use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::{EstimatorError, Result, TableName};

/// A literal compared against a column in a [`Filter`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
}

impl Value {
    /// Compares two values, coercing between integers and floats.
    ///
    /// Returns None for values of unrelated types.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

/// Comparison applied by a [`Filter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
    IsNull,
    IsNotNull,
}

impl FilterOp {
    /// Whether the operator compares against a bound value.
    pub fn takes_value(&self) -> bool {
        !matches!(self, FilterOp::IsNull | FilterOp::IsNotNull)
    }

    /// SQL spelling of the operator.
    pub fn as_sql(&self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Ne => "<>",
            FilterOp::Lt => "<",
            FilterOp::Le => "<=",
            FilterOp::Gt => ">",
            FilterOp::Ge => ">=",
            FilterOp::Like => "LIKE",
            FilterOp::IsNull => "IS NULL",
            FilterOp::IsNotNull => "IS NOT NULL",
        }
    }
}

/// A single predicate on one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    pub value: Option<Value>,
}

impl Filter {
    fn compare(column: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            op,
            value: Some(value.into()),
        }
    }

    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, FilterOp::Eq, value)
    }

    pub fn ne(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, FilterOp::Ne, value)
    }

    pub fn lt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, FilterOp::Lt, value)
    }

    pub fn le(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, FilterOp::Le, value)
    }

    pub fn gt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, FilterOp::Gt, value)
    }

    pub fn ge(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, FilterOp::Ge, value)
    }

    /// SQL `LIKE` match with `%` and `_` wildcards.
    pub fn like(column: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::compare(column, FilterOp::Like, Value::Text(pattern.into()))
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            op: FilterOp::IsNull,
            value: None,
        }
    }

    pub fn is_not_null(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            op: FilterOp::IsNotNull,
            value: None,
        }
    }

    /// Checks that the column is usable and the value matches the operator.
    pub fn validate(&self) -> Result<()> {
        if self.column.is_empty() || self.column.contains('\0') {
            return Err(EstimatorError::InvalidFilter(format!(
                "invalid column name {:?}",
                self.column
            )));
        }
        match (&self.value, self.op) {
            (None, op) if op.takes_value() => Err(EstimatorError::InvalidFilter(format!(
                "{} on {} needs a value",
                op.as_sql(),
                self.column
            ))),
            (Some(_), op) if !op.takes_value() => Err(EstimatorError::InvalidFilter(format!(
                "{} on {} takes no value",
                op.as_sql(),
                self.column
            ))),
            (Some(value), FilterOp::Like) if !matches!(value, Value::Text(_)) => Err(
                EstimatorError::InvalidFilter(format!("LIKE on {} needs a text pattern", self.column)),
            ),
            _ => Ok(()),
        }
    }
}

/// A pending request for the number of rows in a table.
///
/// Pagination bounds only adjust the reported count; they never change
/// which rows are considered. `offset` and `limit` compose the way repeated
/// slicing does: each call narrows the current window and never widens it.
#[derive(Debug, Clone, PartialEq)]
pub struct CountQuery {
    /// Table whose rows are counted.
    pub table: TableName,

    /// Predicates every counted row must satisfy.
    pub filters: Vec<Filter>,

    /// Pagination lower bound (rows skipped).
    pub low_mark: u64,

    /// Pagination upper bound, exclusive. Always `>= low_mark` when set.
    pub high_mark: Option<u64>,
}

impl CountQuery {
    /// Creates an unfiltered, unbounded count of `table`.
    pub fn new(table: TableName) -> Self {
        Self {
            table,
            filters: Vec::new(),
            low_mark: 0,
            high_mark: None,
        }
    }

    /// Creates a count of the table with the given name.
    pub fn for_table(name: &str) -> Result<Self> {
        Ok(Self::new(TableName::new(name)?))
    }

    /// Adds a filter predicate.
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Skips `offset` more rows, never moving past the upper bound.
    pub fn offset(mut self, offset: u64) -> Self {
        let low = self.low_mark.saturating_add(offset);
        self.low_mark = match self.high_mark {
            Some(high) => low.min(high),
            None => low,
        };
        self
    }

    /// Caps the window at `limit` rows past the current lower bound.
    pub fn limit(mut self, limit: u64) -> Self {
        let high = self.low_mark.saturating_add(limit);
        self.high_mark = Some(match self.high_mark {
            Some(existing) => existing.min(high),
            None => high,
        });
        self
    }

    /// Sets both bounds directly.
    pub fn slice(mut self, low: u64, high: Option<u64>) -> Result<Self> {
        if let Some(high) = high
            && high < low
        {
            return Err(EstimatorError::InvalidBounds { low, high });
        }
        self.low_mark = low;
        self.high_mark = high;
        Ok(self)
    }

    /// Removes both pagination bounds.
    pub fn clear_bounds(mut self) -> Self {
        self.low_mark = 0;
        self.high_mark = None;
        self
    }

    /// Whether any filter predicate is attached.
    pub fn has_filters(&self) -> bool {
        !self.filters.is_empty()
    }

    /// Whether either pagination bound is set.
    pub fn has_bounds(&self) -> bool {
        self.low_mark != 0 || self.high_mark.is_some()
    }

    /// Values to bind, in the order the rendered SQL expects them.
    pub fn bind_values(&self) -> impl Iterator<Item = &Value> {
        self.filters.iter().filter_map(|f| f.value.as_ref())
    }

    /// Validates the bounds and every attached filter.
    pub fn validate(&self) -> Result<()> {
        if let Some(high) = self.high_mark
            && high < self.low_mark
        {
            return Err(EstimatorError::InvalidBounds {
                low: self.low_mark,
                high,
            });
        }
        self.filters.iter().try_for_each(Filter::validate)
    }
}
