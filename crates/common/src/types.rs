use serde::{Deserialize, Serialize};

/// Longest identifier MySQL accepts, in characters.
pub const MAX_IDENTIFIER_LEN: usize = 64;

/// Name of a database table, optionally qualified with a schema (`schema.table`).
///
/// Validated on construction so that backends can quote it without
/// re-checking: every part is non-empty, at most [`MAX_IDENTIFIER_LEN`]
/// characters long and free of NUL bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TableName(String);

impl TableName {
    /// Creates a validated table name.
    pub fn new(name: impl Into<String>) -> Result<Self, InvalidTableName> {
        let name = name.into();
        let parts: Vec<&str> = name.split('.').collect();

        if parts.len() > 2 {
            return Err(InvalidTableName::new(&name, "at most one schema qualifier"));
        }
        for part in &parts {
            if part.is_empty() {
                return Err(InvalidTableName::new(&name, "empty identifier"));
            }
            if part.chars().count() > MAX_IDENTIFIER_LEN {
                return Err(InvalidTableName::new(&name, "identifier too long"));
            }
            if part.contains('\0') {
                return Err(InvalidTableName::new(&name, "identifier contains NUL"));
            }
        }

        Ok(Self(name))
    }

    /// Returns the schema qualifier, if any.
    pub fn schema(&self) -> Option<&str> {
        self.0.split_once('.').map(|(schema, _)| schema)
    }

    /// Returns the unqualified table name.
    pub fn table(&self) -> &str {
        match self.0.split_once('.') {
            Some((_, table)) => table,
            None => &self.0,
        }
    }

    /// Returns the name as written, including any schema qualifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TableName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for TableName {
    type Error = InvalidTableName;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        Self::new(name)
    }
}

impl TryFrom<&str> for TableName {
    type Error = InvalidTableName;

    fn try_from(name: &str) -> Result<Self, Self::Error> {
        Self::new(name)
    }
}

impl From<TableName> for String {
    fn from(name: TableName) -> Self {
        name.0
    }
}

/// Error returned when a string is not a usable table name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidTableName {
    pub name: String,
    pub reason: &'static str,
}

impl InvalidTableName {
    fn new(name: &str, reason: &'static str) -> Self {
        Self {
            name: name.to_string(),
            reason,
        }
    }
}

impl std::fmt::Display for InvalidTableName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid table name {:?}: {}", self.name, self.reason)
    }
}

impl std::error::Error for InvalidTableName {}

/// Storage engine family behind a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    MySql,
    Postgres,
    Memory,
}

impl Engine {
    /// Detects the engine from a connection URL scheme.
    ///
    /// Returns None for schemes no backend handles.
    pub fn from_url(url: &str) -> Option<Self> {
        let (scheme, _) = url.split_once("://")?;
        match scheme.to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Some(Engine::MySql),
            "postgres" | "postgresql" => Some(Engine::Postgres),
            "memory" => Some(Engine::Memory),
            _ => None,
        }
    }

    /// Whether the engine maintains per-table row estimates that can stand in
    /// for `COUNT(*)`.
    pub fn supports_table_statistics(&self) -> bool {
        matches!(self, Engine::MySql)
    }

    /// Short lowercase name, used in logs and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Engine::MySql => "mysql",
            Engine::Postgres => "postgres",
            Engine::Memory => "memory",
        }
    }
}

impl std::fmt::Display for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
