pub mod types;

pub use types::{Engine, InvalidTableName, TableName};
