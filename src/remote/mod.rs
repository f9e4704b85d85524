//! Contract for the remote tabular store and its backends.
//!
//! The sync layer only needs four calls per table: `select`, `insert`,
//! `update` and `delete`. Nothing here is transactional across calls; a course
//! cascade is two independent deletes.
//!
//! # Backends
//!
//! - [`MemoryStore`]: in-process tables, used by tests and offline runs
//! - [`SqliteStore`]: a local SQLite file, one JSON document per row
//! - [`RestStore`]: a PostgREST-style HTTP API

mod error;
mod memory;
mod rest;
mod sqlite;

pub use error::{RemoteError, UNKNOWN_ERROR};
pub use memory::{MemoryStore, Op, OpRecord};
pub use rest::RestStore;
pub use sqlite::{init_db, SqliteStore};

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::models::Row;

/// Logical remote tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Table {
    People,
    Courses,
    Sessions,
}

impl Table {
    pub const ALL: [Table; 3] = [Table::People, Table::Courses, Table::Sessions];

    pub fn as_str(&self) -> &'static str {
        match self {
            Table::People => "people",
            Table::Courses => "courses",
            Table::Sessions => "sessions",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Table {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "people" => Ok(Table::People),
            "courses" => Ok(Table::Courses),
            "sessions" => Ok(Table::Sessions),
            _ => Err(format!(
                "Invalid table '{}'. Valid options: people, courses, sessions",
                s
            )),
        }
    }
}

/// Row selector for `select` and `delete`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Every row of the table
    All,
    /// The row whose `id` matches
    Id(String),
    /// Rows whose `column` equals `value`
    Eq { column: String, value: String },
}

impl Filter {
    pub fn id(id: impl Into<String>) -> Self {
        Filter::Id(id.into())
    }

    pub fn eq(column: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Eq {
            column: column.into(),
            value: value.into(),
        }
    }

    /// Evaluates the filter against a row held in memory.
    pub fn matches(&self, row: &Row) -> bool {
        match self {
            Filter::All => true,
            Filter::Id(id) => column_equals(row, "id", id),
            Filter::Eq { column, value } => column_equals(row, column, value),
        }
    }
}

fn column_equals(row: &Row, column: &str, expected: &str) -> bool {
    match row.get(column) {
        Some(Value::String(s)) => s == expected,
        Some(Value::Number(n)) => n.to_string() == expected,
        Some(Value::Bool(b)) => b.to_string() == expected,
        _ => false,
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::All => write!(f, "*"),
            Filter::Id(id) => write!(f, "id={}", id),
            Filter::Eq { column, value } => write!(f, "{}={}", column, value),
        }
    }
}

/// Generic tabular CRUD API the sync layer reconciles against.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    async fn select(&self, table: Table, filter: &Filter) -> Result<Vec<Row>, RemoteError>;

    async fn insert(&self, table: Table, rows: Vec<Row>) -> Result<(), RemoteError>;

    /// Writes `patch` over the row matching `id`. `patch` never carries `id`.
    async fn update(&self, table: Table, patch: Row, id: &str) -> Result<(), RemoteError>;

    async fn delete(&self, table: Table, filter: &Filter) -> Result<(), RemoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(row) => row,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_filter_matches() {
        let teacher = row(json!({ "id": "p1", "type": "Teacher" }));
        let assistant = row(json!({ "id": "p2", "type": "TA" }));

        let teachers = Filter::eq("type", "Teacher");
        assert!(teachers.matches(&teacher));
        assert!(!teachers.matches(&assistant));

        assert!(Filter::id("p2").matches(&assistant));
        assert!(!Filter::id("p2").matches(&teacher));
        assert!(Filter::All.matches(&teacher));
    }

    #[test]
    fn test_filter_missing_column_never_matches() {
        let course = row(json!({ "id": "c1" }));
        assert!(!Filter::eq("courseId", "c1").matches(&course));
    }

    #[test]
    fn test_table_names() {
        assert_eq!(Table::People.to_string(), "people");
        assert_eq!(Table::from_str("Sessions").unwrap(), Table::Sessions);
        assert!(Table::from_str("rooms").is_err());
    }
}
