//! In-process remote store.
//!
//! Keeps each table as a vector of rows, records every call it receives and
//! can be told to fail specific calls, which makes it the backend for store
//! tests and for offline runs of the CLI.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{Filter, RemoteError, RemoteStore, Table};
use crate::models::Row;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Select,
    Insert,
    Update,
    Delete,
}

/// One call received by the store, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub struct OpRecord {
    pub op: Op,
    pub table: Table,
    /// Filter, id or row count, depending on the call
    pub target: String,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<Table, Vec<Row>>>,
    log: Mutex<Vec<OpRecord>>,
    failures: Mutex<HashMap<(Table, Op), RemoteError>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn row_id(row: &Row) -> Option<&str> {
    row.get("id").and_then(Value::as_str)
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a table with rows.
    pub fn with_rows(self, table: Table, rows: Vec<Row>) -> Self {
        lock(&self.tables).entry(table).or_default().extend(rows);
        self
    }

    /// Makes every subsequent `op` on `table` fail with `error`.
    pub fn fail(&self, table: Table, op: Op, error: RemoteError) {
        lock(&self.failures).insert((table, op), error);
    }

    pub fn clear_failures(&self) {
        lock(&self.failures).clear();
    }

    /// Current rows of a table.
    pub fn rows(&self, table: Table) -> Vec<Row> {
        lock(&self.tables).get(&table).cloned().unwrap_or_default()
    }

    /// Calls received so far.
    pub fn log(&self) -> Vec<OpRecord> {
        lock(&self.log).clone()
    }

    fn record(&self, op: Op, table: Table, target: String) -> Result<(), RemoteError> {
        lock(&self.log).push(OpRecord { op, table, target });
        match lock(&self.failures).get(&(table, op)) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn select(&self, table: Table, filter: &Filter) -> Result<Vec<Row>, RemoteError> {
        self.record(Op::Select, table, filter.to_string())?;
        let tables = lock(&self.tables);
        Ok(tables
            .get(&table)
            .map(|rows| rows.iter().filter(|r| filter.matches(r)).cloned().collect())
            .unwrap_or_default())
    }

    async fn insert(&self, table: Table, rows: Vec<Row>) -> Result<(), RemoteError> {
        self.record(Op::Insert, table, format!("{} row(s)", rows.len()))?;
        let mut tables = lock(&self.tables);
        let existing = tables.entry(table).or_default();

        for row in &rows {
            let Some(id) = row_id(row) else {
                return Err(RemoteError::from_payload(json!({
                    "code": "23502",
                    "message": "null value in column \"id\" violates not-null constraint"
                })));
            };
            if existing.iter().any(|r| row_id(r) == Some(id)) {
                return Err(RemoteError::from_payload(json!({
                    "code": "23505",
                    "message": "duplicate key value violates unique constraint",
                    "details": format!("Key (id)=({}) already exists.", id)
                })));
            }
        }

        existing.extend(rows);
        Ok(())
    }

    async fn update(&self, table: Table, patch: Row, id: &str) -> Result<(), RemoteError> {
        self.record(Op::Update, table, id.to_string())?;
        let mut tables = lock(&self.tables);
        if let Some(row) = tables
            .entry(table)
            .or_default()
            .iter_mut()
            .find(|r| row_id(r) == Some(id))
        {
            for (column, value) in patch {
                if column != "id" {
                    row.insert(column, value);
                }
            }
        }
        Ok(())
    }

    async fn delete(&self, table: Table, filter: &Filter) -> Result<(), RemoteError> {
        self.record(Op::Delete, table, filter.to_string())?;
        lock(&self.tables)
            .entry(table)
            .or_default()
            .retain(|r| !filter.matches(r));
        Ok(())
    }
}
