//! SQLite-backed remote store.
//!
//! Stores every row as a JSON document next to its id, so the table schema
//! never has to track the entity fields. Filters run through `json_extract`.

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::PathBuf;
use std::str::FromStr;

use super::{Filter, RemoteError, RemoteStore, Table};
use crate::models::Row;

/// Initialize the database connection pool and run migrations
pub async fn init_db(path: PathBuf) -> Result<SqlitePool, sqlx::Error> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite:{}?mode=rwc", path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?.create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct DataRow {
    data: String,
}

/// SQL condition and its bound values for a filter.
fn where_clause(filter: &Filter) -> (String, Vec<String>) {
    match filter {
        Filter::All => (String::new(), Vec::new()),
        Filter::Id(id) => (" WHERE id = ?".to_string(), vec![id.clone()]),
        Filter::Eq { column, value } => (
            " WHERE json_extract(data, ?) = ?".to_string(),
            vec![format!("$.\"{}\"", column), value.clone()],
        ),
    }
}

fn parse_row(data: &str) -> Result<Row, RemoteError> {
    Ok(serde_json::from_str(data)?)
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens (or creates) the database file and runs migrations.
    pub async fn open(path: PathBuf) -> Result<Self, RemoteError> {
        Ok(Self::new(init_db(path).await?))
    }
}

#[async_trait]
impl RemoteStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn select(&self, table: Table, filter: &Filter) -> Result<Vec<Row>, RemoteError> {
        let (condition, binds) = where_clause(filter);
        let sql = format!(
            "SELECT data FROM {}{} ORDER BY rowid",
            table.as_str(),
            condition
        );

        let mut query = sqlx::query_as::<_, DataRow>(&sql);
        for value in &binds {
            query = query.bind(value);
        }
        let rows = query.fetch_all(&self.pool).await?;

        rows.iter().map(|r| parse_row(&r.data)).collect()
    }

    async fn insert(&self, table: Table, rows: Vec<Row>) -> Result<(), RemoteError> {
        let mut tx = self.pool.begin().await?;
        let sql = format!("INSERT INTO {} (id, data) VALUES (?, ?)", table.as_str());

        for row in &rows {
            let id = row
                .get("id")
                .and_then(|v| v.as_str())
                .ok_or_else(|| RemoteError::Message("row is missing an id".to_string()))?;
            let data = serde_json::to_string(row)?;

            sqlx::query(&sql)
                .bind(id)
                .bind(&data)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn update(&self, table: Table, patch: Row, id: &str) -> Result<(), RemoteError> {
        let mut tx = self.pool.begin().await?;

        let select = format!("SELECT data FROM {} WHERE id = ?", table.as_str());
        let existing: Option<DataRow> = sqlx::query_as(&select)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        // Updating a missing row is a no-op, like an UPDATE matching nothing
        if let Some(existing) = existing {
            let mut row = parse_row(&existing.data)?;
            for (column, value) in patch {
                if column != "id" {
                    row.insert(column, value);
                }
            }

            let update = format!("UPDATE {} SET data = ? WHERE id = ?", table.as_str());
            sqlx::query(&update)
                .bind(serde_json::to_string(&row)?)
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete(&self, table: Table, filter: &Filter) -> Result<(), RemoteError> {
        let (condition, binds) = where_clause(filter);
        let sql = format!("DELETE FROM {}{}", table.as_str(), condition);

        let mut query = sqlx::query(&sql);
        for value in &binds {
            query = query.bind(value);
        }
        query.execute(&self.pool).await?;
        Ok(())
    }
}
