//! Query execution engine.
//!
//! Runs one raw SQL statement and streams its rows into JSON objects. Every
//! failure is tagged with the stage at which it happened (execute, column
//! discovery, row scan, cursor iteration) so callers can report it precisely.
//!
//! # Architecture
//!
//! The executor uses database-specific implementations organized in submodules:
//! - `mysql`: MySQL-specific row fetching
//! - `postgres`: PostgreSQL-specific row fetching
//! - `sqlite`: SQLite-specific row fetching
//!
//! Each submodule provides identical functionality adapted to the database's type system.

use crate::db::pool::DbPool;
use crate::db::types::RowToJson;
use crate::models::Row as JsonRow;
use futures_util::StreamExt;
use std::time::Instant;
use tracing::debug;

/// The point in a query's lifecycle where a failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStage {
    /// The statement was rejected or failed before producing a row.
    Execute,
    /// Column names could not be determined.
    Columns,
    /// A row was produced but a value could not be decoded.
    Scan,
    /// The cursor failed after at least one row was read.
    Iterate,
}

impl FetchStage {
    /// Prefix used in the human-readable failure text.
    pub fn failure_prefix(&self) -> &'static str {
        match self {
            Self::Execute => "Query execution failed",
            Self::Columns => "Failed to get column names",
            Self::Scan => "Failed to scan row",
            Self::Iterate => "Error iterating rows",
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{}: {source}", .stage.failure_prefix())]
pub struct FetchError {
    pub stage: FetchStage,
    #[source]
    pub source: sqlx::Error,
}

impl FetchError {
    fn new(stage: FetchStage, source: sqlx::Error) -> Self {
        Self { stage, source }
    }

    /// The driver's own message, without the stage prefix.
    pub fn cause(&self) -> String {
        self.source.to_string()
    }
}

/// Column names plus converted rows, in cursor order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOutput {
    pub columns: Vec<String>,
    pub rows: Vec<JsonRow>,
}

/// Execute a statement and convert every row.
///
/// No row limit is applied; the statement is sent exactly as given.
pub async fn fetch_rows(pool: &DbPool, sql: &str) -> Result<QueryOutput, FetchError> {
    let start = Instant::now();
    debug!(sql = %sql, "Executing query");

    let output = impl_db_dispatch!(pool, {
        MySql(p) => mysql::fetch_rows(p, sql).await,
        Postgres(p) => postgres::fetch_rows(p, sql).await,
        SQLite(p) => sqlite::fetch_rows(p, sql).await,
    })?;

    debug!(
        row_count = output.rows.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Query completed"
    );
    Ok(output)
}

// =============================================================================
// Common Helper Functions
// =============================================================================

/// Drain a row stream, classifying errors by position: an error before the
/// first row is an execution failure, a later one is an iteration failure.
async fn collect_rows<R, S>(mut stream: S) -> Result<(Option<Vec<String>>, Vec<JsonRow>), FetchError>
where
    R: RowToJson,
    S: futures_util::Stream<Item = Result<R, sqlx::Error>> + Unpin,
{
    let mut columns = None;
    let mut rows = Vec::new();

    while let Some(item) = stream.next().await {
        let row = item.map_err(|e| {
            let stage = if columns.is_none() {
                FetchStage::Execute
            } else {
                FetchStage::Iterate
            };
            FetchError::new(stage, e)
        })?;

        if columns.is_none() {
            columns = Some(row.column_names());
        }
        rows.push(
            row.to_json_map()
                .map_err(|e| FetchError::new(FetchStage::Scan, e))?,
        );
    }

    Ok((columns, rows))
}

fn column_error(e: sqlx::Error) -> FetchError {
    FetchError::new(FetchStage::Columns, e)
}

// =============================================================================
// Database-Specific Implementations
// =============================================================================
//
// Each module below provides the same interface adapted to its database type.
// The code structure is intentionally parallel to make differences obvious.
// An empty result set still reports its columns by describing the statement.

mod mysql {
    use super::*;
    use sqlx::{Column, Executor, MySqlPool, Statement};

    pub async fn fetch_rows(pool: &MySqlPool, sql: &str) -> Result<QueryOutput, FetchError> {
        let (columns, rows) = collect_rows(pool.fetch(sql)).await?;
        let columns = match columns {
            Some(columns) => columns,
            None => {
                let statement = pool.prepare(sql).await.map_err(column_error)?;
                statement
                    .columns()
                    .iter()
                    .map(|c| c.name().to_string())
                    .collect()
            }
        };
        Ok(QueryOutput { columns, rows })
    }
}

mod postgres {
    use super::*;
    use sqlx::{Column, Executor, PgPool, Statement};

    pub async fn fetch_rows(pool: &PgPool, sql: &str) -> Result<QueryOutput, FetchError> {
        let (columns, rows) = collect_rows(pool.fetch(sql)).await?;
        let columns = match columns {
            Some(columns) => columns,
            None => {
                let statement = pool.prepare(sql).await.map_err(column_error)?;
                statement
                    .columns()
                    .iter()
                    .map(|c| c.name().to_string())
                    .collect()
            }
        };
        Ok(QueryOutput { columns, rows })
    }
}

mod sqlite {
    use super::*;
    use sqlx::{Column, Executor, SqlitePool, Statement};

    pub async fn fetch_rows(pool: &SqlitePool, sql: &str) -> Result<QueryOutput, FetchError> {
        let (columns, rows) = collect_rows(pool.fetch(sql)).await?;
        let columns = match columns {
            Some(columns) => columns,
            None => {
                let statement = pool.prepare(sql).await.map_err(column_error)?;
                statement
                    .columns()
                    .iter()
                    .map(|c| c.name().to_string())
                    .collect()
            }
        };
        Ok(QueryOutput { columns, rows })
    }
}
