//! Schema introspection module.
//!
//! This module describes tables and columns for SQLite, PostgreSQL, and MySQL
//! databases. The result feeds the LLM system prompt and `/db/schema`.
//!
//! # Architecture
//!
//! SQL queries are organized in the `queries` submodule with constants for each
//! database type. Database-specific implementations are in their respective
//! submodules (postgres, mysql, sqlite), each providing the same interface.

use crate::db::pool::DbPool;
use crate::error::{GatewayError, GatewayResult};
use crate::models::{ColumnDescription, SchemaDescription, TableDescription};
use tracing::debug;

/// Schema inspector for database introspection.
pub struct SchemaInspector;

impl SchemaInspector {
    /// Describe the given tables, or every user table when `tables` is empty.
    ///
    /// Tables are described in the order given (alphabetical when listed
    /// from the catalog). A named table without columns is an error.
    pub async fn describe(pool: &DbPool, tables: &[String]) -> GatewayResult<SchemaDescription> {
        let names = if tables.is_empty() {
            Self::list_tables(pool).await?
        } else {
            tables.to_vec()
        };

        let mut described = Vec::with_capacity(names.len());
        for name in names {
            let columns = Self::describe_columns(pool, &name).await?;
            if columns.is_empty() {
                return Err(GatewayError::schema(
                    format!("Table '{}' not found", name),
                    name,
                ));
            }
            described.push(TableDescription { name, columns });
        }

        debug!(count = described.len(), db_type = %pool.db_type(), "Described schema");
        Ok(SchemaDescription {
            database_type: pool.db_type(),
            tables: described,
        })
    }

    /// List user tables (views excluded).
    pub async fn list_tables(pool: &DbPool) -> GatewayResult<Vec<String>> {
        impl_db_dispatch!(pool, {
            MySql(p) => mysql::list_tables(p).await,
            Postgres(p) => postgres::list_tables(p).await,
            SQLite(p) => sqlite::list_tables(p).await,
        })
    }

    /// Describe one table's columns in ordinal order.
    pub async fn describe_columns(
        pool: &DbPool,
        table_name: &str,
    ) -> GatewayResult<Vec<ColumnDescription>> {
        impl_db_dispatch!(pool, {
            MySql(p) => mysql::fetch_columns(p, table_name).await,
            Postgres(p) => postgres::fetch_columns(p, table_name).await,
            SQLite(p) => sqlite::fetch_columns(p, table_name).await,
        })
    }
}

// =============================================================================
// SQL Query Templates
// =============================================================================
//
// Centralized SQL queries for schema introspection. Each database has its own
// submodule with queries adapted to its specific system catalogs.

mod queries {
    pub mod postgres {
        pub const LIST_TABLES: &str = r#"
        SELECT table_name::text AS table_name
        FROM information_schema.tables
        WHERE table_schema = current_schema()
        AND table_type = 'BASE TABLE'
        ORDER BY table_name
        "#;

        pub const DESCRIBE_COLUMNS: &str = r#"
        SELECT
            c.column_name::text AS column_name,
            format_type(a.atttypid, a.atttypmod) AS column_type,
            c.is_nullable::text AS is_nullable,
            CASE WHEN pk.column_name IS NOT NULL THEN true ELSE false END AS is_primary_key
        FROM information_schema.columns c
        JOIN pg_class t ON t.relname = c.table_name
        JOIN pg_namespace n ON n.oid = t.relnamespace AND n.nspname = c.table_schema
        JOIN pg_attribute a ON a.attrelid = t.oid AND a.attname = c.column_name
        LEFT JOIN (
            SELECT kcu.column_name
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
                ON tc.constraint_name = kcu.constraint_name
                AND tc.table_schema = kcu.table_schema
            WHERE tc.table_name = $1
            AND tc.table_schema = current_schema()
            AND tc.constraint_type = 'PRIMARY KEY'
        ) pk ON c.column_name = pk.column_name
        WHERE c.table_name = $1 AND c.table_schema = current_schema()
        ORDER BY c.ordinal_position
        "#;
    }

    pub mod mysql {
        pub const LIST_TABLES: &str = r#"
        SELECT CONVERT(TABLE_NAME USING utf8) AS TABLE_NAME
        FROM information_schema.TABLES
        WHERE TABLE_SCHEMA = DATABASE()
        AND TABLE_TYPE = 'BASE TABLE'
        ORDER BY TABLE_NAME
        "#;

        /// `DESCRIBE` takes no placeholders; the name is quoted as an identifier.
        pub fn describe(table_name: &str) -> String {
            format!("DESCRIBE `{}`", table_name.replace('`', "``"))
        }
    }

    pub mod sqlite {
        pub const LIST_TABLES: &str = r#"
            SELECT name FROM sqlite_master
            WHERE type = 'table'
            AND name NOT LIKE 'sqlite_%'
            ORDER BY name
            "#;
    }
}

// =============================================================================
// Database-Specific Implementations
// =============================================================================

mod postgres {
    use super::*;
    use sqlx::{PgPool, Row};

    pub async fn list_tables(pool: &PgPool) -> GatewayResult<Vec<String>> {
        let rows = sqlx::query(queries::postgres::LIST_TABLES)
            .fetch_all(pool)
            .await?;
        rows.iter()
            .map(|row| row.try_get::<String, _>("table_name").map_err(GatewayError::from))
            .collect()
    }

    pub async fn fetch_columns(
        pool: &PgPool,
        table_name: &str,
    ) -> GatewayResult<Vec<ColumnDescription>> {
        let rows = sqlx::query(queries::postgres::DESCRIBE_COLUMNS)
            .bind(table_name)
            .fetch_all(pool)
            .await?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in &rows {
            let name: String = row.try_get("column_name")?;
            let column_type: String = row.try_get("column_type")?;
            let nullable: String = row.try_get("is_nullable")?;
            let is_pk: bool = row.try_get("is_primary_key")?;
            columns.push(
                ColumnDescription::new(name, column_type, nullable == "YES").with_primary_key(is_pk),
            );
        }
        Ok(columns)
    }
}

mod mysql {
    use super::*;
    use sqlx::{Executor, MySqlPool, Row};

    /// Safely get a string from a MySQL row.
    /// MySQL may return VARBINARY instead of VARCHAR depending on charset configuration.
    fn get_string(row: &sqlx::mysql::MySqlRow, column: &str) -> String {
        row.try_get::<String, _>(column)
            .ok()
            .or_else(|| {
                row.try_get::<Vec<u8>, _>(column)
                    .ok()
                    .and_then(|bytes| String::from_utf8(bytes).ok())
            })
            .unwrap_or_default()
    }

    pub async fn list_tables(pool: &MySqlPool) -> GatewayResult<Vec<String>> {
        let rows = sqlx::query(queries::mysql::LIST_TABLES)
            .fetch_all(pool)
            .await?;
        Ok(rows
            .iter()
            .map(|row| get_string(row, "TABLE_NAME"))
            .filter(|name| !name.is_empty())
            .collect())
    }

    pub async fn fetch_columns(
        pool: &MySqlPool,
        table_name: &str,
    ) -> GatewayResult<Vec<ColumnDescription>> {
        // Text protocol: DESCRIBE is not preparable on every server version.
        let rows = pool
            .fetch_all(queries::mysql::describe(table_name).as_str())
            .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let name = get_string(row, "Field");
                let column_type = get_string(row, "Type");
                let nullable = get_string(row, "Null");
                let is_pk = get_string(row, "Key") == "PRI";
                ColumnDescription::new(name, column_type, nullable == "YES").with_primary_key(is_pk)
            })
            .collect())
    }
}

mod sqlite {
    use super::*;
    use sqlx::{Row, SqlitePool};

    pub async fn list_tables(pool: &SqlitePool) -> GatewayResult<Vec<String>> {
        let rows = sqlx::query(queries::sqlite::LIST_TABLES)
            .fetch_all(pool)
            .await?;
        rows.iter()
            .map(|row| row.try_get::<String, _>("name").map_err(GatewayError::from))
            .collect()
    }

    pub async fn fetch_columns(
        pool: &SqlitePool,
        table_name: &str,
    ) -> GatewayResult<Vec<ColumnDescription>> {
        let pragma_query = format!("PRAGMA table_info('{}')", table_name.replace('\'', "''"));
        let rows = sqlx::query(&pragma_query).fetch_all(pool).await?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in &rows {
            let name: String = row.try_get("name")?;
            let data_type: String = row.try_get("type")?;
            let notnull: i64 = row.try_get("notnull")?;
            let pk: i64 = row.try_get("pk")?;
            columns.push(ColumnDescription::new(name, data_type, notnull == 0).with_primary_key(pk > 0));
        }
        Ok(columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DatabaseType;
    use sqlx::Executor;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn contacts_pool() -> DbPool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        pool.execute(
            "CREATE TABLE contacts (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                phone_number TEXT,
                days_available TEXT
            );
            CREATE TABLE notes (body TEXT);
            CREATE VIEW named AS SELECT name FROM contacts;",
        )
        .await
        .unwrap();
        DbPool::SQLite(pool)
    }

    #[tokio::test]
    async fn test_list_tables_excludes_views() {
        let pool = contacts_pool().await;
        let tables = SchemaInspector::list_tables(&pool).await.unwrap();
        assert_eq!(tables, vec!["contacts", "notes"]);
    }

    #[tokio::test]
    async fn test_describe_selected_table() {
        let pool = contacts_pool().await;
        let schema = SchemaInspector::describe(&pool, &["contacts".to_string()])
            .await
            .unwrap();

        assert_eq!(schema.database_type, DatabaseType::SQLite);
        assert_eq!(schema.tables.len(), 1);
        let columns = &schema.tables[0].columns;
        assert_eq!(columns.len(), 4);
        assert_eq!(columns[0].render(), "- id (INTEGER, NULL, PRIMARY KEY)");
        assert_eq!(columns[1].render(), "- name (TEXT, NOT NULL)");
    }

    #[tokio::test]
    async fn test_describe_unknown_table_fails() {
        let pool = contacts_pool().await;
        let err = SchemaInspector::describe(&pool, &["ghosts".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Schema { ref object, .. } if object == "ghosts"));
    }

    #[tokio::test]
    async fn test_quoted_table_name_is_escaped() {
        let pool = contacts_pool().await;
        let columns = SchemaInspector::describe_columns(&pool, "no'such")
            .await
            .unwrap();
        assert!(columns.is_empty());
    }

    #[test]
    fn test_mysql_describe_quotes_identifier() {
        assert_eq!(queries::mysql::describe("contacts"), "DESCRIBE `contacts`");
        assert_eq!(queries::mysql::describe("we`ird"), "DESCRIBE `we``ird`");
    }
}
