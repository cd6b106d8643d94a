//! SQL statement validation for read-only enforcement.
//!
//! The default check is a keyword filter: after trimming and upper-casing, the
//! query must start with `SELECT` and must not contain any forbidden keyword
//! anywhere in its text. The substring match is deliberately coarse, so
//! `SELECT * FROM updates` is rejected too.
//!
//! [`ValidationMode::Strict`] runs the keyword filter and then parses the query
//! with [sqlparser](https://docs.rs/sqlparser/) using the engine's dialect,
//! requiring exactly one plain query statement.

use crate::config::ValidationMode;
use crate::models::{DatabaseType, ToolInput};
use serde_json::Value as JsonValue;
use sqlparser::ast::{SetExpr, Statement};
use sqlparser::dialect::{Dialect, MySqlDialect, PostgreSqlDialect, SQLiteDialect};
use sqlparser::parser::Parser;

/// Keywords rejected anywhere in a query, checked in this order.
pub const FORBIDDEN_KEYWORDS: [&str; 7] = [
    "DROP", "DELETE", "UPDATE", "INSERT", "ALTER", "CREATE", "TRUNCATE",
];

/// Why a query was refused before execution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// `query` is missing or is not a JSON string
    #[error("query must be a string")]
    NotAString,

    #[error("query cannot be empty")]
    Empty,

    #[error("only SELECT queries are allowed")]
    NotSelect,

    #[error("query contains forbidden keyword: {0}")]
    ForbiddenKeyword(&'static str),

    /// Strict mode only
    #[error("query must be a single read-only SELECT statement: {0}")]
    NotSingleQuery(String),
}

/// Extract the `query` string from a tool input object.
pub fn query_from_input(input: &ToolInput) -> Result<&str, ValidationError> {
    match input.get("query") {
        Some(JsonValue::String(query)) => Ok(query.as_str()),
        _ => Err(ValidationError::NotAString),
    }
}

/// Validate SQL for read-only execution.
///
/// # Examples
///
/// ```
/// use data_chatter::config::ValidationMode;
/// use data_chatter::models::DatabaseType;
/// use data_chatter::tools::sql_validator::{ValidationError, validate_query};
///
/// assert!(validate_query("SELECT * FROM contacts", ValidationMode::Keyword, DatabaseType::SQLite).is_ok());
/// assert_eq!(
///     validate_query("select * from updates", ValidationMode::Keyword, DatabaseType::SQLite),
///     Err(ValidationError::ForbiddenKeyword("UPDATE")),
/// );
/// ```
pub fn validate_query(
    query: &str,
    mode: ValidationMode,
    db_type: DatabaseType,
) -> Result<(), ValidationError> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty);
    }

    let normalized = trimmed.to_uppercase();
    if !normalized.starts_with("SELECT") {
        return Err(ValidationError::NotSelect);
    }

    if let Some(keyword) = FORBIDDEN_KEYWORDS
        .iter()
        .copied()
        .find(|keyword| normalized.contains(keyword))
    {
        return Err(ValidationError::ForbiddenKeyword(keyword));
    }

    match mode {
        ValidationMode::Keyword => Ok(()),
        ValidationMode::Strict => validate_single_query(trimmed, db_type),
    }
}

/// Get the appropriate SQL dialect for the given database type.
fn get_dialect(db_type: DatabaseType) -> Box<dyn Dialect> {
    match db_type {
        DatabaseType::PostgreSQL => Box::new(PostgreSqlDialect {}),
        DatabaseType::MySQL => Box::new(MySqlDialect {}),
        DatabaseType::SQLite => Box::new(SQLiteDialect {}),
    }
}

fn validate_single_query(sql: &str, db_type: DatabaseType) -> Result<(), ValidationError> {
    let dialect = get_dialect(db_type);
    let statements = Parser::parse_sql(dialect.as_ref(), sql)
        .map_err(|e| ValidationError::NotSingleQuery(e.to_string()))?;

    let statement = match statements.as_slice() {
        [statement] => statement,
        [] => return Err(ValidationError::NotSingleQuery("no statement found".to_string())),
        many => {
            return Err(ValidationError::NotSingleQuery(format!(
                "found {} statements",
                many.len()
            )));
        }
    };

    match statement {
        Statement::Query(query) => {
            // PostgreSQL's SELECT ... INTO creates a table
            if let SetExpr::Select(select) = query.body.as_ref() {
                if select.into.is_some() {
                    return Err(ValidationError::NotSingleQuery(
                        "SELECT INTO is not allowed".to_string(),
                    ));
                }
            }
            Ok(())
        }
        other => Err(ValidationError::NotSingleQuery(format!(
            "found {} statement",
            leading_keyword(&other.to_string())
        ))),
    }
}

fn leading_keyword(sql: &str) -> String {
    sql.split_whitespace()
        .next()
        .unwrap_or("unknown")
        .to_uppercase()
}
