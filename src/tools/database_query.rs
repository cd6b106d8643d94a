//! Read-only query tool.
//!
//! This module implements the `database_query` tool: it validates a SQL string,
//! runs it unmodified against the connection, and returns the rows as a
//! pretty-printed JSON document. Database failures come back as `query_error`
//! results rather than errors.

use crate::config::ValidationMode;
use crate::db::{Connection, FetchError, fetch_rows};
use crate::error::{GatewayError, GatewayResult};
use crate::models::{QueryDocument, ToolDefinition, ToolErrorKind, ToolInput, ToolResult};
use crate::tools::ToolExecutor;
use crate::tools::sql_validator::{self, ValidationError};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

/// Registered name of the query tool.
pub const DATABASE_QUERY: &str = "database_query";

/// Handler for the `database_query` tool.
pub struct DatabaseQueryTool {
    connection: Arc<Connection>,
    mode: ValidationMode,
}

impl DatabaseQueryTool {
    pub fn new(connection: Arc<Connection>, mode: ValidationMode) -> Self {
        Self { connection, mode }
    }

    /// Check a raw query string against the read-only policy.
    pub fn validate_query(&self, query: &str) -> Result<(), ValidationError> {
        sql_validator::validate_query(query, self.mode, self.connection.db_type())
    }

    /// Run an already validated query and build its result document.
    pub async fn run(&self, query: &str) -> Result<QueryDocument, FetchError> {
        let output = fetch_rows(self.connection.pool(), query).await?;
        info!(row_count = output.rows.len(), "Query executed");
        Ok(QueryDocument::new(query, output.columns, output.rows))
    }
}

#[async_trait]
impl ToolExecutor for DatabaseQueryTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: DATABASE_QUERY.to_string(),
            description: "Execute a read-only SQL SELECT query on the database".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "SQL SELECT query to execute (include LIMIT clause if needed)"
                    }
                },
                "required": ["query"]
            }),
        }
    }

    fn validate(&self, input: &ToolInput) -> Result<(), ValidationError> {
        let query = sql_validator::query_from_input(input)?;
        self.validate_query(query)
    }

    async fn execute(&self, input: &ToolInput) -> GatewayResult<ToolResult> {
        let query = sql_validator::query_from_input(input)
            .map_err(|e| GatewayError::invalid_input(e.to_string()))?;

        match self.run(query).await {
            Ok(document) => {
                let text = serde_json::to_string_pretty(&document)
                    .map_err(|e| GatewayError::internal(format!("Failed to encode result: {}", e)))?;
                Ok(ToolResult::text(text))
            }
            Err(e) => {
                warn!(stage = ?e.stage, error = %e.source, "Query failed");
                Ok(ToolResult::failure(
                    ToolErrorKind::QueryError,
                    e.to_string(),
                    e.cause(),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbPool;
    use crate::config::DatabaseConfig;
    use serde_json::Value as JsonValue;
    use sqlx::Executor;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn tool_with(setup: &str) -> DatabaseQueryTool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        if !setup.is_empty() {
            pool.execute(setup).await.unwrap();
        }
        let config = DatabaseConfig::parse("sqlite::memory:")
            .unwrap()
            .into_connection_config();
        let connection = Connection::from_pool(DbPool::SQLite(pool), config);
        DatabaseQueryTool::new(Arc::new(connection), ValidationMode::Keyword)
    }

    fn input(query: &str) -> ToolInput {
        json!({ "query": query }).as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_definition_shape() {
        let tool = tool_with("").await;
        let def = serde_json::to_value(tool.definition()).unwrap();
        assert_eq!(def["name"], "database_query");
        assert_eq!(def["input_schema"]["type"], "object");
        assert_eq!(def["input_schema"]["required"], json!(["query"]));
        assert_eq!(def["input_schema"]["properties"]["query"]["type"], "string");
    }

    #[tokio::test]
    async fn test_select_literal() {
        let tool = tool_with("").await;
        let result = tool.execute(&input("SELECT 1 as x")).await.unwrap();
        assert!(!result.is_error);

        let doc: JsonValue = serde_json::from_str(result.first_text().unwrap()).unwrap();
        assert_eq!(
            doc,
            json!({"query": "SELECT 1 as x", "columns": ["x"], "row_count": 1, "data": [{"x": 1}]})
        );
    }

    #[tokio::test]
    async fn test_text_is_pretty_printed_with_sorted_keys() {
        let tool = tool_with("").await;
        let result = tool.execute(&input("SELECT 1 as x")).await.unwrap();
        let text = result.first_text().unwrap();
        assert!(text.starts_with("{\n  \"columns\""));
        let columns_at = text.find("\"columns\"").unwrap();
        let row_count_at = text.find("\"row_count\"").unwrap();
        assert!(columns_at < row_count_at);
    }

    #[tokio::test]
    async fn test_query_failure_is_structured() {
        let tool = tool_with("").await;
        let result = tool.execute(&input("SELECT * FROM missing")).await.unwrap();
        assert!(result.is_error);
        assert_eq!(result.error_kind(), Some(ToolErrorKind::QueryError));
        assert!(result.first_text().unwrap().starts_with("Query execution failed: "));
        let message = &result.error.as_ref().unwrap().message;
        assert!(message.contains("no such table"));
    }

    #[tokio::test]
    async fn test_validate_delegates_to_validator() {
        let tool = tool_with("").await;
        assert_eq!(tool.validate(&ToolInput::new()), Err(ValidationError::NotAString));
        assert_eq!(tool.validate(&input("   ")), Err(ValidationError::Empty));
        assert_eq!(
            tool.validate(&input("DELETE FROM contacts")),
            Err(ValidationError::NotSelect)
        );
        assert!(tool.validate(&input("select 1")).is_ok());
    }

    #[tokio::test]
    async fn test_query_casing_is_preserved() {
        let tool = tool_with("CREATE TABLE t (Name TEXT); INSERT INTO t VALUES ('x');").await;
        let doc = tool.run("select Name from t").await.unwrap();
        assert_eq!(doc.query, "select Name from t");
        assert_eq!(doc.columns, vec!["Name"]);
        assert_eq!(doc.row_count, 1);
    }
}
