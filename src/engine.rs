//! Tool engine: one connection wired into one registry.

use crate::config::ValidationMode;
use crate::db::Connection;
use crate::error::GatewayResult;
use crate::models::{ToolCall, ToolDefinition, ToolInput, ToolResult};
use crate::tools::{DATABASE_QUERY, DatabaseQueryTool, ToolRegistry};
use std::sync::Arc;
use tracing::info;

/// Owns the tool registry and the database connection behind it.
pub struct ToolEngine {
    registry: ToolRegistry,
    query_tool: Arc<DatabaseQueryTool>,
    connection: Arc<Connection>,
    concurrency: usize,
}

impl ToolEngine {
    /// Build the engine and register `database_query`.
    pub fn new(connection: Arc<Connection>, mode: ValidationMode, concurrency: usize) -> Self {
        let query_tool = Arc::new(DatabaseQueryTool::new(connection.clone(), mode));

        let mut registry = ToolRegistry::new();
        registry.register_tool(DATABASE_QUERY, query_tool.clone());

        info!(
            tools = registry.len(),
            validation_mode = %mode,
            concurrency,
            "Tool engine ready"
        );

        Self {
            registry,
            query_tool,
            connection,
            concurrency: concurrency.max(1),
        }
    }

    pub async fn execute_tool(&self, name: &str, input: &ToolInput) -> GatewayResult<ToolResult> {
        self.registry.execute_tool(name, input).await
    }

    /// Run calls with the configured concurrency bound; results follow call order.
    pub async fn execute_tools(&self, calls: &[ToolCall]) -> Vec<ToolResult> {
        self.registry.execute_tools(calls, self.concurrency).await
    }

    /// Registered tool definitions, sorted by name.
    pub fn available_tools(&self) -> Vec<ToolDefinition> {
        let mut tools = self.registry.list_tools();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    /// The query tool, for callers that need the document rather than a tool result.
    pub fn query_tool(&self) -> &DatabaseQueryTool {
        &self.query_tool
    }

    pub fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }
}
