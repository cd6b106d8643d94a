//! Data models for the Data Chatter gateway.
//!
//! This module re-exports all model types used throughout the application.

pub mod connection;
pub mod query;
pub mod schema;
pub mod tool;

// Re-export commonly used types
pub use connection::{ConnectionConfig, DatabaseType};
pub use query::{QueryDocument, QueryRequest, Row};
pub use schema::{ColumnDescription, SchemaDescription, TableDescription};
pub use tool::{
    TOOL_USE, ToolCall, ToolContent, ToolDefinition, ToolError, ToolErrorKind,
    ToolExecutionRequest, ToolExecutionResponse, ToolInput, ToolResult, ToolUsage,
};
