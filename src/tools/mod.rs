//! Tool implementations.
//!
//! This module contains the tool abstraction and its implementations:
//! - `ToolExecutor`: the contract every tool fulfils
//! - `registry`: name-to-tool mapping with validation-gated dispatch
//! - `database_query`: Execute read-only SELECT queries
//! - `sql_validator`: SQL statement validation for read-only enforcement

pub mod database_query;
pub mod registry;
pub mod sql_validator;

pub use database_query::{DATABASE_QUERY, DatabaseQueryTool};
pub use registry::{RegisteredTool, ToolRegistry};
pub use sql_validator::ValidationError;

use crate::error::GatewayResult;
use crate::models::{ToolDefinition, ToolInput, ToolResult};
use async_trait::async_trait;

/// A named operation invokable by a tool call.
///
/// The registry always calls [`validate`](ToolExecutor::validate) before
/// [`execute`](ToolExecutor::execute). Execution failures the caller should
/// see are returned as `Ok(ToolResult)` with `is_error` set; an `Err` is
/// reserved for failures of the dispatch itself.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    fn definition(&self) -> ToolDefinition;

    fn validate(&self, input: &ToolInput) -> Result<(), ValidationError>;

    async fn execute(&self, input: &ToolInput) -> GatewayResult<ToolResult>;
}
