//! Tool registry and dispatch.

use crate::error::{GatewayError, GatewayResult};
use crate::models::{ToolCall, ToolDefinition, ToolErrorKind, ToolInput, ToolResult};
use crate::tools::ToolExecutor;
use futures_util::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// A registered tool: its definition captured at registration, plus the executor.
#[derive(Clone)]
pub struct RegisteredTool {
    pub definition: ToolDefinition,
    pub executor: Arc<dyn ToolExecutor>,
}

impl std::fmt::Debug for RegisteredTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredTool")
            .field("definition", &self.definition)
            .finish_non_exhaustive()
    }
}

/// Mapping from tool name to tool.
///
/// Registration takes `&mut self`, so once the registry is shared behind an
/// `Arc` it is read-only and lookups need no locking.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, RegisteredTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `executor` under `name`, replacing any previous entry.
    pub fn register_tool(&mut self, name: impl Into<String>, executor: Arc<dyn ToolExecutor>) {
        let name = name.into();
        let definition = executor.definition();
        if self
            .tools
            .insert(name.clone(), RegisteredTool { definition, executor })
            .is_some()
        {
            warn!(tool = %name, "Replaced existing tool registration");
        } else {
            debug!(tool = %name, "Registered tool");
        }
    }

    pub fn get_tool(&self, name: &str) -> Option<&RegisteredTool> {
        self.tools.get(name)
    }

    /// Snapshot of all definitions, in no particular order.
    pub fn list_tools(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.definition.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Validate and run one tool.
    ///
    /// Only an unknown tool name is an `Err`. Validation failures come back as
    /// a `validation_error` result without running the tool; an executor that
    /// fails at the transport level yields an `execution_error` result.
    pub async fn execute_tool(&self, name: &str, input: &ToolInput) -> GatewayResult<ToolResult> {
        let tool = self
            .get_tool(name)
            .ok_or_else(|| GatewayError::tool_not_found(name))?;

        if let Err(e) = tool.executor.validate(input) {
            debug!(tool = %name, error = %e, "Tool input rejected");
            return Ok(ToolResult::failure(
                ToolErrorKind::ValidationError,
                format!("Validation error: {}", e),
                e.to_string(),
            ));
        }

        match tool.executor.execute(input).await {
            Ok(result) => Ok(result),
            Err(e) => {
                warn!(tool = %name, error = %e, "Tool execution failed");
                Ok(execution_failure(&e))
            }
        }
    }

    /// Run several calls with at most `concurrency` in flight.
    ///
    /// Results come back in call order, each stamped with its call's id. A
    /// failing call does not affect the others.
    pub async fn execute_tools(&self, calls: &[ToolCall], concurrency: usize) -> Vec<ToolResult> {
        let pending: Vec<_> = calls.iter().map(|call| self.run_call(call)).collect();
        stream::iter(pending)
            .buffered(concurrency.max(1))
            .collect()
            .await
    }

    async fn run_call(&self, call: &ToolCall) -> ToolResult {
        let result = match self.execute_tool(&call.name, &call.input).await {
            Ok(result) => result,
            Err(e) => execution_failure(&e),
        };
        result.with_id(call.id.clone())
    }
}

fn execution_failure(e: &GatewayError) -> ToolResult {
    ToolResult::failure(
        ToolErrorKind::ExecutionError,
        format!("Execution error: {}", e),
        e.to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ToolContent;
    use crate::tools::ValidationError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Echoes `input.text`; sleeps `input.delay_ms` first; fails on `input.boom`.
    #[derive(Default)]
    struct EchoTool {
        executions: AtomicUsize,
    }

    #[async_trait]
    impl ToolExecutor for EchoTool {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition {
                name: "echo".to_string(),
                description: "Echo text back".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {"text": {"type": "string"}},
                    "required": ["text"]
                }),
            }
        }

        fn validate(&self, input: &ToolInput) -> Result<(), ValidationError> {
            match input.get("text") {
                Some(serde_json::Value::String(_)) => Ok(()),
                _ => Err(ValidationError::NotAString),
            }
        }

        async fn execute(&self, input: &ToolInput) -> GatewayResult<ToolResult> {
            self.executions.fetch_add(1, Ordering::SeqCst);
            if let Some(ms) = input.get("delay_ms").and_then(|v| v.as_u64()) {
                tokio::time::sleep(Duration::from_millis(ms)).await;
            }
            if input.contains_key("boom") {
                return Err(GatewayError::internal("boom"));
            }
            let text = input.get("text").and_then(|v| v.as_str()).unwrap_or_default();
            Ok(ToolResult::text(text))
        }
    }

    fn input(value: serde_json::Value) -> ToolInput {
        value.as_object().cloned().unwrap()
    }

    fn registry_with_echo() -> (ToolRegistry, Arc<EchoTool>) {
        let tool = Arc::new(EchoTool::default());
        let mut registry = ToolRegistry::new();
        registry.register_tool("echo", tool.clone());
        (registry, tool)
    }

    #[tokio::test]
    async fn test_unknown_tool_is_error() {
        let (registry, _) = registry_with_echo();
        let err = registry
            .execute_tool("nonexistent", &ToolInput::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "tool 'nonexistent' not found");
    }

    #[tokio::test]
    async fn test_validation_failure_skips_execute() {
        let (registry, tool) = registry_with_echo();
        let result = registry.execute_tool("echo", &ToolInput::new()).await.unwrap();

        assert!(result.is_error);
        assert_eq!(result.error_kind(), Some(ToolErrorKind::ValidationError));
        assert_eq!(result.first_text(), Some("Validation error: query must be a string"));
        assert_eq!(tool.executions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_successful_result_passes_through() {
        let (registry, _) = registry_with_echo();
        let result = registry
            .execute_tool("echo", &input(json!({"text": "hi"})))
            .await
            .unwrap();
        assert!(!result.is_error);
        assert_eq!(result.content, vec![ToolContent::text("hi")]);
    }

    #[tokio::test]
    async fn test_executor_error_becomes_execution_error() {
        let (registry, _) = registry_with_echo();
        let result = registry
            .execute_tool("echo", &input(json!({"text": "x", "boom": true})))
            .await
            .unwrap();
        assert!(result.is_error);
        assert_eq!(result.error_kind(), Some(ToolErrorKind::ExecutionError));
        assert_eq!(
            result.first_text(),
            Some("Execution error: Internal error: boom")
        );
    }

    #[tokio::test]
    async fn test_register_overwrites() {
        let (mut registry, _) = registry_with_echo();
        registry.register_tool("echo", Arc::new(EchoTool::default()));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.list_tools()[0].name, "echo");
        assert!(registry.get_tool("echo").is_some());
        assert!(registry.get_tool("other").is_none());
    }

    #[tokio::test]
    async fn test_execute_tools_preserves_order() {
        let (registry, _) = registry_with_echo();
        let calls = vec![
            ToolCall::new("a", "echo", input(json!({"text": "first", "delay_ms": 50}))),
            ToolCall::new("b", "missing", ToolInput::new()),
            ToolCall::new("c", "echo", input(json!({"text": "third"}))),
            ToolCall::new("d", "echo", ToolInput::new()),
        ];

        let results = registry.execute_tools(&calls, 4).await;

        let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d"]);
        assert_eq!(results[0].first_text(), Some("first"));
        assert_eq!(results[1].error_kind(), Some(ToolErrorKind::ExecutionError));
        assert_eq!(
            results[1].first_text(),
            Some("Execution error: tool 'missing' not found")
        );
        assert_eq!(results[2].first_text(), Some("third"));
        assert_eq!(results[3].error_kind(), Some(ToolErrorKind::ValidationError));
    }

    #[tokio::test]
    async fn test_execute_tools_zero_concurrency_still_runs() {
        let (registry, tool) = registry_with_echo();
        let calls = vec![ToolCall::new("a", "echo", input(json!({"text": "x"})))];
        let results = registry.execute_tools(&calls, 0).await;
        assert_eq!(results.len(), 1);
        assert_eq!(tool.executions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_execute_tools_runs_on_spawned_task() {
        let (registry, _) = registry_with_echo();
        let registry = Arc::new(registry);
        let calls = vec![
            ToolCall::new("a", "echo", input(json!({"text": "one"}))),
            ToolCall::new("b", "echo", input(json!({"text": "two"}))),
        ];

        let handle = tokio::spawn(async move { registry.execute_tools(&calls, 2).await });
        let results = handle.await.unwrap();

        assert_eq!(results[0].first_text(), Some("one"));
        assert_eq!(results[1].first_text(), Some("two"));
    }
}
