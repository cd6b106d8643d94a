//! LLM integration.
//!
//! This module turns a free-text user message into either a plain text answer
//! or a list of tool calls:
//! - `anthropic`: Messages API wire types and transport
//! - `prompt`: system prompt construction
//!
//! The system prompt embeds the live database schema, and the tools offered to
//! the model are the registry's own definitions.

pub mod anthropic;
pub mod prompt;

pub use anthropic::{AnthropicApi, MessagesResponse, ResponseBlock};

use crate::config::Config;
use crate::db::{Connection, SchemaInspector};
use crate::error::GatewayResult;
use crate::models::{SchemaDescription, ToolCall, ToolDefinition, ToolUsage};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What the model asked for.
#[derive(Debug, Clone, PartialEq)]
pub enum LlmReply {
    /// Every `tool_use` block, in response order.
    ToolUses(Vec<ToolCall>),
    /// Text blocks joined together; empty when the response had no content.
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LlmResponse {
    pub reply: LlmReply,
    pub stop_reason: Option<String>,
    pub usage: Option<ToolUsage>,
}

impl From<MessagesResponse> for LlmResponse {
    fn from(response: MessagesResponse) -> Self {
        let mut calls = Vec::new();
        let mut text = String::new();

        for block in response.content {
            match block {
                ResponseBlock::ToolUse { id, name, input } => {
                    calls.push(ToolCall::new(id, name, input.unwrap_or_default()));
                }
                ResponseBlock::Text { text: part } => text.push_str(&part),
                ResponseBlock::Unknown => {}
            }
        }

        let reply = if calls.is_empty() {
            LlmReply::Text(text)
        } else {
            LlmReply::ToolUses(calls)
        };

        Self {
            reply,
            stop_reason: response.stop_reason,
            usage: response.usage,
        }
    }
}

/// Bridges user messages to the LLM vendor.
pub struct LlmClient {
    api: AnthropicApi,
    connection: Arc<Connection>,
    schema_tables: Vec<String>,
    schema_hint: Option<String>,
}

impl LlmClient {
    pub fn new(
        api: AnthropicApi,
        connection: Arc<Connection>,
        schema_tables: Vec<String>,
        schema_hint: Option<String>,
    ) -> Self {
        Self {
            api,
            connection,
            schema_tables,
            schema_hint,
        }
    }

    /// Build a client from the process configuration.
    pub fn from_config(config: &Config, connection: Arc<Connection>) -> GatewayResult<Self> {
        let api = AnthropicApi::new(
            config.anthropic_base_url.clone(),
            config.api_key().map(str::to_string),
            config.model.clone(),
            config.max_tokens,
            config.llm_timeout_duration(),
        )?;
        if !api.has_api_key() {
            warn!("ANTHROPIC_API_KEY is not set; /llm/message will be unavailable");
        }

        let schema_tables = config
            .schema_tables
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();

        Ok(Self::new(
            api,
            connection,
            schema_tables,
            config.schema_hint().map(str::to_string),
        ))
    }

    pub fn has_api_key(&self) -> bool {
        self.api.has_api_key()
    }

    pub fn schema_hint(&self) -> Option<&str> {
        self.schema_hint.as_deref()
    }

    /// Describe the configured tables, or every user table when none are configured.
    pub async fn describe_schema(&self) -> GatewayResult<SchemaDescription> {
        SchemaInspector::describe(self.connection.pool(), &self.schema_tables)
            .await
            .map_err(|e| self.connection.resolve_error(e))
    }

    /// Human-readable schema for the system prompt. Never fails.
    pub async fn schema_text(&self) -> String {
        match self.describe_schema().await {
            Ok(schema) => schema.render(self.schema_hint()),
            Err(e) => {
                warn!(error = %e, "Schema introspection failed");
                prompt::SCHEMA_UNAVAILABLE.to_string()
            }
        }
    }

    /// Send `message` with the current schema and `tools`, and classify the reply.
    pub async fn process_message(
        &self,
        message: &str,
        tools: &[ToolDefinition],
    ) -> GatewayResult<LlmResponse> {
        self.api.require_api_key()?;

        let schema = self.schema_text().await;
        debug!(schema = %schema, "Schema info from database");

        let system = prompt::system_prompt(self.connection.db_type(), &schema);
        debug!(system = %system, "System prompt");

        let response: LlmResponse = self.api.send(&system, message, tools).await?.into();

        match &response.reply {
            LlmReply::ToolUses(calls) => info!(
                tool_calls = calls.len(),
                stop_reason = response.stop_reason.as_deref().unwrap_or(""),
                "LLM requested tools"
            ),
            LlmReply::Text(_) => info!(
                stop_reason = response.stop_reason.as_deref().unwrap_or(""),
                "LLM replied with text"
            ),
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> LlmResponse {
        serde_json::from_value::<MessagesResponse>(value).unwrap().into()
    }

    #[test]
    fn test_tool_uses_in_order() {
        let response = parse(json!({
            "content": [
                {"type": "text", "text": "Let me check."},
                {"type": "tool_use", "id": "a", "name": "database_query", "input": {"query": "SELECT 1"}},
                {"type": "tool_use", "id": "b", "name": "database_query", "input": {"query": "SELECT 2"}}
            ],
            "stop_reason": "tool_use"
        }));

        let LlmReply::ToolUses(calls) = response.reply else {
            panic!("expected tool uses");
        };
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].id, "a");
        assert_eq!(calls[0].call_type, "tool_use");
        assert_eq!(calls[0].input["query"], "SELECT 1");
        assert_eq!(calls[1].id, "b");
        assert_eq!(response.stop_reason.as_deref(), Some("tool_use"));
    }

    #[test]
    fn test_text_blocks_joined() {
        let response = parse(json!({
            "content": [
                {"type": "text", "text": "Hello "},
                {"type": "text", "text": "there"}
            ],
            "stop_reason": "end_turn"
        }));
        assert_eq!(response.reply, LlmReply::Text("Hello there".to_string()));
    }

    #[test]
    fn test_empty_content_is_empty_text() {
        let response = parse(json!({"content": [], "stop_reason": "end_turn"}));
        assert_eq!(response.reply, LlmReply::Text(String::new()));
    }

    #[test]
    fn test_tool_use_without_input() {
        let response = parse(json!({
            "content": [{"type": "tool_use", "id": "a", "name": "database_query"}]
        }));
        let LlmReply::ToolUses(calls) = response.reply else {
            panic!("expected tool uses");
        };
        assert!(calls[0].input.is_empty());
        assert_eq!(response.stop_reason, None);
    }
}
