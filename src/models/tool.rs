//! Tool invocation data models.
//!
//! These types are the stable JSON contract shared by the HTTP API, the tool
//! registry and the LLM vendor's tool-use blocks.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;

/// The `type` tag carried by tool calls.
pub const TOOL_USE: &str = "tool_use";

/// Tool input: a JSON object keyed by parameter name.
pub type ToolInput = serde_json::Map<String, JsonValue>;

/// Definition of a tool as advertised to callers and to the LLM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON-schema-like description of the accepted input object.
    pub input_schema: JsonValue,
}

/// One request to invoke a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default = "default_call_type")]
    pub call_type: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub input: ToolInput,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ToolInput>,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, input: ToolInput) -> Self {
        Self {
            id: id.into(),
            call_type: TOOL_USE.to_string(),
            name: name.into(),
            input,
            metadata: None,
        }
    }
}

fn default_call_type() -> String {
    TOOL_USE.to_string()
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<ToolInput, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<ToolInput>::deserialize(deserializer)?.unwrap_or_default())
}

/// One content item of a tool result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolContent {
    #[serde(rename = "type")]
    pub content_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonValue>,
}

impl ToolContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content_type: "text".to_string(),
            text: text.into(),
            data: None,
        }
    }
}

/// Category of a structured tool failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorKind {
    /// Input rejected before execution.
    ValidationError,
    /// Dispatch failed (for example, unknown tool).
    ExecutionError,
    /// The database reported a failure while running the query.
    QueryError,
}

impl ToolErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ValidationError => "validation_error",
            Self::ExecutionError => "execution_error",
            Self::QueryError => "query_error",
        }
    }
}

impl std::fmt::Display for ToolErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolError {
    #[serde(rename = "type")]
    pub kind: ToolErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Outcome of one tool call. Always well-formed, even on failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    #[serde(default)]
    pub id: String,
    pub content: Vec<ToolContent>,
    pub is_error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<ToolUsage>,
}

impl ToolResult {
    /// Successful result with a single text item.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            content: vec![ToolContent::text(text)],
            is_error: false,
            error: None,
            usage: None,
        }
    }

    /// Failed result: `text` is shown as content, `message` is the raw cause.
    pub fn failure(kind: ToolErrorKind, text: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            content: vec![ToolContent::text(text)],
            is_error: true,
            error: Some(ToolError {
                kind,
                message: message.into(),
            }),
            usage: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Text of the first content item, if any.
    pub fn first_text(&self) -> Option<&str> {
        self.content.first().map(|c| c.text.as_str())
    }

    pub fn error_kind(&self) -> Option<ToolErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }
}

/// Body of `POST /tools/execute`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolExecutionRequest {
    #[serde(default)]
    pub tools: Vec<ToolCall>,
}

/// Reply of `POST /tools/execute`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolExecutionResponse {
    pub results: Vec<ToolResult>,
}
