//! Anthropic Messages API transport.

use crate::error::{GatewayError, GatewayResult};
use crate::models::{ToolDefinition, ToolInput, ToolUsage};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub const ANTHROPIC_VERSION: &str = "2023-06-01";

const MISSING_KEY_MESSAGE: &str = "ANTHROPIC_API_KEY environment variable is not set. \
Please set your Anthropic API key: export ANTHROPIC_API_KEY=your_api_key_here";

// =============================================================================
// API Wire Types
// =============================================================================

#[derive(Debug, Serialize)]
pub struct MessagesRequest<'a> {
    pub model: &'a str,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub system: &'a str,
    pub messages: Vec<ApiMessage<'a>>,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    pub tools: &'a [ToolDefinition],
}

#[derive(Debug, Serialize)]
pub struct ApiMessage<'a> {
    pub role: &'static str,
    pub content: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessagesResponse {
    #[serde(default)]
    pub content: Vec<ResponseBlock>,
    #[serde(default)]
    pub stop_reason: Option<String>,
    #[serde(default)]
    pub usage: Option<ToolUsage>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseBlock {
    Text {
        #[serde(default)]
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Option<ToolInput>,
    },
    #[serde(other)]
    Unknown,
}

// =============================================================================
// Client
// =============================================================================

/// Thin client for one Messages endpoint.
pub struct AnthropicApi {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    max_tokens: u32,
}

impl AnthropicApi {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        max_tokens: u32,
        timeout: Duration,
    ) -> GatewayResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: model.into(),
            max_tokens,
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Fail fast when no credential is configured.
    pub fn require_api_key(&self) -> GatewayResult<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| GatewayError::configuration(MISSING_KEY_MESSAGE))
    }

    /// Send one single-turn request.
    pub async fn send(
        &self,
        system: &str,
        user_message: &str,
        tools: &[ToolDefinition],
    ) -> GatewayResult<MessagesResponse> {
        let api_key = self.require_api_key()?;

        let request = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system,
            messages: vec![ApiMessage {
                role: "user",
                content: user_message,
            }],
            tools,
        };

        debug!(model = %self.model, tools = tools.len(), "Sending LLM request");

        let response = self
            .client
            .post(&self.base_url)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| GatewayError::upstream(0, format!("failed to send request: {}", e)))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            GatewayError::upstream(status.as_u16(), format!("failed to read response: {}", e))
        })?;

        if !status.is_success() {
            return Err(GatewayError::upstream(status.as_u16(), body));
        }

        serde_json::from_str(&body).map_err(|e| GatewayError::parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_shape() {
        let tools = vec![ToolDefinition {
            name: "database_query".to_string(),
            description: "d".to_string(),
            input_schema: json!({"type": "object"}),
        }];
        let request = MessagesRequest {
            model: "m",
            max_tokens: 1000,
            system: "sys",
            messages: vec![ApiMessage {
                role: "user",
                content: "hello",
            }],
            tools: &tools,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "m");
        assert_eq!(value["max_tokens"], 1000);
        assert_eq!(value["system"], "sys");
        assert_eq!(value["messages"][0], json!({"role": "user", "content": "hello"}));
        assert_eq!(value["tools"][0]["name"], "database_query");
    }

    #[test]
    fn test_response_blocks() {
        let response: MessagesResponse = serde_json::from_value(json!({
            "content": [
                {"type": "text", "text": "Looking up"},
                {"type": "tool_use", "id": "toolu_1", "name": "database_query", "input": {"query": "SELECT 1"}},
                {"type": "thinking", "thinking": "..."}
            ],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 10, "output_tokens": 5}
        }))
        .unwrap();

        assert_eq!(response.content.len(), 3);
        assert!(matches!(response.content[1], ResponseBlock::ToolUse { ref id, .. } if id == "toolu_1"));
        assert_eq!(response.content[2], ResponseBlock::Unknown);
        assert_eq!(response.stop_reason.as_deref(), Some("tool_use"));
        assert_eq!(response.usage.unwrap().output_tokens, 5);
    }

    #[tokio::test]
    async fn test_missing_key_is_configuration_error() {
        let api = AnthropicApi::new("http://127.0.0.1:9", Some("  ".to_string()), "m", 10, Duration::from_secs(1))
            .unwrap();
        assert!(!api.has_api_key());
        let err = api.send("sys", "hi", &[]).await.unwrap_err();
        assert!(matches!(err, GatewayError::Configuration { .. }));
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"));
    }
}
