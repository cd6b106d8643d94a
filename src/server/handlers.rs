//! HTTP request handlers.
//!
//! Every body is JSON. Errors use the `{message, error}` envelope from
//! [`ApiResponse`]; successful tool and query replies return their documents
//! directly.

use crate::error::{ApiResponse, GatewayError};
use crate::llm::LlmReply;
use crate::models::{
    QueryRequest, ToolCall, ToolExecutionRequest, ToolExecutionResponse, ToolResult,
};
use crate::server::AppState;
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, error, info, warn};

type JsonBody<T> = Result<Json<T>, JsonRejection>;

fn reply(status: StatusCode, message: &str, error: impl Into<String>) -> Response {
    (status, Json(ApiResponse::failure(message, error))).into_response()
}

fn invalid_format(rejection: JsonRejection) -> Response {
    debug!(error = %rejection.body_text(), "Rejected request body");
    reply(
        StatusCode::BAD_REQUEST,
        "Invalid request format",
        rejection.body_text(),
    )
}

// =============================================================================
// General
// =============================================================================

pub async fn home() -> Json<ApiResponse> {
    Json(ApiResponse::ok(
        "Welcome to Data Chatter API",
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "endpoints": {
                "health": "/health",
                "api": "/api/",
                "tools": "/tools",
                "tools_execute": "/tools/execute",
                "tools_single": "/tools/single",
                "db_query": "/db/query",
                "db_schema": "/db/schema",
                "llm_message": "/llm/message"
            }
        }),
    ))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub uptime: String,
    pub database: String,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let (status, database) = match state.engine.connection().health().await {
        Ok(()) => ("healthy", "ok".to_string()),
        Err(e) => {
            warn!(error = %e, "Health check failed");
            ("degraded", e.to_string())
        }
    };

    Json(HealthResponse {
        status,
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        uptime: format_uptime(state.started_at.elapsed()),
        database,
    })
}

/// `1h2m3s` style, hours unbounded.
pub fn format_uptime(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{}h{}m{}s", secs / 3600, (secs % 3600) / 60, secs % 60)
}

pub async fn api_echo(method: Method, uri: Uri) -> Json<ApiResponse> {
    Json(ApiResponse::ok(
        "API endpoint reached",
        json!({
            "method": method.as_str(),
            "path": uri.path(),
            "query": uri.query().unwrap_or_default(),
        }),
    ))
}

// =============================================================================
// Tools
// =============================================================================

pub async fn list_tools(State(state): State<AppState>) -> Json<ApiResponse> {
    let tools = state.engine.available_tools();
    Json(ApiResponse::ok("Available tools", json!(tools)))
}

pub async fn execute_tools(
    State(state): State<AppState>,
    body: JsonBody<ToolExecutionRequest>,
) -> Response {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => return invalid_format(rejection),
    };

    if request.tools.is_empty() {
        return reply(
            StatusCode::BAD_REQUEST,
            "No tools provided",
            "At least one tool must be provided",
        );
    }

    info!(count = request.tools.len(), "Executing tool batch");
    let results = state.engine.execute_tools(&request.tools).await;
    Json(ToolExecutionResponse { results }).into_response()
}

pub async fn execute_single_tool(
    State(state): State<AppState>,
    body: JsonBody<ToolCall>,
) -> Response {
    let call = match body {
        Ok(Json(call)) => call,
        Err(rejection) => return invalid_format(rejection),
    };

    if call.name.is_empty() {
        return reply(
            StatusCode::BAD_REQUEST,
            "Tool name is required",
            "Tool name cannot be empty",
        );
    }

    match state.engine.execute_tool(&call.name, &call.input).await {
        Ok(result) => Json(result.with_id(call.id)).into_response(),
        Err(e) => e.into_response(),
    }
}

// =============================================================================
// Database
// =============================================================================

pub async fn db_query(State(state): State<AppState>, body: JsonBody<QueryRequest>) -> Response {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => return invalid_format(rejection),
    };

    if request.query.trim().is_empty() {
        return reply(StatusCode::BAD_REQUEST, "Query is required", "Query cannot be empty");
    }

    let tool = state.engine.query_tool();
    if let Err(e) = tool.validate_query(&request.query) {
        return reply(StatusCode::BAD_REQUEST, "Invalid query", e.to_string());
    }

    match tool.run(&request.query).await {
        Ok(document) => Json(document).into_response(),
        Err(e) => {
            warn!(stage = ?e.stage, error = %e.source, "Direct query failed");
            reply(
                StatusCode::UNPROCESSABLE_ENTITY,
                "Query execution failed",
                e.to_string(),
            )
        }
    }
}

pub async fn db_schema(State(state): State<AppState>) -> Response {
    match state.llm.describe_schema().await {
        Ok(schema) => {
            let description = schema.render(state.llm.schema_hint());
            Json(ApiResponse::ok(
                "Database schema",
                json!({
                    "database_type": schema.database_type,
                    "tables": schema.tables,
                    "description": description,
                }),
            ))
            .into_response()
        }
        Err(e) => {
            error!(error = %e, "Schema introspection failed");
            reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to get database schema",
                e.to_string(),
            )
        }
    }
}

// =============================================================================
// LLM
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<ToolResult>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub async fn llm_message(State(state): State<AppState>, body: JsonBody<MessageRequest>) -> Response {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => return invalid_format(rejection),
    };

    if request.message.trim().is_empty() {
        return reply(
            StatusCode::BAD_REQUEST,
            "Message is required",
            "Message cannot be empty",
        );
    }

    let tools = state.engine.available_tools();
    let response = match state.llm.process_message(&request.message, &tools).await {
        Ok(response) => response,
        Err(e @ GatewayError::Configuration { .. }) => {
            return reply(
                StatusCode::BAD_REQUEST,
                "Anthropic API key not configured",
                e.to_string(),
            );
        }
        Err(e) => {
            error!(error = %e, "LLM request failed");
            let status = match e {
                GatewayError::Upstream { .. } => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            return reply(status, "Failed to process message with LLM", e.to_string());
        }
    };

    if let Some(usage) = response.usage {
        debug!(
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            "LLM usage"
        );
    }

    match response.reply {
        LlmReply::ToolUses(calls) => {
            info!(count = calls.len(), "Executing LLM tool calls");
            let mut results = Vec::with_capacity(calls.len());
            for (i, call) in calls.into_iter().enumerate() {
                debug!(index = i + 1, tool = %call.name, "Executing tool call");
                match state.engine.execute_tool(&call.name, &call.input).await {
                    Ok(result) => results.push(result.with_id(call.id)),
                    Err(e) => {
                        warn!(tool = %call.name, error = %e, "Tool call aborted the batch");
                        return reply(
                            StatusCode::INTERNAL_SERVER_ERROR,
                            "Failed to execute tool call",
                            e.to_string(),
                        );
                    }
                }
            }
            Json(MessageResponse {
                message: "Query executed successfully".to_string(),
                results: Some(results),
                error: None,
            })
            .into_response()
        }
        LlmReply::Text(text) => Json(MessageResponse {
            message: text,
            results: None,
            error: None,
        })
        .into_response(),
    }
}
