//! Integration tests for the database_query tool through the engine.
//!
//! Tests verify that:
//! - Result documents have the expected shape and values
//! - Policy violations are reported before execution
//! - Database failures come back as structured query errors
//! - Batches keep their order and isolate failures

mod common;

use common::{ContactsDb, query_input};
use data_chatter::models::{ToolCall, ToolErrorKind, ToolInput, ToolResult};
use serde_json::{Value, json};

fn document(result: &ToolResult) -> Value {
    assert!(!result.is_error, "unexpected error: {:?}", result.error);
    serde_json::from_str(result.first_text().unwrap()).unwrap()
}

#[tokio::test]
async fn test_select_literal_document() {
    let db = ContactsDb::new().await;
    let engine = db.engine();

    let result = engine
        .execute_tool("database_query", &query_input("SELECT 1 as x"))
        .await
        .unwrap();

    assert_eq!(
        document(&result),
        json!({"query": "SELECT 1 as x", "columns": ["x"], "row_count": 1, "data": [{"x": 1}]})
    );
}

#[tokio::test]
async fn test_monday_contacts() {
    let db = ContactsDb::new().await;
    let engine = db.engine();

    let query =
        "SELECT name, phone_number FROM contacts WHERE days_available LIKE '%Monday%'";
    let result = engine
        .execute_tool("database_query", &query_input(query))
        .await
        .unwrap();
    let doc = document(&result);

    assert_eq!(doc["row_count"], 3);
    assert_eq!(doc["columns"], json!(["name", "phone_number"]));
    let data = doc["data"].as_array().unwrap();
    assert_eq!(data.len(), 3);
    for row in data {
        let keys: Vec<&String> = row.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["name", "phone_number"]);
    }
}

#[tokio::test]
async fn test_null_and_blob_values() {
    let db = ContactsDb::new().await;
    let engine = db.engine();

    let result = engine
        .execute_tool(
            "database_query",
            &query_input("SELECT avatar, notes FROM contacts WHERE name = 'Alice'"),
        )
        .await
        .unwrap();
    let doc = document(&result);

    assert_eq!(doc["data"][0]["avatar"], "alice");
    assert_eq!(doc["data"][0]["notes"], Value::Null);
}

#[tokio::test]
async fn test_repeated_query_is_identical() {
    let db = ContactsDb::new().await;
    let engine = db.engine();
    let input = query_input("SELECT * FROM contacts ORDER BY id");

    let first = document(&engine.execute_tool("database_query", &input).await.unwrap());
    let second = document(&engine.execute_tool("database_query", &input).await.unwrap());

    assert_eq!(first["row_count"], 4);
    assert_eq!(first["row_count"], second["row_count"]);
    assert_eq!(first["data"], second["data"]);
}

#[tokio::test]
async fn test_empty_result_keeps_columns() {
    let db = ContactsDb::new().await;
    let engine = db.engine();

    let result = engine
        .execute_tool(
            "database_query",
            &query_input("SELECT name FROM contacts WHERE name = 'Nobody'"),
        )
        .await
        .unwrap();
    let doc = document(&result);

    assert_eq!(doc["row_count"], 0);
    assert_eq!(doc["columns"], json!(["name"]));
    assert_eq!(doc["data"], json!([]));
}

#[tokio::test]
async fn test_limit_is_passed_through() {
    let db = ContactsDb::new().await;
    let engine = db.engine();

    let result = engine
        .execute_tool(
            "database_query",
            &query_input("select name from contacts order by name limit 2"),
        )
        .await
        .unwrap();
    let doc = document(&result);

    assert_eq!(doc["query"], "select name from contacts order by name limit 2");
    assert_eq!(doc["data"], json!([{"name": "Alice"}, {"name": "Bob"}]));
}

#[tokio::test]
async fn test_missing_table_is_query_error() {
    let db = ContactsDb::new().await;
    let engine = db.engine();

    let result = engine
        .execute_tool("database_query", &query_input("SELECT * FROM ghosts"))
        .await
        .unwrap();

    assert!(result.is_error);
    assert_eq!(result.error_kind(), Some(ToolErrorKind::QueryError));
    assert!(result
        .first_text()
        .unwrap()
        .starts_with("Query execution failed: "));
}

#[tokio::test]
async fn test_policy_violations() {
    let db = ContactsDb::new().await;
    let engine = db.engine();

    let cases = [
        ("", "query cannot be empty"),
        ("DELETE FROM contacts", "only SELECT queries are allowed"),
        ("SELECT * FROM updates", "query contains forbidden keyword: UPDATE"),
        ("select 1; drop table contacts", "query contains forbidden keyword: DROP"),
    ];

    for (query, message) in cases {
        let result = engine
            .execute_tool("database_query", &query_input(query))
            .await
            .unwrap();
        assert!(result.is_error, "{query}");
        assert_eq!(result.error_kind(), Some(ToolErrorKind::ValidationError));
        assert_eq!(result.error.as_ref().unwrap().message, message);
        assert_eq!(
            result.first_text().unwrap(),
            format!("Validation error: {message}")
        );
    }

    // The table is untouched
    let count = engine
        .execute_tool("database_query", &query_input("SELECT COUNT(*) AS n FROM contacts"))
        .await
        .unwrap();
    assert_eq!(document(&count)["data"][0]["n"], 4);
}

#[tokio::test]
async fn test_dispatch_errors() {
    let db = ContactsDb::new().await;
    let engine = db.engine();

    let err = engine
        .execute_tool("nonexistent", &ToolInput::new())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "tool 'nonexistent' not found");

    let result = engine
        .execute_tool("database_query", &ToolInput::new())
        .await
        .unwrap();
    assert!(result.is_error);
    assert_eq!(result.error_kind(), Some(ToolErrorKind::ValidationError));
}

#[tokio::test]
async fn test_batch_order_and_isolation() {
    let db = ContactsDb::new().await;
    let engine = db.engine();

    let calls = vec![
        ToolCall::new(
            "call_a",
            "database_query",
            query_input("SELECT name FROM contacts WHERE id = 1"),
        ),
        ToolCall::new("call_b", "unknown_tool", ToolInput::new()),
        ToolCall::new(
            "call_c",
            "database_query",
            query_input("SELECT name FROM contacts WHERE id = 3"),
        ),
    ];

    let results = engine.execute_tools(&calls).await;

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].id, "call_a");
    assert_eq!(document(&results[0])["data"][0]["name"], "Alice");
    assert_eq!(results[1].id, "call_b");
    assert_eq!(results[1].error_kind(), Some(ToolErrorKind::ExecutionError));
    assert_eq!(results[2].id, "call_c");
    assert_eq!(document(&results[2])["data"][0]["name"], "Carol");
}

#[tokio::test]
async fn test_read_only_connection_refuses_writes_even_if_unvalidated() {
    let db = ContactsDb::new().await;
    let err = data_chatter::db::fetch_rows(db.connection.pool(), "DELETE FROM contacts")
        .await
        .unwrap_err();
    assert!(err.cause().to_lowercase().contains("readonly"));
}
