//! Query-related data models.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A result row: column name to converted value.
pub type Row = serde_json::Map<String, JsonValue>;

/// Document produced by the `database_query` tool.
///
/// Fields are declared in lexicographic order so the serialized document has
/// sorted keys, like the row objects it contains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryDocument {
    pub columns: Vec<String>,
    pub data: Vec<Row>,
    /// Original query text, casing preserved.
    pub query: String,
    pub row_count: usize,
}

impl QueryDocument {
    pub fn new(query: impl Into<String>, columns: Vec<String>, data: Vec<Row>) -> Self {
        Self {
            row_count: data.len(),
            columns,
            data,
            query: query.into(),
        }
    }
}

/// Body of `POST /db/query`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub query: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_document_keys_are_sorted() {
        let mut row = Row::new();
        row.insert("x".to_string(), json!(1));
        let doc = QueryDocument::new("SELECT 1 as x", vec!["x".to_string()], vec![row]);

        let text = serde_json::to_string(&doc).unwrap();
        assert_eq!(
            text,
            r#"{"columns":["x"],"data":[{"x":1}],"query":"SELECT 1 as x","row_count":1}"#
        );
    }

    #[test]
    fn test_empty_document_has_empty_data() {
        let doc = QueryDocument::new("SELECT * FROM t", vec!["a".to_string()], Vec::new());
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["row_count"], 0);
        assert_eq!(value["data"], json!([]));
    }
}
