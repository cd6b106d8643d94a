//! Schema-related data models.
//!
//! This module defines the introspected table/column description that is
//! embedded in the LLM system prompt and served by `/db/schema`.

use crate::models::DatabaseType;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescription {
    pub name: String,
    /// Declared type as reported by the engine.
    pub data_type: String,
    pub nullable: bool,
    #[serde(default)]
    pub primary_key: bool,
}

impl ColumnDescription {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable,
            primary_key: false,
        }
    }

    pub fn with_primary_key(mut self, primary_key: bool) -> Self {
        self.primary_key = primary_key;
        self
    }

    /// Render as `- name (type, NULL|NOT NULL[, PRIMARY KEY])`.
    pub fn render(&self) -> String {
        let nullable = if self.nullable { "NULL" } else { "NOT NULL" };
        let primary_key = if self.primary_key { ", PRIMARY KEY" } else { "" };
        format!(
            "- {} ({}, {}{})",
            self.name, self.data_type, nullable, primary_key
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescription {
    pub name: String,
    pub columns: Vec<ColumnDescription>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDescription {
    pub database_type: DatabaseType,
    pub tables: Vec<TableDescription>,
}

impl SchemaDescription {
    /// Render the human-readable schema text given to the LLM.
    ///
    /// ```text
    /// Database Schema:
    /// Table: contacts
    /// Columns:
    /// - id (INTEGER, NULL, PRIMARY KEY)
    /// - name (TEXT, NOT NULL)
    ///
    /// <hint>
    /// ```
    pub fn render(&self, hint: Option<&str>) -> String {
        let mut out = String::from("Database Schema:\n");
        for table in &self.tables {
            let _ = writeln!(out, "Table: {}", table.name);
            out.push_str("Columns:\n");
            for column in &table.columns {
                out.push_str(&column.render());
                out.push('\n');
            }
        }
        if let Some(hint) = hint {
            out.push('\n');
            out.push_str(hint);
        }
        out
    }
}
