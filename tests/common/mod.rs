//! Shared fixtures for integration tests.

#![allow(dead_code)]

use data_chatter::config::{DatabaseConfig, ValidationMode};
use data_chatter::db::{Connection, DbPool};
use data_chatter::engine::ToolEngine;
use data_chatter::models::ToolInput;
use serde_json::json;
use sqlx::Executor;
use std::sync::Arc;
use tempfile::TempDir;

/// Seed for the contacts table: three people free on Monday, one not.
pub const CONTACTS_SEED: &str = "
    CREATE TABLE contacts (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        phone_number TEXT,
        days_available TEXT,
        avatar BLOB,
        notes TEXT
    );
    INSERT INTO contacts (name, phone_number, days_available, avatar, notes) VALUES
        ('Alice', '555-0101', 'Monday, Tuesday', x'616c696365', NULL),
        ('Bob', '555-0102', 'Wednesday', NULL, 'prefers email'),
        ('Carol', '555-0103', 'Monday, Friday', NULL, NULL),
        ('Dave', '555-0104', 'Sunday, Monday', NULL, NULL);
";

/// A seeded SQLite file reopened read-only through the public API.
pub struct ContactsDb {
    pub connection: Arc<Connection>,
    _dir: TempDir,
}

impl ContactsDb {
    pub async fn new() -> Self {
        Self::with_seed(CONTACTS_SEED).await
    }

    pub async fn with_seed(seed: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}", dir.path().join("contacts.db").display());

        let writable = DatabaseConfig::parse(&format!("{url}?writable=true")).unwrap();
        let seeder = Connection::connect(writable.into_connection_config())
            .await
            .unwrap();
        let DbPool::SQLite(pool) = seeder.pool() else {
            panic!("expected a SQLite pool");
        };
        pool.execute(seed).await.unwrap();
        seeder.close().await;

        let read_only = DatabaseConfig::parse(&url).unwrap();
        let connection = Connection::connect(read_only.into_connection_config())
            .await
            .unwrap();

        Self {
            connection: Arc::new(connection),
            _dir: dir,
        }
    }

    pub fn engine(&self) -> ToolEngine {
        ToolEngine::new(self.connection.clone(), ValidationMode::Keyword, 4)
    }
}

pub fn query_input(query: &str) -> ToolInput {
    json!({ "query": query }).as_object().cloned().unwrap()
}
