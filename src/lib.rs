//! Data Chatter Library
//!
//! An HTTP gateway that turns natural-language and direct SQL requests into
//! guarded, read-only queries against SQL databases (SQLite, PostgreSQL, MySQL).

pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod llm;
pub mod models;
pub mod server;
pub mod tools;

pub use config::Config;
pub use engine::ToolEngine;
pub use error::{GatewayError, GatewayResult};
