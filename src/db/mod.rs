//! Database abstraction layer.
//!
//! This module provides database access functionality:
//! - Connection pool management
//! - Query execution
//! - Schema introspection
//! - Type mappings
//! - Database dispatch macros for reducing code duplication

#[macro_use]
pub mod macros;
pub mod executor;
pub mod pool;
pub mod schema;
pub mod types;

pub use executor::{FetchError, FetchStage, QueryOutput, fetch_rows};
pub use pool::{Connection, DbPool};
pub use schema::SchemaInspector;
