//! System prompt construction.

use crate::models::DatabaseType;

/// Schema text used when introspection fails.
pub const SCHEMA_UNAVAILABLE: &str = "Failed to get database schema";

pub fn system_prompt(db_type: DatabaseType, schema: &str) -> String {
    format!(
        "You are a database query assistant for a {} database. \
You have access to the following database schema:\n\n{}\n\n\
You MUST use the database_query tool to execute SQL queries based on user requests. \
Never respond with text - only execute tools.",
        db_type.display_name(),
        schema
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_text() {
        let prompt = system_prompt(DatabaseType::PostgreSQL, "Database Schema:\n");
        assert_eq!(
            prompt,
            "You are a database query assistant for a PostgreSQL database. You have access to the \
following database schema:\n\nDatabase Schema:\n\n\nYou MUST use the database_query tool to \
execute SQL queries based on user requests. Never respond with text - only execute tools."
        );
    }

    #[test]
    fn test_engine_names() {
        assert!(system_prompt(DatabaseType::SQLite, "").contains("for a SQLite database"));
        assert!(system_prompt(DatabaseType::MySQL, "").contains("for a MySQL database"));
    }
}
