//! Data Chatter - Main entry point.
//!
//! This server exposes an HTTP API that answers natural-language questions
//! and direct SQL requests with read-only queries against a SQL database
//! (SQLite, PostgreSQL, MySQL).

use clap::Parser;
use data_chatter::config::Config;
use data_chatter::db::Connection;
use data_chatter::engine::ToolEngine;
use data_chatter::llm::LlmClient;
use data_chatter::server::{self, AppState, AuthConfig, ServerOptions};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber.with(fmt::layer().json()).init();
    } else {
        subscriber
            .with(fmt::layer().with_target(true).with_thread_ids(false))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse configuration from command line and environment
    let config = Config::parse();

    // Initialize logging
    init_tracing(&config);

    info!(
        bind = %config.http_bind_addr(),
        validation_mode = %config.validation_mode,
        "Starting Data Chatter v{}",
        env!("CARGO_PKG_VERSION")
    );

    let auth = AuthConfig::from_tokens(&config.auth_tokens)?;

    let db_config = config.parse_database()?;
    info!(
        db_type = %db_config.db_type,
        writable = db_config.writable,
        "Connecting to database"
    );
    let connection = Arc::new(Connection::connect(db_config.into_connection_config()).await?);

    let engine = Arc::new(ToolEngine::new(
        connection.clone(),
        config.validation_mode,
        config.tool_concurrency,
    ));
    let llm = Arc::new(LlmClient::from_config(&config, connection.clone())?);

    let options = ServerOptions {
        request_timeout: config.request_timeout_duration(),
        llm_timeout: config.llm_timeout_duration(),
        auth,
    };
    let app = server::router(AppState::new(engine, llm), &options);

    if let Err(e) = server::run(&config.http_bind_addr(), app, connection).await {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
