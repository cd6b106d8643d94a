//! HTTP server for the Data Chatter API.
//!
//! Routes, middleware (CORS, request timeout, optional bearer auth) and
//! graceful shutdown. Handlers live in [`handlers`].

pub mod auth;
pub mod handlers;

pub use auth::AuthConfig;

use crate::db::Connection;
use crate::engine::ToolEngine;
use crate::error::{GatewayError, GatewayResult};
use crate::llm::LlmClient;
use axum::Router;
use axum::http::StatusCode;
use axum::middleware;
use axum::routing::{any, get, post};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tracing::{error, info, warn};

/// Time allowed for in-flight requests after the first shutdown signal.
pub const GRACEFUL_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ToolEngine>,
    pub llm: Arc<LlmClient>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(engine: Arc<ToolEngine>, llm: Arc<LlmClient>) -> Self {
        Self {
            engine,
            llm,
            started_at: Instant::now(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub request_timeout: Duration,
    /// Vendor call timeout; `/llm/message` gets this on top of `request_timeout`.
    pub llm_timeout: Duration,
    pub auth: AuthConfig,
}

/// Build the application router.
pub fn router(state: AppState, options: &ServerOptions) -> Router {
    let api = Router::new()
        .route("/", get(handlers::home))
        .route("/api/{*path}", any(handlers::api_echo))
        .route("/tools", get(handlers::list_tools))
        .route("/tools/execute", post(handlers::execute_tools))
        .route("/tools/single", post(handlers::execute_single_tool))
        .route("/db/query", post(handlers::db_query))
        .route("/db/schema", get(handlers::db_schema))
        .layer(timeout_layer(options.request_timeout));

    let llm = Router::new()
        .route("/llm/message", post(handlers::llm_message))
        .layer(timeout_layer(options.request_timeout + options.llm_timeout));

    let mut protected = api.merge(llm);
    if options.auth.is_enabled() {
        info!(tokens = options.auth.token_count(), "Bearer authentication enabled");
        protected = protected.route_layer(middleware::from_fn_with_state(
            Arc::new(options.auth.clone()),
            auth::auth_middleware,
        ));
    }

    let public = Router::new()
        .route("/health", get(handlers::health))
        .layer(timeout_layer(options.request_timeout));

    protected
        .merge(public)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Requests that outlive `timeout` are answered with 504, like `GatewayError::Timeout`.
fn timeout_layer(timeout: Duration) -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::GATEWAY_TIMEOUT, timeout)
}

/// Bind `bind_addr` and serve until a shutdown signal, then close the pool.
pub async fn run(bind_addr: &str, app: Router, connection: Arc<Connection>) -> GatewayResult<()> {
    let listener = TcpListener::bind(bind_addr).await.map_err(|e| {
        GatewayError::connection(
            format!("Failed to bind to {}: {}", bind_addr, e),
            "Check that the port is available",
        )
    })?;
    info!(addr = %bind_addr, "HTTP server listening");

    serve(listener, app, wait_for_signal()).await?;

    info!("Closing database connections");
    connection.close().await;
    Ok(())
}

/// Serve on `listener` until `shutdown` resolves.
///
/// After `shutdown`, in-flight requests get [`GRACEFUL_TIMEOUT`] to finish; a
/// second signal ends the drain immediately.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> GatewayResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let shutdown_notify = Arc::new(tokio::sync::Notify::new());
    let notify = shutdown_notify.clone();

    let shutdown_signal = async move {
        shutdown.await;
        notify.notify_one();
    };

    let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal);

    tokio::select! {
        result = server => {
            match result {
                Ok(()) => info!("HTTP server stopped"),
                Err(e) => {
                    error!(error = %e, "HTTP server error");
                    return Err(GatewayError::internal(format!("HTTP server error: {}", e)));
                }
            }
        }
        _ = async {
            shutdown_notify.notified().await;
            info!(
                timeout_secs = GRACEFUL_TIMEOUT.as_secs(),
                "Waiting for connections to close (send signal again to force exit)..."
            );

            tokio::select! {
                _ = tokio::time::sleep(GRACEFUL_TIMEOUT) => {
                    warn!("Graceful shutdown timeout, forcing exit");
                }
                _ = wait_for_signal() => {
                    warn!("Received second signal, forcing immediate exit");
                }
            }
        } => {}
    }

    Ok(())
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
pub async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
