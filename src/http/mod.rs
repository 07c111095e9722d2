//! HTTP binding for the MCP engine.
//!
//! Each `POST /mcp` body is one JSON-RPC message handed to the engine
//! verbatim. Server-initiated notifications are not delivered over HTTP.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::mcp::server::{McpServer, Outcome};

/// HTTP server state.
#[derive(Clone)]
pub struct HttpState {
    server: Arc<McpServer>,
}

/// Build the router.
pub fn router(server: Arc<McpServer>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .route("/mcp", post(handle_message))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(HttpState { server })
}

/// Start the HTTP server.
pub async fn start_server(config: &Config, server: Arc<McpServer>) -> Result<()> {
    let app = router(server);

    let addr = format!("0.0.0.0:{}", config.port);
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .await
        .map_err(|e| Error::HttpServer(e.to_string()))?;

    Ok(())
}

/// Health check endpoint.
async fn health_check(State(state): State<HttpState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "name": state.server.server_info().name,
        "version": crate::VERSION,
        "initialized": state.server.registry().is_initialized().await,
    }))
}

/// Prometheus metrics endpoint.
async fn metrics(State(state): State<HttpState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.server.metrics().to_prometheus(),
    )
}

/// JSON-RPC endpoint.
///
/// The body is taken as a raw string so that malformed JSON reaches the
/// engine and is answered with a JSON-RPC parse error.
async fn handle_message(State(state): State<HttpState>, body: String) -> Response {
    match state.server.handle(&body).await {
        Outcome::Reply(response) => (StatusCode::OK, Json(response)).into_response(),
        Outcome::Silent => StatusCode::ACCEPTED.into_response(),
    }
}
