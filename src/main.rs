//! MCP Engine Server - Rust Implementation
//!
//! Serves the MCP engine over stdio or HTTP with a built-in `echo` tool.

use clap::Parser;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use mcp_engine::config::{Args, Config, Transport};
use mcp_engine::error::Result;
use mcp_engine::mcp::handler::get_string_arg;
use mcp_engine::mcp::protocol::{Tool, ToolAnnotations};
use mcp_engine::mcp::server::McpServer;
use mcp_engine::mcp::transport::StdioTransport;
use mcp_engine::metrics::Metrics;
use mcp_engine::{tool_schema, VERSION};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let default_level = if args.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if args.log_json {
        builder.json().init();
    } else {
        builder.init();
    }

    // Build configuration from args
    let config: Config = args.into();

    info!("MCP Engine v{}", VERSION);
    info!("Transport: {:?}", config.transport);

    let server = Arc::new(McpServer::with_metrics(config.server.clone(), Metrics::new()));
    register_builtin_tools(&server).await;
    info!("Registered {} MCP tools", server.registry().tool_count().await);

    // Start the server based on transport mode
    match config.transport {
        Transport::Stdio => {
            info!("Starting stdio transport...");
            server.run(StdioTransport::stdio()).await?;
        }
        Transport::Http => {
            // HTTP clients cannot receive server-initiated notifications.
            let mut notifications = server.notifications();
            tokio::spawn(async move {
                while let Some(notification) = notifications.recv().await {
                    debug!(method = %notification.method, "Dropping notification over HTTP");
                }
            });

            info!("Starting HTTP transport on port {}...", config.port);
            mcp_engine::http::start_server(&config, server).await?;
        }
    }

    Ok(())
}

async fn register_builtin_tools(server: &McpServer) {
    let echo = Tool::new(
        "echo",
        "Greet someone by name",
        tool_schema!("name": { "type": "string", "description": "Who to greet" }),
    )
    .with_title("Echo")
    .with_annotations(ToolAnnotations {
        read_only_hint: Some(true),
        idempotent_hint: Some(true),
        ..Default::default()
    });

    server
        .register_tool(echo, |args: Value| async move {
            let name = get_string_arg(&args, "name")?;
            Ok(format!("hi, {}", name))
        })
        .await;
}
