//! MCP Engine - Rust Implementation
//!
//! A transport-agnostic Model Context Protocol (MCP) server engine. Hosts
//! register tools, prompts and resources; clients discover and invoke them
//! over JSON-RPC 2.0.
//!
//! # Architecture
//!
//! 1. **Protocol Layer** (`mcp`) - Dispatch, registries, negotiation, notifications
//! 2. **Transport Layer** (`mcp::transport`, `http`) - stdio lines and HTTP POST
//! 3. **Ambient** (`config`, `error`, `metrics`) - Configuration, errors, counters
//!
//! # Example
//!
//! ```
//! use mcp_engine::config::ServerConfig;
//! use mcp_engine::mcp::{McpServer, Outcome, Tool};
//! use serde_json::{json, Value};
//!
//! # tokio_test::block_on(async {
//! let server = McpServer::new(ServerConfig::named("demo"));
//! server
//!     .register_tool(
//!         Tool::new("echo", "Greets a name", json!({"type": "object"})),
//!         |args: Value| async move {
//!             Ok(format!("hi, {}", args["name"].as_str().unwrap_or("stranger")))
//!         },
//!     )
//!     .await;
//!
//! let outcome = server
//!     .handle(r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#)
//!     .await;
//! assert!(matches!(outcome, Outcome::Reply(_)));
//! # });
//! ```

pub mod config;
pub mod error;
pub mod http;
pub mod mcp;
pub mod metrics;

pub use error::{Error, Result};

/// Server version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
