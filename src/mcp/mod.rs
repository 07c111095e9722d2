//! Model Context Protocol (MCP) implementation.
//!
//! This module provides a transport-agnostic MCP server engine: JSON-RPC
//! message handling, capability negotiation, tool/prompt/resource registries
//! and the outbound notification channel.
//!
//! # Architecture
//!
//! - `protocol` - Core MCP types and message definitions
//! - `content` - Polymorphic result content
//! - `registry` - Tools, prompts, resources and subscriptions
//! - `negotiator` - The `initialize` handshake
//! - `notifications` / `progress` - Server-initiated notifications
//! - `server` - Message dispatch
//! - `transport` - Line transport (stdio)

pub mod content;
pub mod handler;
pub mod negotiator;
pub mod notifications;
pub mod progress;
pub mod prompts;
pub mod protocol;
pub mod registry;
pub mod resources;
pub mod server;
pub mod transport;

pub use content::{Content, ResourceContents, Role};
pub use handler::{ToolHandler, ToolHandlerKind};
pub use notifications::NotificationHub;
pub use progress::{ProgressReporter, ProgressToken};
pub use prompts::{Prompt, PromptArgument, PromptMessage, PromptTemplate};
pub use protocol::*;
pub use resources::{Resource, ResourceTemplate};
pub use server::{McpServer, Outcome};
pub use transport::{LineTransport, StdioTransport, Transport};
