//! The `initialize` handshake.

use serde_json::Value;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::error::{Error, Result};
use crate::mcp::protocol::{
    Implementation, InitializeParams, InitializeResult, PromptsCapability, ResourcesCapability,
    ServerCapabilities, ToolsCapability, MCP_VERSION,
};

/// Validates client handshakes and describes the server.
///
/// Repeated `initialize` calls are accepted and answered identically; they do
/// not touch the registries.
#[derive(Debug, Clone)]
pub struct Negotiator {
    info: Implementation,
    config: ServerConfig,
}

impl Negotiator {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            info: Implementation {
                name: config.name.clone(),
                version: config.version.clone(),
            },
            config: config.clone(),
        }
    }

    pub fn server_info(&self) -> &Implementation {
        &self.info
    }

    /// The capability object, with `progress` reflecting the hub's current state.
    pub fn capabilities(&self, progress_enabled: bool) -> ServerCapabilities {
        ServerCapabilities {
            tools: ToolsCapability {
                list_changed: self.config.tools_list_changed,
            },
            prompts: PromptsCapability {
                list_changed: self.config.prompts_list_changed,
            },
            resources: ResourcesCapability {
                subscribe: self.config.resources_subscribe,
                list_changed: self.config.resources_list_changed,
            },
            progress: progress_enabled,
        }
    }

    /// Check the client's params and build the initialize result.
    ///
    /// Any well-formed protocol version string is accepted; a mismatch is only
    /// logged.
    pub fn initialize(&self, params: Option<Value>, progress_enabled: bool) -> Result<InitializeResult> {
        let params = params.ok_or_else(|| Error::InvalidInitialize("missing params".to_string()))?;
        let params: InitializeParams =
            serde_json::from_value(params).map_err(|e| Error::InvalidInitialize(e.to_string()))?;

        if params.protocol_version != MCP_VERSION {
            warn!(
                client = %params.protocol_version,
                server = MCP_VERSION,
                "Protocol version mismatch, continuing"
            );
        }
        info!(
            client = %params.client_info.name,
            version = %params.client_info.version,
            "Client initializing"
        );

        Ok(InitializeResult {
            protocol_version: MCP_VERSION.to_string(),
            capabilities: self.capabilities(progress_enabled),
            server_info: self.info.clone(),
        })
    }
}
