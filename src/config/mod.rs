//! Configuration management for the MCP engine.

use clap::Parser;
use serde::{Deserialize, Serialize};

/// Command-line arguments for the MCP engine server.
#[derive(Parser, Debug, Clone)]
#[command(name = "mcp-engine")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Transport-agnostic MCP server engine")]
pub struct Args {
    /// Transport mode: stdio or http
    #[arg(short, long, default_value = "stdio", env = "MCP_ENGINE_TRANSPORT")]
    pub transport: Transport,

    /// HTTP port (only for http transport)
    #[arg(short, long, default_value = "3000", env = "MCP_ENGINE_PORT")]
    pub port: u16,

    /// Enable debug logging
    #[arg(short, long, env = "MCP_ENGINE_DEBUG")]
    pub debug: bool,

    /// Emit logs as JSON lines
    #[arg(long, env = "MCP_ENGINE_LOG_JSON")]
    pub log_json: bool,

    /// Server name advertised during initialize
    #[arg(long, default_value = "mcp-engine", env = "MCP_ENGINE_NAME")]
    pub name: String,

    /// Enable progress notifications
    #[arg(long, env = "MCP_ENGINE_PROGRESS")]
    pub progress: bool,

    /// Do not advertise list-changed notifications
    #[arg(long, env = "MCP_ENGINE_NO_LIST_CHANGED")]
    pub no_list_changed: bool,

    /// Do not advertise resource subscriptions
    #[arg(long, env = "MCP_ENGINE_NO_SUBSCRIBE")]
    pub no_subscribe: bool,
}

/// Transport mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    #[default]
    Stdio,
    Http,
}

/// Process configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Transport mode
    pub transport: Transport,
    /// HTTP port
    pub port: u16,
    /// Debug mode
    pub debug: bool,
    /// JSON log output
    #[serde(default)]
    pub log_json: bool,
    /// Engine configuration
    pub server: ServerConfig,
}

/// Engine identity and the capability flags advertised at `initialize`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub name: String,
    pub version: String,
    pub tools_list_changed: bool,
    pub prompts_list_changed: bool,
    pub resources_list_changed: bool,
    pub resources_subscribe: bool,
    /// Enable progress reporting at startup.
    pub progress: bool,
}

impl ServerConfig {
    /// Default flags with a custom server name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "mcp-engine".to_string(),
            version: crate::VERSION.to_string(),
            tools_list_changed: true,
            prompts_list_changed: true,
            resources_list_changed: true,
            resources_subscribe: true,
            progress: false,
        }
    }
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        let list_changed = !args.no_list_changed;
        Self {
            transport: args.transport,
            port: args.port,
            debug: args.debug,
            log_json: args.log_json,
            server: ServerConfig {
                name: args.name,
                version: crate::VERSION.to_string(),
                tools_list_changed: list_changed,
                prompts_list_changed: list_changed,
                resources_list_changed: list_changed,
                resources_subscribe: !args.no_subscribe,
                progress: args.progress,
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            transport: Transport::Stdio,
            port: 3000,
            debug: false,
            log_json: false,
            server: ServerConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_default() {
        assert_eq!(Transport::default(), Transport::Stdio);
    }

    #[test]
    fn test_transport_serialization() {
        let transports = [
            (Transport::Stdio, "\"stdio\""),
            (Transport::Http, "\"http\""),
        ];

        for (transport, expected) in &transports {
            let json = serde_json::to_string(transport).unwrap();
            assert_eq!(json, *expected);
        }
    }

    #[test]
    fn test_config_default_values() {
        let config = Config::default();

        assert_eq!(config.transport, Transport::Stdio);
        assert_eq!(config.port, 3000);
        assert!(!config.debug);
        assert!(!config.log_json);
        assert_eq!(config.server.name, "mcp-engine");
        assert!(config.server.tools_list_changed);
        assert!(config.server.resources_subscribe);
        assert!(!config.server.progress);
    }

    #[test]
    fn test_config_deserialization() {
        let json = r#"{
            "transport": "http",
            "port": 8080,
            "debug": true,
            "server": {
                "name": "demo",
                "version": "1.0.0",
                "tools_list_changed": false,
                "prompts_list_changed": true,
                "resources_list_changed": true,
                "resources_subscribe": false,
                "progress": true
            }
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();

        assert_eq!(config.transport, Transport::Http);
        assert_eq!(config.port, 8080);
        assert!(config.debug);
        assert!(!config.log_json);
        assert_eq!(config.server.name, "demo");
        assert!(!config.server.tools_list_changed);
        assert!(config.server.progress);
    }

    #[test]
    fn test_args_to_config() {
        let args = Args::parse_from([
            "mcp-engine",
            "--transport",
            "http",
            "--port",
            "4000",
            "--name",
            "weather",
            "--progress",
            "--no-subscribe",
        ]);

        let config: Config = args.into();

        assert_eq!(config.transport, Transport::Http);
        assert_eq!(config.port, 4000);
        assert_eq!(config.server.name, "weather");
        assert!(config.server.progress);
        assert!(!config.server.resources_subscribe);
        assert!(config.server.tools_list_changed);
    }

    #[test]
    fn test_args_disable_list_changed() {
        let config: Config = Args::parse_from(["mcp-engine", "--no-list-changed"]).into();
        assert!(!config.server.tools_list_changed);
        assert!(!config.server.prompts_list_changed);
        assert!(!config.server.resources_list_changed);
    }
}
