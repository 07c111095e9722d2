//! MCP server implementation.
//!
//! [`McpServer::handle`] is the transport-agnostic entry point: one raw
//! JSON-RPC message in, an [`Outcome`] out. [`McpServer::run`] drives it over
//! a line [`Transport`].

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::error::{Error, Result};
use crate::mcp::content::ResourceContents;
use crate::mcp::handler::{
    guarded, prompt_fn, template_prompt_fn, ResourceHandlerKind, ToolHandler, ToolHandlerKind,
};
use crate::mcp::negotiator::Negotiator;
use crate::mcp::notifications::NotificationHub;
use crate::mcp::progress::ProgressReporter;
use crate::mcp::prompts::{
    GetPromptParams, GetPromptResult, ListPromptsResult, Prompt, PromptMessage, PromptTemplate,
};
use crate::mcp::protocol::*;
use crate::mcp::registry::Registry;
use crate::mcp::resources::{
    ListResourceTemplatesResult, ListResourcesResult, ReadResourceResult, Resource,
    ResourceTemplate, ResourceUriParams,
};
use crate::mcp::transport::{Message, Transport};
use crate::metrics::{Metrics, Timer};

/// What the transport should do with a handled message.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Send this response (success or error) back to the client.
    Reply(JsonRpcResponse),
    /// A well-formed notification was consumed; send nothing.
    Silent,
}

impl Outcome {
    pub fn into_reply(self) -> Option<JsonRpcResponse> {
        match self {
            Self::Reply(response) => Some(response),
            Self::Silent => None,
        }
    }

    pub fn is_silent(&self) -> bool {
        matches!(self, Self::Silent)
    }
}

/// MCP server.
pub struct McpServer {
    registry: Arc<Registry>,
    hub: NotificationHub,
    negotiator: Negotiator,
    metrics: Arc<Metrics>,
}

impl McpServer {
    /// Create a new MCP server.
    pub fn new(config: ServerConfig) -> Self {
        Self::with_metrics(config, Metrics::new())
    }

    /// Create a server that records into a shared metrics collector.
    pub fn with_metrics(config: ServerConfig, metrics: Arc<Metrics>) -> Self {
        let hub = NotificationHub::new();
        if config.progress {
            hub.enable_progress();
        }
        Self {
            registry: Arc::new(Registry::new(hub.clone(), &config)),
            negotiator: Negotiator::new(&config),
            hub,
            metrics,
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn hub(&self) -> &NotificationHub {
        &self.hub
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    pub fn server_info(&self) -> &Implementation {
        self.negotiator.server_info()
    }

    // ===== Host API: notifications =====

    /// Install the outbound notification sink and return its receiver.
    ///
    /// There is one sink at a time. A later call, or [`McpServer::run`],
    /// replaces it and the receiver returned here sees the channel close.
    pub fn notifications(&self) -> mpsc::UnboundedReceiver<JsonRpcNotification> {
        self.hub.subscribe()
    }

    /// Turn on progress reporting; advertised by later `initialize` calls.
    pub fn enable_progress(&self) {
        self.hub.enable_progress();
    }

    // ===== Host API: tools =====

    /// Register a tool whose handler returns plain text.
    pub async fn register_tool<F, Fut>(&self, tool: Tool, handler: F) -> u64
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String>> + Send + 'static,
    {
        self.registry
            .register_tool(tool, ToolHandlerKind::simple(handler))
            .await
    }

    /// Register a tool whose handler builds a full [`ToolResult`].
    pub async fn register_rich_tool<F, Fut>(&self, tool: Tool, handler: F) -> u64
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ToolResult>> + Send + 'static,
    {
        self.registry
            .register_tool(tool, ToolHandlerKind::rich(handler))
            .await
    }

    /// Register a tool whose handler receives a [`ProgressReporter`].
    pub async fn register_progress_tool<F, Fut>(&self, tool: Tool, handler: F) -> u64
    where
        F: Fn(Value, ProgressReporter) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ToolResult>> + Send + 'static,
    {
        self.registry
            .register_tool(tool, ToolHandlerKind::progress(handler))
            .await
    }

    /// Register a struct-based tool under its own definition.
    pub async fn register_handler(&self, handler: Arc<dyn ToolHandler>) -> u64 {
        let tool = handler.definition();
        self.registry
            .register_tool(tool, ToolHandlerKind::from_handler(handler))
            .await
    }

    pub async fn unregister_tool(&self, name: &str) -> bool {
        self.registry.unregister_tool(name).await
    }

    pub async fn set_tool_enabled(&self, name: &str, enabled: bool) -> bool {
        self.registry.set_tool_enabled(name, enabled).await
    }

    pub async fn tool_list_version(&self) -> u64 {
        self.registry.tool_list_version().await
    }

    // ===== Host API: prompts =====

    pub async fn register_prompt<F, Fut>(&self, prompt: Prompt, handler: F)
    where
        F: Fn(HashMap<String, String>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<PromptMessage>>> + Send + 'static,
    {
        self.registry.register_prompt(prompt, prompt_fn(handler)).await
    }

    /// Register a prompt rendered from a `{{placeholder}}` template.
    pub async fn register_prompt_template(&self, prompt: Prompt, template: PromptTemplate) {
        self.registry
            .register_prompt(prompt, template_prompt_fn(template))
            .await
    }

    pub async fn unregister_prompt(&self, name: &str) -> bool {
        self.registry.unregister_prompt(name).await
    }

    // ===== Host API: resources =====

    pub async fn register_resource<F, Fut>(&self, resource: Resource, handler: F)
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ResourceContents>> + Send + 'static,
    {
        self.registry
            .register_resource(resource, ResourceHandlerKind::plain(handler))
            .await
    }

    pub async fn register_progress_resource<F, Fut>(&self, resource: Resource, handler: F)
    where
        F: Fn(String, ProgressReporter) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ResourceContents>> + Send + 'static,
    {
        self.registry
            .register_resource(resource, ResourceHandlerKind::progress(handler))
            .await
    }

    pub async fn unregister_resource(&self, uri: &str) -> bool {
        self.registry.unregister_resource(uri).await
    }

    pub async fn register_resource_template(&self, template: ResourceTemplate) {
        self.registry.register_resource_template(template).await
    }

    pub async fn unregister_resource_template(&self, uri_template: &str) -> bool {
        self.registry.unregister_resource_template(uri_template).await
    }

    /// Emit `notifications/resources/updated` if the client subscribed to `uri`.
    pub async fn notify_resource_updated(&self, uri: &str) -> bool {
        self.registry.notify_resource_updated(uri).await
    }

    // ===== Transport loop =====

    /// Run the server with the given transport.
    ///
    /// Notifications emitted while a request is being handled are written
    /// before that request's response.
    pub async fn run<T: Transport>(&self, mut transport: T) -> Result<()> {
        info!(
            "Starting MCP server: {} v{}",
            self.server_info().name,
            self.server_info().version
        );

        let (mut incoming, outgoing) = transport.start().await?;
        if self.hub.is_installed() {
            warn!("Replacing the host notification sink; notifications now go to the transport");
        }
        let mut notifications = self.hub.subscribe();

        loop {
            tokio::select! {
                line = incoming.recv() => {
                    let Some(line) = line else { break };
                    let outcome = self.handle(&line).await;

                    while let Ok(notification) = notifications.try_recv() {
                        if !self.forward(&outgoing, notification).await {
                            break;
                        }
                    }
                    if let Outcome::Reply(response) = outcome {
                        if outgoing.send(Message::Response(response)).await.is_err() {
                            error!("Failed to send response");
                            break;
                        }
                    }
                }
                Some(notification) = notifications.recv() => {
                    if !self.forward(&outgoing, notification).await {
                        break;
                    }
                }
            }
        }

        self.hub.uninstall();
        transport.stop().await?;
        info!("MCP server stopped");
        Ok(())
    }

    async fn forward(&self, outgoing: &mpsc::Sender<Message>, notification: JsonRpcNotification) -> bool {
        self.metrics.inc_notifications_emitted();
        if outgoing.send(Message::Notification(notification)).await.is_err() {
            error!("Failed to send notification");
            return false;
        }
        true
    }

    // ===== Dispatch =====

    /// Handle one raw JSON-RPC message.
    pub async fn handle(&self, raw: &str) -> Outcome {
        let message: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(e) => {
                debug!("Unparseable message: {}", e);
                return self.reply(JsonRpcResponse::failure(RequestId::UNKNOWN, &Error::Parse));
            }
        };

        let Value::Object(envelope) = message else {
            return self.reply(JsonRpcResponse::failure(
                RequestId::UNKNOWN,
                &Error::InvalidRequest,
            ));
        };

        match envelope.get("id").cloned() {
            None => self.handle_notification(&envelope),
            Some(id) => self.handle_request(id, envelope).await,
        }
    }

    fn reply(&self, response: JsonRpcResponse) -> Outcome {
        self.metrics.inc_requests();
        if response.is_error() {
            self.metrics.inc_failed();
        } else {
            self.metrics.inc_success();
        }
        Outcome::Reply(response)
    }

    /// Handle a message without an `id`.
    fn handle_notification(&self, envelope: &Map<String, Value>) -> Outcome {
        let method = match (envelope.get("jsonrpc"), envelope.get("method")) {
            (Some(Value::String(version)), Some(Value::String(method))) if version == JSONRPC_VERSION => {
                method.as_str()
            }
            _ => {
                return self.reply(JsonRpcResponse::failure(
                    RequestId::UNKNOWN,
                    &Error::InvalidRequest,
                ))
            }
        };

        self.metrics.inc_notifications_received();
        match method {
            methods::INITIALIZED => info!("Client initialized"),
            _ => debug!("Ignoring notification: {}", method),
        }
        Outcome::Silent
    }

    /// Handle a message carrying an `id`.
    async fn handle_request(&self, id: Value, envelope: Map<String, Value>) -> Outcome {
        let id = match serde_json::from_value::<RequestId>(id) {
            Ok(id) => id,
            Err(_) => {
                return self.reply(JsonRpcResponse::failure(
                    RequestId::UNKNOWN,
                    &Error::InvalidRequest,
                ))
            }
        };

        let version_ok = matches!(envelope.get("jsonrpc"), Some(Value::String(v)) if v == JSONRPC_VERSION);
        let method = match envelope.get("method") {
            Some(Value::String(method)) if version_ok => method.clone(),
            _ => return self.reply(JsonRpcResponse::failure(id, &Error::InvalidRequest)),
        };
        let params = envelope.get("params").cloned();

        debug!("Handling request: {} (id: {:?})", method, id);
        let timer = Timer::start();
        let result = self.dispatch(&method, params).await;
        debug!(method = %method, elapsed_ms = timer.elapsed_ms(), ok = result.is_ok(), "Request handled");

        let response = match result {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(e) => {
                if e.code() == error_codes::INTERNAL_ERROR {
                    warn!(method = %method, "Request failed: {}", e);
                }
                JsonRpcResponse::failure(id, &e)
            }
        };
        self.reply(response)
    }

    /// Route a request by method name.
    async fn dispatch(&self, method: &str, params: Option<Value>) -> Result<Value> {
        match method {
            methods::INITIALIZE => return self.handle_initialize(params).await,
            methods::PING => return Ok(json!({})),
            _ => {}
        }

        let gated = matches!(
            method,
            methods::TOOLS_LIST
                | methods::TOOLS_CALL
                | methods::PROMPTS_LIST
                | methods::PROMPTS_GET
                | methods::RESOURCES_LIST
                | methods::RESOURCES_READ
                | methods::RESOURCES_SUBSCRIBE
                | methods::RESOURCES_UNSUBSCRIBE
                | methods::RESOURCES_TEMPLATES_LIST
        );
        if !gated {
            return Err(Error::MethodNotFound(method.to_string()));
        }
        if !self.registry.is_initialized().await {
            return Err(Error::NotInitialized);
        }

        match method {
            // Tools
            methods::TOOLS_LIST => self.handle_list_tools().await,
            methods::TOOLS_CALL => self.handle_call_tool(params).await,
            // Prompts
            methods::PROMPTS_LIST => self.handle_list_prompts().await,
            methods::PROMPTS_GET => self.handle_get_prompt(params).await,
            // Resources
            methods::RESOURCES_LIST => self.handle_list_resources().await,
            methods::RESOURCES_READ => self.handle_read_resource(params).await,
            methods::RESOURCES_SUBSCRIBE => self.handle_subscribe_resource(params).await,
            methods::RESOURCES_UNSUBSCRIBE => self.handle_unsubscribe_resource(params).await,
            methods::RESOURCES_TEMPLATES_LIST => self.handle_list_resource_templates().await,
            _ => Err(Error::MethodNotFound(method.to_string())),
        }
    }

    /// Handle initialize request.
    async fn handle_initialize(&self, params: Option<Value>) -> Result<Value> {
        let result = self
            .negotiator
            .initialize(params, self.hub.progress_enabled())?;
        self.registry.mark_initialized().await;
        to_value(&result)
    }

    /// Handle list tools request.
    async fn handle_list_tools(&self) -> Result<Value> {
        let tools = self.registry.list_tools().await;
        to_value(&ListToolsResult { tools })
    }

    /// Handle call tool request.
    async fn handle_call_tool(&self, params: Option<Value>) -> Result<Value> {
        let params: CallToolParams = parse_params(params)?;
        self.metrics.inc_tool_calls();

        let handler = self
            .registry
            .tool_handler(&params.name)
            .await
            .ok_or_else(|| Error::ToolNotFound(params.name.clone()))?;

        let reporter = self
            .hub
            .reporter(params.meta.and_then(|meta| meta.progress_token));
        let arguments = params.arguments.unwrap_or_else(|| json!({}));

        debug!(tool = %params.name, kind = ?handler.kind(), "Calling tool");
        let result = guarded(handler.invoke(arguments, reporter)).await?;
        to_value(&result)
    }

    /// Handle list prompts request.
    async fn handle_list_prompts(&self) -> Result<Value> {
        let prompts = self.registry.list_prompts().await;
        to_value(&ListPromptsResult {
            prompts,
            next_cursor: None,
        })
    }

    /// Handle get prompt request.
    async fn handle_get_prompt(&self, params: Option<Value>) -> Result<Value> {
        let params: GetPromptParams = parse_params(params)?;

        let (prompt, handler) = self
            .registry
            .prompt(&params.name)
            .await
            .ok_or_else(|| Error::PromptNotFound(params.name.clone()))?;
        prompt.validate_arguments(&params.arguments)?;

        let messages = guarded(handler(params.arguments)).await?;
        to_value(&GetPromptResult {
            description: prompt.description,
            messages,
        })
    }

    /// Handle list resources request.
    async fn handle_list_resources(&self) -> Result<Value> {
        let resources = self.registry.list_resources().await;
        to_value(&ListResourcesResult {
            resources,
            next_cursor: None,
        })
    }

    /// Handle read resource request.
    async fn handle_read_resource(&self, params: Option<Value>) -> Result<Value> {
        let params: ResourceUriParams = parse_params(params)?;

        let handler = self
            .registry
            .resource_handler(&params.uri)
            .await
            .ok_or_else(|| Error::ResourceNotFound(params.uri.clone()))?;
        let reporter = self
            .hub
            .reporter(params.meta.and_then(|meta| meta.progress_token));

        let contents = guarded(handler.invoke(params.uri, reporter)).await?;
        to_value(&ReadResourceResult {
            contents: vec![contents],
        })
    }

    /// Handle subscribe to resource.
    async fn handle_subscribe_resource(&self, params: Option<Value>) -> Result<Value> {
        let params: ResourceUriParams = parse_params(params)?;
        self.registry.subscribe(&params.uri).await?;
        debug!(uri = %params.uri, "Subscribed");
        Ok(json!({}))
    }

    /// Handle unsubscribe from resource.
    async fn handle_unsubscribe_resource(&self, params: Option<Value>) -> Result<Value> {
        let params: ResourceUriParams = parse_params(params)?;
        self.registry.unsubscribe(&params.uri).await?;
        debug!(uri = %params.uri, "Unsubscribed");
        Ok(json!({}))
    }

    async fn handle_list_resource_templates(&self) -> Result<Value> {
        let resource_templates = self.registry.list_resource_templates().await;
        to_value(&ListResourceTemplatesResult {
            resource_templates,
            next_cursor: None,
        })
    }
}

fn parse_params<T: DeserializeOwned>(params: Option<Value>) -> Result<T> {
    params
        .ok_or_else(|| Error::InvalidParams("Missing params".to_string()))
        .and_then(|v| serde_json::from_value(v).map_err(|e| Error::InvalidParams(e.to_string())))
}

fn to_value<T: Serialize>(value: &T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::content::Content;

    fn init_message() -> String {
        json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {
                "protocolVersion": MCP_VERSION,
                "capabilities": {},
                "clientInfo": {"name": "test", "version": "0.0.1"}
            }
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_run_takes_over_notification_sink() {
        use crate::mcp::transport::LineTransport;
        use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt};

        let server = McpServer::new(ServerConfig::named("test"));
        let mut host_rx = server.notifications();
        assert!(server.hub().is_installed());

        let (mut client_in, server_in) = duplex(4096);
        let (server_out, mut client_out) = duplex(4096);
        client_in
            .write_all(format!("{}\n", init_message()).as_bytes())
            .await
            .unwrap();
        drop(client_in);

        server.run(LineTransport::new(server_in, server_out)).await.unwrap();

        assert!(host_rx.recv().await.is_none());
        assert!(!server.hub().is_installed());

        let mut written = String::new();
        client_out.read_to_string(&mut written).await.unwrap();
        let reply: Value = serde_json::from_str(written.lines().next().unwrap()).unwrap();
        assert_eq!(reply["id"], 1);
        assert_eq!(reply["result"]["serverInfo"]["name"], "test");
    }

    async fn initialized_server() -> McpServer {
        let server = McpServer::new(ServerConfig::named("test"));
        let outcome = server.handle(&init_message()).await;
        assert!(!outcome.into_reply().unwrap().is_error());
        server
    }

    async fn call(server: &McpServer, method: &str, params: Value) -> JsonRpcResponse {
        let msg = json!({"jsonrpc": "2.0", "id": 7, "method": method, "params": params});
        server.handle(&msg.to_string()).await.into_reply().unwrap()
    }

    fn error_code(response: &JsonRpcResponse) -> i32 {
        response.error.as_ref().map(|e| e.code).unwrap_or(0)
    }

    #[tokio::test]
    async fn test_parse_error() {
        let server = McpServer::new(ServerConfig::default());
        let response = server.handle("{not json").await.into_reply().unwrap();
        assert_eq!(response.id, RequestId::Number(0));
        assert_eq!(error_code(&response), -32700);
        assert_eq!(response.error.unwrap().message, "Invalid JSON");
    }

    #[tokio::test]
    async fn test_non_object_is_invalid_request() {
        let server = McpServer::new(ServerConfig::default());
        for raw in ["[1, 2]", "42", "\"text\""] {
            let response = server.handle(raw).await.into_reply().unwrap();
            assert_eq!(error_code(&response), -32600);
        }
    }

    #[tokio::test]
    async fn test_notifications_are_silent() {
        let server = McpServer::new(ServerConfig::default());
        let outcome = server
            .handle(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await;
        assert!(outcome.is_silent());

        let outcome = server
            .handle(r#"{"jsonrpc":"2.0","method":"notifications/unknown"}"#)
            .await;
        assert!(outcome.is_silent());
        assert_eq!(server.metrics().snapshot().notifications_received, 2);
    }

    #[tokio::test]
    async fn test_malformed_notification_gets_error() {
        let server = McpServer::new(ServerConfig::default());

        let response = server
            .handle(r#"{"jsonrpc":"1.0","method":"notifications/initialized"}"#)
            .await
            .into_reply()
            .unwrap();
        assert_eq!(response.id, RequestId::Number(0));
        assert_eq!(error_code(&response), -32600);

        let response = server.handle(r#"{"jsonrpc":"2.0"}"#).await.into_reply().unwrap();
        assert_eq!(error_code(&response), -32600);
    }

    #[tokio::test]
    async fn test_request_envelope_validation() {
        let server = McpServer::new(ServerConfig::default());

        let response = server
            .handle(r#"{"jsonrpc":"1.0","id":5,"method":"ping"}"#)
            .await
            .into_reply()
            .unwrap();
        assert_eq!(response.id, RequestId::Number(5));
        assert_eq!(error_code(&response), -32600);

        let response = server
            .handle(r#"{"jsonrpc":"2.0","id":5}"#)
            .await
            .into_reply()
            .unwrap();
        assert_eq!(error_code(&response), -32600);

        let response = server
            .handle(r#"{"jsonrpc":"2.0","id":null,"method":"ping"}"#)
            .await
            .into_reply()
            .unwrap();
        assert_eq!(response.id, RequestId::Number(0));
        assert_eq!(error_code(&response), -32600);
    }

    #[tokio::test]
    async fn test_string_ids_are_echoed() {
        let server = McpServer::new(ServerConfig::default());
        let response = server
            .handle(r#"{"jsonrpc":"2.0","id":"abc","method":"ping"}"#)
            .await
            .into_reply()
            .unwrap();
        assert_eq!(response.id, RequestId::String("abc".to_string()));
        assert_eq!(response.result, Some(json!({})));
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let server = McpServer::new(ServerConfig::default());
        let response = call(&server, "completion/complete", json!({})).await;
        assert_eq!(error_code(&response), -32601);

        let server = initialized_server().await;
        let response = call(&server, "foo/bar", json!({})).await;
        assert_eq!(error_code(&response), -32601);
    }

    #[tokio::test]
    async fn test_initialize_marks_server() {
        let server = McpServer::new(ServerConfig::default());
        assert!(!server.registry().is_initialized().await);

        let response = server.handle(&init_message()).await.into_reply().unwrap();
        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], MCP_VERSION);
        assert!(server.registry().is_initialized().await);
    }

    #[tokio::test]
    async fn test_bad_initialize_params() {
        let server = McpServer::new(ServerConfig::default());
        let response = call(&server, "initialize", json!({"protocolVersion": 3})).await;
        assert_eq!(error_code(&response), -32700);
        assert!(!server.registry().is_initialized().await);
    }

    #[tokio::test]
    async fn test_progress_capability_follows_hub() {
        let server = McpServer::new(ServerConfig::default());
        server.enable_progress();
        let response = server.handle(&init_message()).await.into_reply().unwrap();
        assert_eq!(response.result.unwrap()["capabilities"]["progress"], true);
    }

    #[tokio::test]
    async fn test_tool_call_without_arguments() {
        let server = initialized_server().await;
        server
            .register_tool(Tool::new("now", "Current time", json!({"type": "object"})), |args: Value| async move {
                Ok(format!("args={}", args))
            })
            .await;

        let response = call(&server, "tools/call", json!({"name": "now"})).await;
        let result: ToolResult = serde_json::from_value(response.result.unwrap()).unwrap();
        assert_eq!(result.content, vec![Content::text("args={}")]);
        assert_eq!(server.metrics().snapshot().tool_calls, 1);
    }

    #[tokio::test]
    async fn test_tool_call_missing_name() {
        let server = initialized_server().await;
        let response = call(&server, "tools/call", json!({"arguments": {}})).await;
        assert_eq!(error_code(&response), -32602);
    }

    #[tokio::test]
    async fn test_handler_error_is_internal() {
        let server = initialized_server().await;
        server
            .register_rich_tool(Tool::new("fail", "Always fails", json!({})), |_args: Value| async {
                Err::<ToolResult, _>(Error::handler("backend unavailable"))
            })
            .await;

        let response = call(&server, "tools/call", json!({"name": "fail"})).await;
        let error = response.error.unwrap();
        assert_eq!(error.code, -32603);
        assert!(error.message.contains("backend unavailable"));
    }

    #[tokio::test]
    async fn test_handler_panic_is_internal() {
        let server = initialized_server().await;
        server
            .register_tool(Tool::new("boom", "Panics", json!({})), |_args: Value| async {
                if true {
                    panic!("tool exploded");
                }
                Ok(String::new())
            })
            .await;

        let response = call(&server, "tools/call", json!({"name": "boom"})).await;
        assert_eq!(error_code(&response), -32603);

        // The server keeps serving afterwards.
        let response = call(&server, "ping", json!({})).await;
        assert!(!response.is_error());
    }

    #[tokio::test]
    async fn test_progress_token_from_meta() {
        let server = initialized_server().await;
        server.enable_progress();
        let mut rx = server.notifications();
        server
            .register_progress_tool(Tool::new("slow", "Reports progress", json!({})), |_args: Value, reporter: ProgressReporter| async move {
                reporter.report(0.5, Some("halfway"));
                Ok(ToolResult::text("done"))
            })
            .await;
        while rx.try_recv().is_ok() {}

        let response = call(
            &server,
            "tools/call",
            json!({"name": "slow", "_meta": {"progressToken": "tok-1"}}),
        )
        .await;
        assert!(!response.is_error());

        let notification = rx.try_recv().unwrap();
        assert_eq!(notification.method, methods::PROGRESS);
        let params = notification.params.unwrap();
        assert_eq!(params["progressToken"], "tok-1");
        assert_eq!(params["progress"], 0.5);
        assert_eq!(params["message"], "halfway");
    }

    #[tokio::test]
    async fn test_metrics_count_replies() {
        let server = McpServer::new(ServerConfig::default());
        call(&server, "ping", json!({})).await;
        call(&server, "tools/list", json!({})).await;

        let snapshot = server.metrics().snapshot();
        assert_eq!(snapshot.requests_total, 2);
        assert_eq!(snapshot.requests_success, 1);
        assert_eq!(snapshot.requests_failed, 1);
    }
}
