//! Tool, prompt and resource registry.
//!
//! All maps, the subscription set, the tool-list version and the initialized
//! flag live behind one lock, so every mutation (and the notification it
//! emits) is linearizable with respect to listings. Handlers are cloned out
//! and invoked after the lock is released.

use std::collections::{BTreeMap, HashSet};
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::ServerConfig;
use crate::error::{Error, Result};
use crate::mcp::handler::{PromptFn, ResourceHandlerKind, ToolHandlerKind};
use crate::mcp::notifications::NotificationHub;
use crate::mcp::prompts::Prompt;
use crate::mcp::protocol::Tool;
use crate::mcp::resources::{Resource, ResourceTemplate};

/// The tool-list version before any mutation.
pub const INITIAL_TOOL_LIST_VERSION: u64 = 1;

#[derive(Clone)]
struct ToolEntry {
    tool: Tool,
    handler: ToolHandlerKind,
    enabled: bool,
}

#[derive(Clone)]
struct PromptEntry {
    prompt: Prompt,
    handler: PromptFn,
}

#[derive(Clone)]
struct ResourceEntry {
    resource: Resource,
    handler: ResourceHandlerKind,
}

struct RegistryState {
    tools: BTreeMap<String, ToolEntry>,
    prompts: BTreeMap<String, PromptEntry>,
    resources: BTreeMap<String, ResourceEntry>,
    templates: BTreeMap<String, ResourceTemplate>,
    subscriptions: HashSet<String>,
    tool_list_version: u64,
    initialized: bool,
}

/// Which list-changed notifications may be emitted.
#[derive(Debug, Clone, Copy)]
struct ListChanged {
    tools: bool,
    prompts: bool,
    resources: bool,
}

/// Shared registry of everything the server exposes.
pub struct Registry {
    state: RwLock<RegistryState>,
    hub: NotificationHub,
    list_changed: ListChanged,
}

impl Registry {
    pub fn new(hub: NotificationHub, config: &ServerConfig) -> Self {
        Self {
            state: RwLock::new(RegistryState {
                tools: BTreeMap::new(),
                prompts: BTreeMap::new(),
                resources: BTreeMap::new(),
                templates: BTreeMap::new(),
                subscriptions: HashSet::new(),
                tool_list_version: INITIAL_TOOL_LIST_VERSION,
                initialized: false,
            }),
            hub,
            list_changed: ListChanged {
                tools: config.tools_list_changed,
                prompts: config.prompts_list_changed,
                resources: config.resources_list_changed,
            },
        }
    }

    // ===== Lifecycle =====

    pub async fn mark_initialized(&self) {
        self.state.write().await.initialized = true;
    }

    pub async fn is_initialized(&self) -> bool {
        self.state.read().await.initialized
    }

    // ===== Tools =====

    /// Insert or replace a tool. Returns the new tool-list version.
    pub async fn register_tool(&self, tool: Tool, handler: ToolHandlerKind) -> u64 {
        let mut state = self.state.write().await;
        debug!(tool = %tool.name, kind = ?handler.kind(), "Registering tool");
        state.tools.insert(
            tool.name.clone(),
            ToolEntry {
                tool,
                handler,
                enabled: true,
            },
        );
        self.bump_tool_version(&mut state)
    }

    /// Remove a tool. Returns `false`, leaving the version untouched, if the
    /// name was not registered.
    pub async fn unregister_tool(&self, name: &str) -> bool {
        let mut state = self.state.write().await;
        if state.tools.remove(name).is_none() {
            return false;
        }
        debug!(tool = %name, "Unregistered tool");
        self.bump_tool_version(&mut state);
        true
    }

    /// Enable or disable a tool. Returns `true` only if the flag changed.
    pub async fn set_tool_enabled(&self, name: &str, enabled: bool) -> bool {
        let mut state = self.state.write().await;
        match state.tools.get_mut(name) {
            Some(entry) if entry.enabled != enabled => entry.enabled = enabled,
            _ => return false,
        }
        debug!(tool = %name, enabled, "Tool availability changed");
        self.bump_tool_version(&mut state);
        true
    }

    pub async fn tool_list_version(&self) -> u64 {
        self.state.read().await.tool_list_version
    }

    /// Enabled tools, ordered by name.
    pub async fn list_tools(&self) -> Vec<Tool> {
        self.state
            .read()
            .await
            .tools
            .values()
            .filter(|entry| entry.enabled)
            .map(|entry| entry.tool.clone())
            .collect()
    }

    /// The handler bound to an enabled tool.
    pub async fn tool_handler(&self, name: &str) -> Option<ToolHandlerKind> {
        self.state
            .read()
            .await
            .tools
            .get(name)
            .filter(|entry| entry.enabled)
            .map(|entry| entry.handler.clone())
    }

    pub async fn tool_count(&self) -> usize {
        self.state.read().await.tools.len()
    }

    fn bump_tool_version(&self, state: &mut RegistryState) -> u64 {
        state.tool_list_version += 1;
        if self.list_changed.tools {
            self.hub.tools_list_changed();
        }
        state.tool_list_version
    }

    // ===== Prompts =====

    pub async fn register_prompt(&self, prompt: Prompt, handler: PromptFn) {
        let mut state = self.state.write().await;
        debug!(prompt = %prompt.name, "Registering prompt");
        state
            .prompts
            .insert(prompt.name.clone(), PromptEntry { prompt, handler });
        self.prompts_changed();
    }

    pub async fn unregister_prompt(&self, name: &str) -> bool {
        let mut state = self.state.write().await;
        let removed = state.prompts.remove(name).is_some();
        if removed {
            self.prompts_changed();
        }
        removed
    }

    pub async fn list_prompts(&self) -> Vec<Prompt> {
        self.state
            .read()
            .await
            .prompts
            .values()
            .map(|entry| entry.prompt.clone())
            .collect()
    }

    pub async fn prompt(&self, name: &str) -> Option<(Prompt, PromptFn)> {
        self.state
            .read()
            .await
            .prompts
            .get(name)
            .map(|entry| (entry.prompt.clone(), entry.handler.clone()))
    }

    fn prompts_changed(&self) {
        if self.list_changed.prompts {
            self.hub.prompts_list_changed();
        }
    }

    // ===== Resources =====

    pub async fn register_resource(&self, resource: Resource, handler: ResourceHandlerKind) {
        let mut state = self.state.write().await;
        debug!(uri = %resource.uri, "Registering resource");
        state
            .resources
            .insert(resource.uri.clone(), ResourceEntry { resource, handler });
        self.resources_changed();
    }

    /// Remove a resource and any subscription to it.
    pub async fn unregister_resource(&self, uri: &str) -> bool {
        let mut state = self.state.write().await;
        let removed = state.resources.remove(uri).is_some();
        if removed {
            state.subscriptions.remove(uri);
            self.resources_changed();
        }
        removed
    }

    pub async fn list_resources(&self) -> Vec<Resource> {
        self.state
            .read()
            .await
            .resources
            .values()
            .map(|entry| entry.resource.clone())
            .collect()
    }

    pub async fn resource_handler(&self, uri: &str) -> Option<ResourceHandlerKind> {
        self.state
            .read()
            .await
            .resources
            .get(uri)
            .map(|entry| entry.handler.clone())
    }

    pub async fn register_resource_template(&self, template: ResourceTemplate) {
        let mut state = self.state.write().await;
        debug!(template = %template.uri_template, "Registering resource template");
        state
            .templates
            .insert(template.uri_template.clone(), template);
        self.resources_changed();
    }

    pub async fn unregister_resource_template(&self, uri_template: &str) -> bool {
        let mut state = self.state.write().await;
        let removed = state.templates.remove(uri_template).is_some();
        if removed {
            self.resources_changed();
        }
        removed
    }

    pub async fn list_resource_templates(&self) -> Vec<ResourceTemplate> {
        self.state.read().await.templates.values().cloned().collect()
    }

    fn resources_changed(&self) {
        if self.list_changed.resources {
            self.hub.resources_list_changed();
        }
    }

    // ===== Subscriptions =====

    /// Subscribe to updates for a registered resource.
    pub async fn subscribe(&self, uri: &str) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.resources.contains_key(uri) {
            return Err(Error::ResourceNotFound(uri.to_string()));
        }
        state.subscriptions.insert(uri.to_string());
        Ok(())
    }

    pub async fn unsubscribe(&self, uri: &str) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.resources.contains_key(uri) {
            return Err(Error::ResourceNotFound(uri.to_string()));
        }
        state.subscriptions.remove(uri);
        Ok(())
    }

    pub async fn is_subscribed(&self, uri: &str) -> bool {
        self.state.read().await.subscriptions.contains(uri)
    }

    /// Emit `resources/updated` if, and only if, `uri` is subscribed.
    pub async fn notify_resource_updated(&self, uri: &str) -> bool {
        let state = self.state.read().await;
        if !state.subscriptions.contains(uri) {
            debug!(uri = %uri, "Skipping update for unsubscribed resource");
            return false;
        }
        self.hub.resource_updated(uri)
    }
}
