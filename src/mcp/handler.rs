//! Handler bindings for tools, prompts and resources.
//!
//! Third-party logic is stored as boxed async closures. A tool name binds to
//! exactly one [`ToolHandlerKind`]; registering again under the same name
//! replaces it.

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::mcp::content::ResourceContents;
use crate::mcp::progress::ProgressReporter;
use crate::mcp::prompts::{PromptMessage, PromptTemplate};
use crate::mcp::protocol::{Tool, ToolResult};

/// Handler for struct-based MCP tools.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Get the tool definition.
    fn definition(&self) -> Tool;

    /// Execute the tool with the given arguments object.
    async fn execute(&self, arguments: Value) -> Result<ToolResult>;
}

pub type SimpleToolFn = Arc<dyn Fn(Value) -> BoxFuture<'static, Result<String>> + Send + Sync>;
pub type RichToolFn = Arc<dyn Fn(Value) -> BoxFuture<'static, Result<ToolResult>> + Send + Sync>;
pub type ProgressToolFn =
    Arc<dyn Fn(Value, ProgressReporter) -> BoxFuture<'static, Result<ToolResult>> + Send + Sync>;
pub type PromptFn = Arc<
    dyn Fn(HashMap<String, String>) -> BoxFuture<'static, Result<Vec<PromptMessage>>> + Send + Sync,
>;
pub type ResourceFn = Arc<dyn Fn(String) -> BoxFuture<'static, Result<ResourceContents>> + Send + Sync>;
pub type ProgressResourceFn = Arc<
    dyn Fn(String, ProgressReporter) -> BoxFuture<'static, Result<ResourceContents>> + Send + Sync,
>;

/// Which flavour of handler is bound to a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    /// args + reporter -> ToolResult
    Progress,
    /// args -> ToolResult
    Rich,
    /// args -> text
    Simple,
}

/// A tool handler of one of the three kinds.
#[derive(Clone)]
pub enum ToolHandlerKind {
    Progress(ProgressToolFn),
    Rich(RichToolFn),
    Simple(SimpleToolFn),
}

impl ToolHandlerKind {
    pub fn simple<F, Fut>(f: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String>> + Send + 'static,
    {
        Self::Simple(Arc::new(move |args: Value| f(args).boxed()))
    }

    pub fn rich<F, Fut>(f: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ToolResult>> + Send + 'static,
    {
        Self::Rich(Arc::new(move |args: Value| f(args).boxed()))
    }

    pub fn progress<F, Fut>(f: F) -> Self
    where
        F: Fn(Value, ProgressReporter) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ToolResult>> + Send + 'static,
    {
        Self::Progress(Arc::new(move |args: Value, reporter: ProgressReporter| {
            f(args, reporter).boxed()
        }))
    }

    /// Wrap a struct-based [`ToolHandler`] as a rich handler.
    pub fn from_handler(handler: Arc<dyn ToolHandler>) -> Self {
        Self::Rich(Arc::new(move |args: Value| {
            let handler = handler.clone();
            async move { handler.execute(args).await }.boxed()
        }))
    }

    pub fn kind(&self) -> HandlerKind {
        match self {
            Self::Progress(_) => HandlerKind::Progress,
            Self::Rich(_) => HandlerKind::Rich,
            Self::Simple(_) => HandlerKind::Simple,
        }
    }

    /// Run the handler. Simple handlers have their text wrapped in a
    /// single-item, non-error result.
    pub async fn invoke(&self, arguments: Value, reporter: ProgressReporter) -> Result<ToolResult> {
        match self {
            Self::Progress(f) => f(arguments, reporter).await,
            Self::Rich(f) => f(arguments).await,
            Self::Simple(f) => f(arguments).await.map(ToolResult::text),
        }
    }
}

/// A resource read handler, with or without progress reporting.
#[derive(Clone)]
pub enum ResourceHandlerKind {
    Progress(ProgressResourceFn),
    Plain(ResourceFn),
}

impl ResourceHandlerKind {
    pub fn plain<F, Fut>(f: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ResourceContents>> + Send + 'static,
    {
        Self::Plain(Arc::new(move |uri: String| f(uri).boxed()))
    }

    pub fn progress<F, Fut>(f: F) -> Self
    where
        F: Fn(String, ProgressReporter) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ResourceContents>> + Send + 'static,
    {
        Self::Progress(Arc::new(move |uri: String, reporter: ProgressReporter| {
            f(uri, reporter).boxed()
        }))
    }

    pub async fn invoke(&self, uri: String, reporter: ProgressReporter) -> Result<ResourceContents> {
        match self {
            Self::Progress(f) => f(uri, reporter).await,
            Self::Plain(f) => f(uri).await,
        }
    }
}

pub fn prompt_fn<F, Fut>(f: F) -> PromptFn
where
    F: Fn(HashMap<String, String>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<PromptMessage>>> + Send + 'static,
{
    Arc::new(move |args: HashMap<String, String>| f(args).boxed())
}

/// A prompt handler that renders `template` into one user message.
pub fn template_prompt_fn(template: PromptTemplate) -> PromptFn {
    let template = Arc::new(template);
    Arc::new(move |args: HashMap<String, String>| {
        let text = template.render(&args);
        async move { Ok::<_, Error>(vec![PromptMessage::user(text)]) }.boxed()
    })
}

/// Await a handler future, converting both `Err` and panics into
/// [`Error::HandlerFailed`].
pub async fn guarded<T, F>(fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(Error::HandlerFailed(message))) => Err(Error::HandlerFailed(message)),
        Ok(Err(other)) => Err(Error::HandlerFailed(other.to_string())),
        Err(panic) => Err(Error::HandlerFailed(panic_message(panic))),
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}

/// Helper macro for creating tool input schemas.
#[macro_export]
macro_rules! tool_schema {
    ($($json:tt)+) => {
        serde_json::json!({
            "type": "object",
            "properties": {
                $($json)+
            }
        })
    };
}

/// Helper to extract a required string argument.
pub fn get_string_arg(args: &Value, name: &str) -> Result<String> {
    args.get(name)
        .and_then(|v| v.as_str())
        .map(String::from)
        .ok_or_else(|| Error::InvalidParams(format!("Missing required argument: {}", name)))
}

/// Helper to extract an optional string argument.
pub fn get_optional_string_arg(args: &Value, name: &str) -> Option<String> {
    args.get(name).and_then(|v| v.as_str()).map(String::from)
}
