//! Outbound server-initiated notifications.
//!
//! The host drains a channel obtained from [`NotificationHub::subscribe`];
//! the engine pushes fully-formed JSON-RPC notifications into it. Emission is
//! synchronous and never blocks, so it is safe from inside handlers and while
//! the registry lock is held.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, RwLock};

use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::mcp::progress::{ProgressReporter, ProgressToken};
use crate::mcp::protocol::{methods, JsonRpcNotification};

type Sink = mpsc::UnboundedSender<JsonRpcNotification>;

struct HubInner {
    sink: RwLock<Option<Sink>>,
    progress_enabled: AtomicBool,
    next_token: AtomicI64,
}

/// Cloneable handle to the outbound notification channel.
#[derive(Clone)]
pub struct NotificationHub {
    inner: Arc<HubInner>,
}

impl NotificationHub {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(HubInner {
                sink: RwLock::new(None),
                progress_enabled: AtomicBool::new(false),
                next_token: AtomicI64::new(1),
            }),
        }
    }

    /// Install a fresh sink and return its receiving end.
    ///
    /// Any previously installed sink is replaced; its receiver sees the
    /// channel close.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<JsonRpcNotification> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.inner.sink.write().unwrap_or_else(|e| e.into_inner()) = Some(tx);
        rx
    }

    /// Remove the sink. Later notifications are discarded.
    pub fn uninstall(&self) {
        *self.inner.sink.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    /// Whether a live sink is installed.
    pub fn is_installed(&self) -> bool {
        self.inner
            .sink
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|tx| !tx.is_closed())
    }

    /// Turn on progress reporting. There is no way back.
    pub fn enable_progress(&self) {
        self.inner.progress_enabled.store(true, Ordering::SeqCst);
    }

    pub fn progress_enabled(&self) -> bool {
        self.inner.progress_enabled.load(Ordering::SeqCst)
    }

    /// Push a notification to the host. Returns `true` if it was delivered
    /// to a live sink.
    pub fn emit(&self, notification: JsonRpcNotification) -> bool {
        let sink = self.inner.sink.read().unwrap_or_else(|e| e.into_inner());
        match sink.as_ref() {
            Some(tx) => {
                debug!(method = %notification.method, "Emitting notification");
                if tx.send(notification).is_err() {
                    warn!("Notification receiver dropped");
                    return false;
                }
                true
            }
            None => false,
        }
    }

    pub fn tools_list_changed(&self) -> bool {
        self.emit(JsonRpcNotification::new(methods::TOOLS_LIST_CHANGED, None))
    }

    pub fn prompts_list_changed(&self) -> bool {
        self.emit(JsonRpcNotification::new(methods::PROMPTS_LIST_CHANGED, None))
    }

    pub fn resources_list_changed(&self) -> bool {
        self.emit(JsonRpcNotification::new(methods::RESOURCES_LIST_CHANGED, None))
    }

    pub fn resource_updated(&self, uri: &str) -> bool {
        self.emit(JsonRpcNotification::new(
            methods::RESOURCES_UPDATED,
            Some(json!({ "uri": uri })),
        ))
    }

    /// A reporter for `token`, or for a freshly generated numeric token.
    pub fn reporter(&self, token: Option<ProgressToken>) -> ProgressReporter {
        let token = token.unwrap_or_else(|| {
            ProgressToken::Number(self.inner.next_token.fetch_add(1, Ordering::SeqCst))
        });
        ProgressReporter::new(token, self.clone())
    }
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new()
    }
}
