//! MCP Progress Notifications
//!
//! Support for emitting progress updates during long-running tool calls and
//! resource reads.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::mcp::notifications::NotificationHub;
use crate::mcp::protocol::{methods, JsonRpcNotification};

/// Progress token for tracking operations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum ProgressToken {
    String(String),
    Number(i64),
}

/// Progress notification params.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressParams {
    pub progress_token: ProgressToken,
    /// Fraction complete, 0.0 to 1.0.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<u64>,
}

impl ProgressParams {
    /// Whether the fraction, if present, lies within `[0, 1]`.
    pub fn is_valid(&self) -> bool {
        self.progress.map_or(true, |p| (0.0..=1.0).contains(&p))
    }

    pub fn into_notification(self) -> JsonRpcNotification {
        JsonRpcNotification::new(methods::PROGRESS, serde_json::to_value(self).ok())
    }
}

/// A single progress update, every field optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressUpdate {
    pub progress: Option<f64>,
    pub message: Option<String>,
    pub total: Option<u64>,
    pub current: Option<u64>,
}

/// Progress reporter handed to progress-enabled handlers.
///
/// Reports are dropped silently when progress has not been enabled on the
/// hub, or when the fraction lies outside `[0, 1]`.
#[derive(Clone)]
pub struct ProgressReporter {
    token: ProgressToken,
    hub: NotificationHub,
}

impl ProgressReporter {
    pub fn new(token: ProgressToken, hub: NotificationHub) -> Self {
        Self { token, hub }
    }

    /// The token this reporter tags its notifications with.
    pub fn token(&self) -> &ProgressToken {
        &self.token
    }

    /// Emit an update. Returns `true` if a notification was sent.
    pub fn send(&self, update: ProgressUpdate) -> bool {
        if !self.hub.progress_enabled() {
            return false;
        }

        let params = ProgressParams {
            progress_token: self.token.clone(),
            progress: update.progress,
            message: update.message,
            total: update.total,
            current: update.current,
        };
        if !params.is_valid() {
            trace!("Dropping out-of-range progress {:?}", params.progress);
            return false;
        }

        self.hub.emit(params.into_notification())
    }

    /// Report a fraction complete with an optional status message.
    pub fn report(&self, progress: f64, message: Option<&str>) -> bool {
        self.send(ProgressUpdate {
            progress: Some(progress),
            message: message.map(String::from),
            ..Default::default()
        })
    }

    /// Report `current` of `total` units; the fraction is derived.
    pub fn report_step(&self, current: u64, total: u64, message: Option<&str>) -> bool {
        let progress = if total == 0 {
            None
        } else {
            Some(current as f64 / total as f64)
        };
        self.send(ProgressUpdate {
            progress,
            message: message.map(String::from),
            total: Some(total),
            current: Some(current),
        })
    }

    /// Report a status message without a fraction.
    pub fn status(&self, message: &str) -> bool {
        self.send(ProgressUpdate {
            message: Some(message.to_string()),
            ..Default::default()
        })
    }

    /// Report completion.
    pub fn complete(&self, message: Option<&str>) -> bool {
        self.report(1.0, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn enabled_hub() -> (NotificationHub, tokio::sync::mpsc::UnboundedReceiver<JsonRpcNotification>) {
        let hub = NotificationHub::new();
        let rx = hub.subscribe();
        hub.enable_progress();
        (hub, rx)
    }

    #[test]
    fn test_progress_reporter() {
        let (hub, mut rx) = enabled_hub();
        let reporter = ProgressReporter::new(ProgressToken::String("test".to_string()), hub);

        assert!(reporter.report(0.5, Some("Halfway")));

        let notification = rx.try_recv().unwrap();
        assert_eq!(notification.method, "notifications/progress");
        assert_eq!(
            notification.params.unwrap(),
            json!({"progressToken": "test", "progress": 0.5, "message": "Halfway"})
        );
    }

    #[test]
    fn test_out_of_range_progress_is_dropped() {
        let (hub, mut rx) = enabled_hub();
        let reporter = ProgressReporter::new(ProgressToken::Number(1), hub);

        assert!(!reporter.report(1.5, None));
        assert!(!reporter.report(-0.1, None));
        assert!(!reporter.report(f64::NAN, None));
        assert!(rx.try_recv().is_err());

        assert!(reporter.report(0.0, None));
        assert!(reporter.report(1.0, None));
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn test_progress_requires_enabling() {
        let hub = NotificationHub::new();
        let mut rx = hub.subscribe();
        let reporter = ProgressReporter::new(ProgressToken::Number(7), hub.clone());

        assert!(!reporter.report(0.3, None));
        assert!(rx.try_recv().is_err());

        hub.enable_progress();
        assert!(reporter.report(0.3, None));
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn test_progress_reporter_step() {
        let (hub, mut rx) = enabled_hub();
        let reporter = ProgressReporter::new(ProgressToken::Number(2), hub);

        reporter.report_step(50, 200, Some("Quarter done"));

        let params: ProgressParams =
            serde_json::from_value(rx.try_recv().unwrap().params.unwrap()).unwrap();
        assert_eq!(params.progress, Some(0.25));
        assert_eq!(params.total, Some(200));
        assert_eq!(params.current, Some(50));
    }

    #[test]
    fn test_status_and_complete() {
        let (hub, mut rx) = enabled_hub();
        let reporter = ProgressReporter::new(ProgressToken::Number(3), hub);

        reporter.status("Connecting");
        reporter.complete(Some("Done!"));

        let status = rx.try_recv().unwrap().params.unwrap();
        assert_eq!(status, json!({"progressToken": 3, "message": "Connecting"}));
        let done = rx.try_recv().unwrap().params.unwrap();
        assert_eq!(done["progress"], 1.0);
        assert_eq!(done["message"], "Done!");
    }

    #[test]
    fn test_progress_token_serialization() {
        let token_str = ProgressToken::String("test-token".to_string());
        let token_num = ProgressToken::Number(42);

        let json_str = serde_json::to_string(&token_str).unwrap();
        let json_num = serde_json::to_string(&token_num).unwrap();

        assert_eq!(json_str, "\"test-token\"");
        assert_eq!(json_num, "42");

        let parsed_str: ProgressToken = serde_json::from_str(&json_str).unwrap();
        let parsed_num: ProgressToken = serde_json::from_str(&json_num).unwrap();

        assert_eq!(parsed_str, token_str);
        assert_eq!(parsed_num, token_num);
    }
}
