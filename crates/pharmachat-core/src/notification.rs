//! Notification events emitted by the session coordinator.

use serde::{Deserialize, Serialize};

/// Severity of a notification event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// A single user-facing notification.
///
/// Emitted at most once per conversation turn; never queued for later
/// delivery when the preference is off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub severity: Severity,
}

/// Delivery seam for notifications (desktop toast, CLI print, test probe).
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Sink that drops every notification.
#[derive(Debug, Default)]
pub struct NullNotificationSink;

impl NotificationSink for NullNotificationSink {
    fn notify(&self, _notification: Notification) {}
}
