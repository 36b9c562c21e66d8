//! Per-session user preferences.

use serde::{Deserialize, Serialize};

/// User preferences scoped to one conversation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPreferences {
    /// While true, the message log is snapshotted to durable storage after
    /// every completed turn. Turning it off purges the stored snapshot
    /// immediately; turning it back on restores nothing retroactively.
    pub auto_save: bool,
    /// Gates the order-confirmation notification side effect. No queuing:
    /// a suppressed notification is gone.
    pub notifications_enabled: bool,
}

impl Default for SessionPreferences {
    fn default() -> Self {
        Self {
            auto_save: true,
            notifications_enabled: true,
        }
    }
}
