//! Notification layer: transient, independently-timed toasts
//!
//! The notifier only tracks which toasts are on screen. Dismissal timers are
//! scheduled by the controller so every toast expires on its own clock.

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// Toast severity, mapped to a color by the view layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    /// Accent color as a CSS hex string
    pub fn color(&self) -> &'static str {
        match self {
            Severity::Info => "#3b82f6",
            Severity::Success => "#10b981",
            Severity::Warning => "#f59e0b",
            Severity::Error => "#ef4444",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Success => write!(f, "success"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// A toast currently on screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: u64,
    pub message: String,
    pub severity: Severity,
}

/// Tracks the stack of visible toasts, oldest first
#[derive(Debug, Default)]
pub struct Notifier {
    next_id: u64,
    active: Vec<Notification>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a new toast; no deduplication and no limit
    pub fn notify(&mut self, message: impl Into<String>, severity: Severity) -> Notification {
        self.next_id += 1;
        let notification = Notification {
            id: self.next_id,
            message: message.into(),
            severity,
        };

        match severity {
            Severity::Error => error!(id = notification.id, message = %notification.message, "notification"),
            Severity::Warning => warn!(id = notification.id, message = %notification.message, "notification"),
            Severity::Info | Severity::Success => {
                info!(id = notification.id, %severity, message = %notification.message, "notification")
            }
        }

        self.active.push(notification.clone());
        notification
    }

    /// Remove an expired toast; returns false if it was already gone
    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.active.len();
        self.active.retain(|n| n.id != id);
        self.active.len() != before
    }

    pub fn active(&self) -> &[Notification] {
        &self.active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notifications_stack_without_dedup() {
        let mut notifier = Notifier::new();
        let a = notifier.notify("File uploaded: a.txt", Severity::Success);
        let b = notifier.notify("File uploaded: a.txt", Severity::Success);
        assert_ne!(a.id, b.id);
        assert_eq!(notifier.active().len(), 2);
    }

    #[test]
    fn test_dismiss_is_independent() {
        let mut notifier = Notifier::new();
        let a = notifier.notify("first", Severity::Info);
        let b = notifier.notify("second", Severity::Error);

        assert!(notifier.dismiss(a.id));
        assert_eq!(notifier.active(), &[b.clone()]);
        assert!(!notifier.dismiss(a.id));
        assert!(notifier.dismiss(b.id));
        assert!(notifier.active().is_empty());
    }

    #[test]
    fn test_severity_serialization() {
        let json = serde_json::to_string(&Severity::Warning).unwrap();
        assert_eq!(json, "\"warning\"");
        assert_eq!(Severity::Error.color(), "#ef4444");
    }
}
