//! Events module for controller activity
//!
//! Structured events broadcast by the controller and session machine for
//! logging and for subscribers of the host binding.

use serde::{Deserialize, Serialize};

use crate::notify::Severity;
use crate::transcribe::Mode;

/// Events emitted as the controller processes commands
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AssistantEvent {
    /// Mic activated, request about to be sent
    SessionStarted { session_id: u64 },

    /// Service answered with a transcript
    TranscriptionSucceeded {
        session_id: u64,
        question: String,
        /// Time spent listening, in milliseconds
        duration_ms: u64,
    },

    /// Service unreachable or answered with a failure status
    TranscriptionFailed {
        session_id: u64,
        reason: String,
        duration_ms: u64,
    },

    /// Display window elapsed, back to Idle
    SessionReverted { session_id: u64 },

    ModeChanged { mode: Mode },

    FileAdded { name: String, size: u64 },

    FileRemoved { name: String, size: u64 },

    NotificationShown {
        id: u64,
        message: String,
        severity: Severity,
    },

    NotificationDismissed { id: u64 },
}

impl std::fmt::Display for AssistantEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssistantEvent::SessionStarted { session_id } => {
                write!(f, "SESSION_STARTED (#{})", session_id)
            }
            AssistantEvent::TranscriptionSucceeded {
                session_id,
                duration_ms,
                ..
            } => write!(f, "TRANSCRIPTION_SUCCEEDED (#{}, {}ms)", session_id, duration_ms),
            AssistantEvent::TranscriptionFailed {
                session_id,
                duration_ms,
                ..
            } => write!(f, "TRANSCRIPTION_FAILED (#{}, {}ms)", session_id, duration_ms),
            AssistantEvent::SessionReverted { session_id } => {
                write!(f, "SESSION_REVERTED (#{})", session_id)
            }
            AssistantEvent::ModeChanged { mode } => write!(f, "MODE_CHANGED ({})", mode),
            AssistantEvent::FileAdded { name, .. } => write!(f, "FILE_ADDED ({})", name),
            AssistantEvent::FileRemoved { name, .. } => write!(f, "FILE_REMOVED ({})", name),
            AssistantEvent::NotificationShown { id, severity, .. } => {
                write!(f, "NOTIFICATION_SHOWN (#{}, {})", id, severity)
            }
            AssistantEvent::NotificationDismissed { id } => {
                write!(f, "NOTIFICATION_DISMISSED (#{})", id)
            }
        }
    }
}
