//! View descriptions derived from controller state
//!
//! [`View::render`] is a pure function of a [`Snapshot`]; presentation layers
//! (the console printer, IPC subscribers) only ever see its output.

mod console;

pub use console::ConsoleRenderer;

use serde::{Deserialize, Serialize};

use crate::notify::{Notification, Severity};
use crate::session::{SessionState, Transcript};
use crate::transcribe::Mode;
use crate::upload::{FileIcon, UploadedFile};

pub const IDLE_STATUS: &str = "Tap to speak";
pub const LISTENING_STATUS: &str = "Listening...";
pub const SUCCESS_STATUS: &str = "Transcription complete";
pub const ERROR_STATUS: &str = "Connection failed";
pub const PENDING_TEXT: &str = "Listening and transcribing...";
pub const SUCCESS_HEADING: &str = "Transcribed Successfully";
pub const ERROR_HEADING: &str = "Connection Error";

const GREEN: &str = "#10b981";
const RED: &str = "#ef4444";

/// Borrowed controller state needed to render a view
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    pub mode: Mode,
    pub state: SessionState,
    pub transcript: &'a Transcript,
    pub files: &'a [UploadedFile],
    pub notifications: &'a [Notification],
}

/// Everything a presentation layer needs to draw the assistant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct View {
    pub mode: Mode,
    pub mic: MicView,
    pub status: StatusView,
    pub transcript: TranscriptView,
    /// Document panel, visible only in document mode
    pub upload_panel_visible: bool,
    /// Accepted-file list, visible only when non-empty
    pub file_list_visible: bool,
    pub files: Vec<FileRow>,
    /// Top-right toast stack, oldest first
    pub toasts: Vec<ToastView>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MicIcon {
    Microphone,
    Stop,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MicView {
    pub enabled: bool,
    pub listening: bool,
    pub icon: MicIcon,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusView {
    pub text: String,
    /// `None` keeps the stylesheet default
    pub color: Option<String>,
}

/// Highlight applied to the transcript box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelAccent {
    None,
    Listening,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PanelContent {
    Placeholder,
    Spinner {
        text: String,
    },
    Transcript {
        heading: String,
        question: String,
        answer: Option<String>,
    },
    Error {
        heading: String,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptView {
    pub accent: PanelAccent,
    pub content: PanelContent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRow {
    pub name: String,
    pub size: u64,
    pub display_size: String,
    pub icon: FileIcon,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToastView {
    pub id: u64,
    pub message: String,
    pub severity: Severity,
    pub color: String,
}

impl View {
    pub fn render(snapshot: &Snapshot<'_>) -> Self {
        let listening = snapshot.state == SessionState::Listening;

        let mic = MicView {
            enabled: !listening,
            listening,
            icon: if listening {
                MicIcon::Stop
            } else {
                MicIcon::Microphone
            },
        };

        let (text, color) = match snapshot.state {
            SessionState::Idle => (IDLE_STATUS, None),
            SessionState::Listening => (LISTENING_STATUS, Some(GREEN)),
            SessionState::Success => (SUCCESS_STATUS, Some(GREEN)),
            SessionState::Error => (ERROR_STATUS, Some(RED)),
        };
        let status = StatusView {
            text: text.to_string(),
            color: color.map(str::to_string),
        };

        let accent = match snapshot.state {
            SessionState::Idle => PanelAccent::None,
            SessionState::Listening => PanelAccent::Listening,
            SessionState::Success => PanelAccent::Success,
            SessionState::Error => PanelAccent::Error,
        };

        let files: Vec<FileRow> = snapshot
            .files
            .iter()
            .map(|file| FileRow {
                name: file.name.clone(),
                size: file.size,
                display_size: file.display_size(),
                icon: file.icon(),
            })
            .collect();

        let toasts = snapshot
            .notifications
            .iter()
            .map(|n| ToastView {
                id: n.id,
                message: n.message.clone(),
                severity: n.severity,
                color: n.severity.color().to_string(),
            })
            .collect();

        Self {
            mode: snapshot.mode,
            mic,
            status,
            transcript: TranscriptView {
                accent,
                content: panel_content(snapshot.transcript),
            },
            upload_panel_visible: snapshot.mode == Mode::Document,
            file_list_visible: !files.is_empty(),
            files,
            toasts,
        }
    }
}

fn panel_content(transcript: &Transcript) -> PanelContent {
    match transcript {
        Transcript::Placeholder => PanelContent::Placeholder,
        Transcript::Pending => PanelContent::Spinner {
            text: PENDING_TEXT.to_string(),
        },
        Transcript::Transcribed { question, answer } => PanelContent::Transcript {
            heading: SUCCESS_HEADING.to_string(),
            question: question.clone(),
            answer: answer.clone(),
        },
        Transcript::Failed { message } => PanelContent::Error {
            heading: ERROR_HEADING.to_string(),
            message: message.clone(),
        },
    }
}
