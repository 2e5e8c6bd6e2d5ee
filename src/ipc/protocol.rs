//! IPC message protocol definitions
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian length.

use serde::{Deserialize, Serialize};

use crate::controller::Command;
use crate::events::AssistantEvent;
use crate::transcribe::Mode;
use crate::upload::RawFile;
use crate::view::View;

/// Largest accepted frame body
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Requests from a presentation layer to the assistant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Ping to check connectivity
    Ping,

    /// Request a status summary
    GetStatus,

    /// Request the latest rendered view
    GetView,

    /// Mic button pressed
    ActivateMic,

    /// Mode selector changed
    SetMode { mode: Mode },

    /// Files dropped on or picked in the upload area
    AddFiles { files: Vec<RawFile> },

    /// Remove button of a file row
    RemoveFile { name: String, size: u64 },

    /// Subscribe to view and event pushes
    Subscribe,
}

impl Request {
    /// The controller command carried by this request, if any
    pub fn into_command(self) -> Option<Command> {
        match self {
            Request::ActivateMic => Some(Command::ActivateMic),
            Request::SetMode { mode } => Some(Command::SetMode(mode)),
            Request::AddFiles { files } => Some(Command::AddFiles(files)),
            Request::RemoveFile { name, size } => Some(Command::RemoveFile { name, size }),
            Request::Ping | Request::GetStatus | Request::GetView | Request::Subscribe => None,
        }
    }
}

/// Responses from the assistant to a presentation layer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Pong response to ping
    Pong,

    /// Status summary
    Status(AssistantStatus),

    /// Latest rendered view
    View(View),

    /// Command queued for the controller
    Accepted,

    /// Subscription confirmed
    Subscribed,

    /// Error response
    Error { code: String, message: String },
}

/// Pushed to subscribed clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Push {
    /// The view was re-rendered
    ViewChanged { view: View },

    /// An assistant event occurred
    Event { event: AssistantEvent },
}

/// Status summary of the running assistant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantStatus {
    /// Client version
    pub version: String,

    /// Current mode
    pub mode: Mode,

    /// Whether a request is in flight
    pub listening: bool,

    /// Number of attached documents
    pub files: usize,

    /// Uptime in seconds
    pub uptime_secs: u64,
}

impl AssistantStatus {
    pub fn from_view(view: &View, uptime_secs: u64) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            mode: view.mode,
            listening: view.mic.listening,
            files: view.files.len(),
            uptime_secs,
        }
    }
}
