//! Configuration loading and management

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};

/// Default transcription service address
const DEFAULT_SERVICE_URL: &str = "http://127.0.0.1:8000";

/// Largest accepted upload (10 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Extensions accepted by the document panel
pub const DEFAULT_ACCEPTED_EXTENSIONS: &[&str] = &["pdf", "doc", "docx", "txt"];

/// How the transcription request is shaped on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestMethod {
    /// `POST /transcribe` with a JSON body (canonical)
    #[default]
    Post,
    /// `GET /transcribe` with no body
    Get,
}

impl std::str::FromStr for RequestMethod {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "post" => Ok(Self::Post),
            "get" => Ok(Self::Get),
            other => bail!("unknown request method: {other}"),
        }
    }
}

/// Upload validation limits
#[derive(Debug, Clone)]
pub struct UploadLimits {
    /// Lowercase extensions without the leading dot
    pub accepted_extensions: Vec<String>,
    /// Maximum file size in bytes (inclusive)
    pub max_bytes: u64,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            accepted_extensions: DEFAULT_ACCEPTED_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

/// Display windows for transient UI feedback
#[derive(Debug, Clone, Copy)]
pub struct Timings {
    /// How long the success status stays before reverting to idle
    pub success_display: Duration,
    /// How long the error status stays before reverting to idle
    pub error_display: Duration,
    /// Toast lifetime before its exit animation starts
    pub toast_lifetime: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            success_display: Duration::from_millis(2500),
            error_display: Duration::from_millis(4000),
            toast_lifetime: Duration::from_millis(3000),
        }
    }
}

/// Client configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the transcription service
    pub service_url: String,

    /// Request shape used for `/transcribe`
    pub request_method: RequestMethod,

    /// Optional request timeout; `None` waits for the service indefinitely
    pub request_timeout: Option<Duration>,

    /// Path to the Unix domain socket for the host binding
    pub socket_path: PathBuf,

    /// Directory for runtime data
    pub data_dir: PathBuf,

    pub uploads: UploadLimits,

    pub timings: Timings,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        let home = std::env::var("HOME").context("HOME is not set")?;
        let data_dir = PathBuf::from(&home)
            .join(".local")
            .join("share")
            .join("voice-assistant");

        let socket_path = match std::env::var("VOICE_ASSISTANT_SOCKET") {
            Ok(path) => PathBuf::from(path),
            Err(_) => data_dir.join("assistant.sock"),
        };

        let service_url = std::env::var("VOICE_ASSISTANT_URL")
            .unwrap_or_else(|_| DEFAULT_SERVICE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let request_method = match std::env::var("VOICE_ASSISTANT_METHOD") {
            Ok(raw) => raw.parse()?,
            Err(_) => RequestMethod::default(),
        };

        let request_timeout = match std::env::var("VOICE_ASSISTANT_TIMEOUT_SECS") {
            Ok(raw) => {
                let secs: u64 = raw
                    .trim()
                    .parse()
                    .with_context(|| format!("invalid VOICE_ASSISTANT_TIMEOUT_SECS: {raw}"))?;
                Some(Duration::from_secs(secs))
            }
            Err(_) => None,
        };

        Ok(Self {
            service_url,
            request_method,
            request_timeout,
            socket_path,
            data_dir,
            uploads: UploadLimits::default(),
            timings: Timings::default(),
        })
    }

    /// Ensure data directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }
}
