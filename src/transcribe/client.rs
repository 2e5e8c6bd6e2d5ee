//! HTTP client for the transcription service

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::RequestMethod;

use super::protocol::{TranscribeRequest, TranscribeResponse};

/// Path of the transcription endpoint relative to the service base URL
pub const TRANSCRIBE_PATH: &str = "/transcribe";

/// Errors that end a session in the Error state
#[derive(Debug, thiserror::Error)]
pub enum TranscribeError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("service responded with status {status}")]
    Status { status: u16 },

    #[error("failed to parse response: {0}")]
    Decode(String),
}

/// Anything that can turn a request payload into a transcript
#[async_trait]
pub trait TranscriptionClient: Send + Sync {
    async fn transcribe(
        &self,
        request: &TranscribeRequest,
    ) -> Result<TranscribeResponse, TranscribeError>;
}

/// `reqwest`-backed client for `{base_url}/transcribe`
#[derive(Debug, Clone)]
pub struct HttpTranscriptionClient {
    endpoint: String,
    method: RequestMethod,
    client: reqwest::Client,
}

impl HttpTranscriptionClient {
    /// Create a client; `timeout = None` waits for the service indefinitely
    pub fn new(
        base_url: &str,
        method: RequestMethod,
        timeout: Option<Duration>,
    ) -> Result<Self, TranscribeError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| TranscribeError::Transport(e.to_string()))?;

        Ok(Self {
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), TRANSCRIBE_PATH),
            method,
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl TranscriptionClient for HttpTranscriptionClient {
    async fn transcribe(
        &self,
        request: &TranscribeRequest,
    ) -> Result<TranscribeResponse, TranscribeError> {
        let builder = match self.method {
            RequestMethod::Post => self.client.post(&self.endpoint).json(request),
            RequestMethod::Get => self.client.get(&self.endpoint),
        };

        debug!(endpoint = %self.endpoint, method = ?self.method, mode = %request.mode, files = request.files.len(), "sending transcription request");

        let response = builder
            .send()
            .await
            .map_err(|e| TranscribeError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "transcription service returned failure status");
            return Err(TranscribeError::Status {
                status: status.as_u16(),
            });
        }

        response
            .json::<TranscribeResponse>()
            .await
            .map_err(|e| TranscribeError::Decode(e.to_string()))
    }
}
