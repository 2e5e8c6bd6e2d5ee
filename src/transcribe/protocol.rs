//! Wire types for the transcription service
//!
//! `POST /transcribe` carries a JSON body `{mode, files}`; the service answers
//! with at least a `question` field.

use serde::{Deserialize, Serialize};

use crate::upload::UploadedFile;

/// Input mode selected by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Plain voice question
    #[default]
    Voice,
    /// Voice question about the attached documents
    Document,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Voice => write!(f, "voice"),
            Mode::Document => write!(f, "document"),
        }
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "voice" => Ok(Mode::Voice),
            "document" | "doc" => Ok(Mode::Document),
            other => Err(format!("unknown mode: {other}")),
        }
    }
}

/// File metadata sent alongside a document-mode request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub name: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub mime_type: String,
}

impl From<&UploadedFile> for FileMetadata {
    fn from(file: &UploadedFile) -> Self {
        Self {
            name: file.name.clone(),
            size: file.size,
            mime_type: file.mime_type.clone(),
        }
    }
}

/// Body of `POST /transcribe`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscribeRequest {
    pub mode: Mode,
    pub files: Vec<FileMetadata>,
}

impl TranscribeRequest {
    /// Build the payload; files only travel in document mode
    pub fn new(mode: Mode, uploads: &[UploadedFile]) -> Self {
        let files = match mode {
            Mode::Document => uploads.iter().map(FileMetadata::from).collect(),
            Mode::Voice => Vec::new(),
        };
        Self { mode, files }
    }
}

/// Successful answer from the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscribeResponse {
    pub question: String,
    /// Answer generated from the attached documents, when the service has one
    #[serde(default)]
    pub answer: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notes() -> UploadedFile {
        UploadedFile {
            name: "notes.txt".into(),
            size: 500,
            mime_type: "text/plain".into(),
        }
    }

    #[test]
    fn test_voice_mode_sends_no_files() {
        let request = TranscribeRequest::new(Mode::Voice, &[notes()]);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json, serde_json::json!({"mode": "voice", "files": []}));
    }

    #[test]
    fn test_document_mode_sends_metadata() {
        let request = TranscribeRequest::new(Mode::Document, &[notes()]);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "mode": "document",
                "files": [{"name": "notes.txt", "size": 500, "type": "text/plain"}]
            })
        );
    }

    #[test]
    fn test_response_answer_is_optional() {
        let response: TranscribeResponse =
            serde_json::from_str(r#"{"question":"hello world"}"#).unwrap();
        assert_eq!(response.question, "hello world");
        assert_eq!(response.answer, None);

        let response: TranscribeResponse =
            serde_json::from_str(r#"{"question":"q","answer":"a"}"#).unwrap();
        assert_eq!(response.answer.as_deref(), Some("a"));
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("Document".parse::<Mode>(), Ok(Mode::Document));
        assert_eq!("voice".parse::<Mode>(), Ok(Mode::Voice));
        assert!("video".parse::<Mode>().is_err());
    }
}
