//! Transcription service client and wire types

mod client;
mod protocol;

pub use client::{HttpTranscriptionClient, TranscribeError, TranscriptionClient};
pub use protocol::{FileMetadata, Mode, TranscribeRequest, TranscribeResponse};
