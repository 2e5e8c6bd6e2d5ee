//! Upload module for document-mode attachments
//!
//! Validates candidate files against the accepted extensions and size limit,
//! and keeps the in-memory upload list keyed by `(name, size)`.

mod file;
mod manager;

pub use file::{format_file_size, FileIcon, RawFile, UploadedFile};
pub use manager::{AddOutcome, UploadManager, UploadRejection};
