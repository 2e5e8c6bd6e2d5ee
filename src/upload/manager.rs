//! Upload list bookkeeping and validation

use tracing::{debug, info};

use crate::config::UploadLimits;
use crate::notify::Severity;

use super::file::{extension_of, RawFile, UploadedFile};

/// Reasons a candidate file is not added to the upload list
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadRejection {
    #[error("File type not supported: {name}")]
    UnsupportedType { name: String },

    #[error("File too large: {name}")]
    TooLarge { name: String, size: u64 },

    #[error("File already uploaded: {name}")]
    Duplicate { name: String },
}

impl UploadRejection {
    /// Duplicates are a warning, everything else is an error
    pub fn severity(&self) -> Severity {
        match self {
            UploadRejection::Duplicate { .. } => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

/// Result of offering a single candidate to the manager
pub type AddOutcome = Result<UploadedFile, UploadRejection>;

/// Client-side list of files attached in document mode
#[derive(Debug, Default)]
pub struct UploadManager {
    limits: UploadLimits,
    files: Vec<UploadedFile>,
}

impl UploadManager {
    pub fn new(limits: UploadLimits) -> Self {
        Self {
            limits,
            files: Vec::new(),
        }
    }

    pub fn files(&self) -> &[UploadedFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Validate and append every candidate, one outcome per candidate
    ///
    /// A rejection never stops the remaining candidates from being processed.
    pub fn add_files<I>(&mut self, candidates: I) -> Vec<AddOutcome>
    where
        I: IntoIterator<Item = RawFile>,
    {
        candidates
            .into_iter()
            .map(|candidate| self.add_one(candidate))
            .collect()
    }

    fn add_one(&mut self, candidate: RawFile) -> AddOutcome {
        let extension = extension_of(&candidate.name);
        if !self.limits.accepted_extensions.iter().any(|ext| *ext == extension) {
            debug!(name = %candidate.name, %extension, "rejecting unsupported file type");
            return Err(UploadRejection::UnsupportedType {
                name: candidate.name,
            });
        }

        if candidate.size > self.limits.max_bytes {
            debug!(name = %candidate.name, size = candidate.size, "rejecting oversize file");
            return Err(UploadRejection::TooLarge {
                name: candidate.name,
                size: candidate.size,
            });
        }

        if self.contains(&candidate.name, candidate.size) {
            return Err(UploadRejection::Duplicate {
                name: candidate.name,
            });
        }

        let file = UploadedFile::from(candidate);
        info!(name = %file.name, size = file.size, "file added to upload list");
        self.files.push(file.clone());
        Ok(file)
    }

    /// Remove the first entry matching `(name, size)`
    pub fn remove_file(&mut self, name: &str, size: u64) -> Option<UploadedFile> {
        let index = self.files.iter().position(|f| f.matches(name, size))?;
        let removed = self.files.remove(index);
        info!(name = %removed.name, size = removed.size, "file removed from upload list");
        Some(removed)
    }

    pub fn contains(&self, name: &str, size: u64) -> bool {
        self.files.iter().any(|f| f.matches(name, size))
    }
}
