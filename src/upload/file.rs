//! File descriptors and presentation helpers for the upload list

use serde::{Deserialize, Serialize};

/// A candidate file offered by the host, before validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFile {
    pub name: String,
    pub size: u64,
    #[serde(default)]
    pub mime_type: String,
}

impl RawFile {
    pub fn new(name: impl Into<String>, size: u64, mime_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size,
            mime_type: mime_type.into(),
        }
    }

    /// Build a candidate from a name and size, guessing the MIME type
    /// from the extension
    pub fn guessed(name: impl Into<String>, size: u64) -> Self {
        let name = name.into();
        let mime_type = mime_for_extension(&extension_of(&name)).to_string();
        Self {
            name,
            size,
            mime_type,
        }
    }
}

/// A validated entry of the upload list
///
/// Identity is the `(name, size)` pair, not the content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub name: String,
    pub size: u64,
    pub mime_type: String,
}

impl UploadedFile {
    pub fn matches(&self, name: &str, size: u64) -> bool {
        self.name == name && self.size == size
    }

    pub fn icon(&self) -> FileIcon {
        FileIcon::for_name(&self.name)
    }

    pub fn display_size(&self) -> String {
        format_file_size(self.size)
    }
}

impl From<RawFile> for UploadedFile {
    fn from(raw: RawFile) -> Self {
        Self {
            name: raw.name,
            size: raw.size,
            mime_type: raw.mime_type,
        }
    }
}

/// Icon group shown next to a file row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileIcon {
    Pdf,
    Document,
    Text,
    Generic,
}

impl FileIcon {
    pub fn for_name(name: &str) -> Self {
        match extension_of(name).as_str() {
            "pdf" => Self::Pdf,
            "doc" | "docx" => Self::Document,
            "txt" => Self::Text,
            _ => Self::Generic,
        }
    }

    /// Short glyph used by text renderers
    pub fn glyph(&self) -> &'static str {
        match self {
            FileIcon::Pdf => "[PDF]",
            FileIcon::Document => "[DOC]",
            FileIcon::Text => "[TXT]",
            FileIcon::Generic => "[FILE]",
        }
    }
}

/// Lowercased text after the last `.`; a name without a dot yields itself
pub fn extension_of(name: &str) -> String {
    name.rsplit('.').next().unwrap_or(name).to_lowercase()
}

pub fn mime_for_extension(ext: &str) -> &'static str {
    match ext {
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

const SIZE_UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

/// Human-readable size using 1024-based units, at most two decimals
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut unit = 0;
    let mut scale = 1u64;
    while unit + 1 < SIZE_UNITS.len() && bytes >= scale * 1024 {
        scale *= 1024;
        unit += 1;
    }

    let value = format!("{:.2}", bytes as f64 / scale as f64);
    let value = value.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", value, SIZE_UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(500), "500 Bytes");
        assert_eq!(format_file_size(1024), "1 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(10 * 1024 * 1024), "10 MB");
        assert_eq!(format_file_size(1_234_567), "1.18 MB");
        assert_eq!(format_file_size(3 * 1024 * 1024 * 1024), "3 GB");
        assert_eq!(format_file_size(2048 * 1024 * 1024 * 1024), "2048 GB");
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("notes.TXT"), "txt");
        assert_eq!(extension_of("archive.tar.gz"), "gz");
        assert_eq!(extension_of("README"), "readme");
    }

    #[test]
    fn test_icon_groups() {
        assert_eq!(FileIcon::for_name("paper.pdf"), FileIcon::Pdf);
        assert_eq!(FileIcon::for_name("report.doc"), FileIcon::Document);
        assert_eq!(FileIcon::for_name("report.DOCX"), FileIcon::Document);
        assert_eq!(FileIcon::for_name("notes.txt"), FileIcon::Text);
        assert_eq!(FileIcon::for_name("image.png"), FileIcon::Generic);
    }

    #[test]
    fn test_guessed_mime() {
        let raw = RawFile::guessed("notes.txt", 500);
        assert_eq!(raw.mime_type, "text/plain");
    }
}
