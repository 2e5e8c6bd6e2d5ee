//! Line command parsing for the terminal front end

use std::path::Path;

use crate::controller::Command;
use crate::transcribe::Mode;
use crate::upload::RawFile;

pub const HELP: &str = "\
commands:
  mic | m                 activate the microphone
  mode voice|document     switch input mode
  add <path>...           attach documents
  remove <name> <size>    detach a document
  files                   list attached documents
  help                    show this help
  quit | q                exit";

/// A parsed console line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleInput {
    /// Forwarded to the controller
    Command(Command),
    ListFiles,
    Help,
    Quit,
}

/// Errors parsing a console line
#[derive(Debug, thiserror::Error)]
pub enum CommandParseError {
    #[error("empty command")]
    Empty,

    #[error("unknown command: {0}")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("{0}")]
    InvalidMode(String),

    #[error("cannot read {path}: {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Parse one line typed at the console
pub fn parse_line(line: &str) -> Result<ConsoleInput, CommandParseError> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Err(CommandParseError::Empty);
    };

    match head.to_ascii_lowercase().as_str() {
        "mic" | "m" => Ok(ConsoleInput::Command(Command::ActivateMic)),
        "mode" => {
            let mode: Mode = words
                .next()
                .ok_or(CommandParseError::Usage("mode voice|document"))?
                .parse()
                .map_err(CommandParseError::InvalidMode)?;
            Ok(ConsoleInput::Command(Command::SetMode(mode)))
        }
        "add" => {
            let files = words.map(read_candidate).collect::<Result<Vec<_>, _>>()?;
            if files.is_empty() {
                return Err(CommandParseError::Usage("add <path>..."));
            }
            Ok(ConsoleInput::Command(Command::AddFiles(files)))
        }
        "remove" | "rm" => {
            let usage = CommandParseError::Usage("remove <name> <size>");
            let (Some(name), Some(size)) = (words.next(), words.next()) else {
                return Err(usage);
            };
            let size = size.parse().map_err(|_| usage)?;
            Ok(ConsoleInput::Command(Command::RemoveFile {
                name: name.to_string(),
                size,
            }))
        }
        "files" | "ls" => Ok(ConsoleInput::ListFiles),
        "help" | "?" => Ok(ConsoleInput::Help),
        "quit" | "q" | "exit" => Ok(ConsoleInput::Quit),
        other => Err(CommandParseError::Unknown(other.to_string())),
    }
}

/// Describe a file on disk as an upload candidate
fn read_candidate(path: &str) -> Result<RawFile, CommandParseError> {
    let metadata = std::fs::metadata(path).map_err(|source| CommandParseError::Unreadable {
        path: path.to_string(),
        source,
    })?;
    let name = Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string());
    Ok(RawFile::guessed(name, metadata.len()))
}
