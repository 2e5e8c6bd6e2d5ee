//! Plain-text renderer for the terminal front end

use std::io::Write;

use tokio::sync::watch;
use tracing::debug;

use super::{PanelContent, View};

/// Prints a text frame whenever the published view changes
pub struct ConsoleRenderer<W> {
    out: W,
}

impl<W: Write> ConsoleRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Draw every new view until the controller drops its sender
    pub async fn run(mut self, mut view_rx: watch::Receiver<View>) {
        loop {
            let frame = format_view(&view_rx.borrow_and_update());
            if let Err(e) = self.out.write_all(frame.as_bytes()).and_then(|_| self.out.flush()) {
                debug!(?e, "console write failed");
                break;
            }

            if view_rx.changed().await.is_err() {
                break;
            }
        }
    }
}

/// Render a view as a compact text block
pub fn format_view(view: &View) -> String {
    let mut lines = Vec::new();

    let mic = if view.mic.enabled { "(mic)" } else { "(mic: busy)" };
    lines.push(format!("{} {} | mode: {}", mic, view.status.text, view.mode));

    match &view.transcript.content {
        PanelContent::Placeholder => lines.push("  Your question will appear here".to_string()),
        PanelContent::Spinner { text } => lines.push(format!("  ... {}", text)),
        PanelContent::Transcript {
            heading,
            question,
            answer,
        } => {
            lines.push(format!("  {}: {}", heading, question));
            if let Some(answer) = answer {
                lines.push(format!("  Answer: {}", answer));
            }
        }
        PanelContent::Error { heading, message } => {
            lines.push(format!("  {}: {}", heading, message));
        }
    }

    if view.upload_panel_visible {
        if view.file_list_visible {
            for file in &view.files {
                lines.push(format!(
                    "  {} {} ({})",
                    file.icon.glyph(),
                    file.name,
                    file.display_size
                ));
            }
        } else {
            lines.push("  No documents attached".to_string());
        }
    }

    for toast in &view.toasts {
        lines.push(format!("  [{}] {}", toast.severity, toast.message));
    }

    let mut frame = lines.join("\n");
    frame.push('\n');
    frame
}
