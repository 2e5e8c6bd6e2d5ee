//! Stdin listener for console commands
//!
//! Reads lines on a dedicated thread, since stdin is blocking, and forwards
//! parsed input to the async side over a channel.

use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::commands::{parse_line, CommandParseError, ConsoleInput};

/// Console listener that turns typed lines into [`ConsoleInput`]s
pub struct ConsoleListener {
    input_tx: mpsc::Sender<ConsoleInput>,
    running: Arc<AtomicBool>,
}

impl ConsoleListener {
    pub fn new(input_tx: mpsc::Sender<ConsoleInput>) -> Self {
        Self {
            input_tx,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start reading stdin on a dedicated thread
    pub fn start(&self) -> Result<(), ListenerError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(ListenerError::AlreadyRunning);
        }

        let input_tx = self.input_tx.clone();
        let running = Arc::clone(&self.running);

        thread::Builder::new()
            .name("console-listener".to_string())
            .spawn(move || {
                info!("console listener thread started");
                let stdin = std::io::stdin();
                read_loop(stdin.lock(), &input_tx, &running);
                running.store(false, Ordering::SeqCst);
                info!("console listener thread stopped");
            })
            .map_err(|e| ListenerError::ThreadSpawn(e.to_string()))?;

        Ok(())
    }

    /// Stop forwarding input; the thread exits after the next line
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Errors that can occur in the console listener
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    #[error("console listener is already running")]
    AlreadyRunning,

    #[error("failed to spawn listener thread: {0}")]
    ThreadSpawn(String),
}

/// Forward parsed lines until EOF, a closed channel, or `running` is cleared
///
/// EOF only ends console input; the IPC binding keeps the process alive.
fn read_loop<R: BufRead>(reader: R, input_tx: &mpsc::Sender<ConsoleInput>, running: &AtomicBool) {
    for line in reader.lines() {
        if !running.load(Ordering::SeqCst) {
            break;
        }

        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!(?e, "failed to read console line");
                break;
            }
        };

        let input = match parse_line(&line) {
            Ok(input) => input,
            Err(CommandParseError::Empty) => continue,
            Err(e) => {
                eprintln!("{e}");
                continue;
            }
        };

        debug!(?input, "console input");
        if input_tx.blocking_send(input).is_err() {
            warn!("failed to forward console input - channel closed?");
            break;
        }
    }
}
