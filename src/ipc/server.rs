//! Unix domain socket server for the host binding
//!
//! Lets an external presentation layer send commands, fetch the rendered
//! view, and subscribe to view and event pushes.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::controller::Command;
use crate::events::AssistantEvent;
use crate::view::View;

use super::protocol::{AssistantStatus, Push, Request, Response, MAX_FRAME_LEN};

/// IPC Server handling client connections
pub struct Server {
    socket_path: PathBuf,
    listener: Option<UnixListener>,
    shared: Arc<Shared>,
    shutdown_tx: broadcast::Sender<()>,
}

/// State shared with every client handler
struct Shared {
    command_tx: mpsc::Sender<Command>,
    view_rx: watch::Receiver<View>,
    event_tx: broadcast::Sender<AssistantEvent>,
    start_time: Instant,
}

/// A frame read from a client: a request, or a reason it could not be parsed
type Incoming = Result<Request, String>;

impl Server {
    /// Create a new IPC server bound to `socket_path`
    pub fn new(
        socket_path: &Path,
        command_tx: mpsc::Sender<Command>,
        view_rx: watch::Receiver<View>,
        event_tx: broadcast::Sender<AssistantEvent>,
    ) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent).context("failed to create socket directory")?;
        }

        // Remove stale socket if it exists
        if socket_path.exists() {
            std::fs::remove_file(socket_path).context("failed to remove stale socket")?;
        }

        let listener = UnixListener::bind(socket_path).context("failed to bind Unix socket")?;

        // Set socket permissions to owner-only (0600)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
        }

        let (shutdown_tx, _) = broadcast::channel(1);

        info!(?socket_path, "IPC server listening");

        Ok(Self {
            socket_path: socket_path.to_owned(),
            listener: Some(listener),
            shared: Arc::new(Shared {
                command_tx,
                view_rx,
                event_tx,
                start_time: Instant::now(),
            }),
            shutdown_tx,
        })
    }

    /// Run the server, accepting connections
    pub async fn run(&self) -> Result<()> {
        let listener = self.listener.as_ref().context("server not initialized")?;

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    debug!("client connected");
                    let shared = Arc::clone(&self.shared);
                    let mut shutdown_rx = self.shutdown_tx.subscribe();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = Self::handle_client(stream, shared) => {
                                if let Err(e) = result {
                                    warn!(?e, "client handler error");
                                }
                            }
                            _ = shutdown_rx.recv() => {
                                debug!("client handler shutting down");
                            }
                        }
                    });
                }
                Err(e) => {
                    error!(?e, "accept error");
                }
            }
        }
    }

    /// Handle a single client connection
    async fn handle_client(stream: UnixStream, shared: Arc<Shared>) -> Result<()> {
        let (reader, mut writer) = stream.into_split();
        let (incoming_tx, mut incoming_rx) = mpsc::channel::<Incoming>(16);
        let reader_task = tokio::spawn(Self::read_frames(reader, incoming_tx));

        let mut view_rx = shared.view_rx.clone();
        let mut event_rx: Option<broadcast::Receiver<AssistantEvent>> = None;

        let result = loop {
            tokio::select! {
                incoming = incoming_rx.recv() => {
                    let Some(incoming) = incoming else {
                        debug!("client disconnected");
                        break Ok(());
                    };

                    let response = match incoming {
                        Ok(request) => {
                            debug!(?request, "received request");
                            let (response, subscribe) = Self::process_request(request, &shared).await;
                            if subscribe && event_rx.is_none() {
                                view_rx.borrow_and_update();
                                event_rx = Some(shared.event_tx.subscribe());
                                debug!("client subscribed to pushes");
                            }
                            response
                        }
                        Err(message) => Response::Error {
                            code: "bad_request".to_string(),
                            message,
                        },
                    };

                    if let Err(e) = Self::send_message(&mut writer, &response).await {
                        break Err(e);
                    }
                }

                changed = view_rx.changed(), if event_rx.is_some() => {
                    if changed.is_err() {
                        break Ok(());
                    }
                    let view = view_rx.borrow_and_update().clone();
                    if let Err(e) = Self::send_message(&mut writer, &Push::ViewChanged { view }).await {
                        break Err(e);
                    }
                }

                event = next_event(&mut event_rx), if event_rx.is_some() => {
                    match event {
                        Ok(event) => {
                            if let Err(e) = Self::send_message(&mut writer, &Push::Event { event }).await {
                                break Err(e);
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!(skipped = n, "subscriber lagged behind events");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            event_rx = None;
                        }
                    }
                }
            }
        };

        reader_task.abort();
        result
    }

    /// Read length-prefixed frames until the client goes away
    async fn read_frames(mut reader: OwnedReadHalf, incoming_tx: mpsc::Sender<Incoming>) {
        let mut len_buf = [0u8; 4];

        loop {
            // Read message length (4-byte little-endian)
            match reader.read_exact(&mut len_buf).await {
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return,
                Err(e) => {
                    warn!(?e, "failed to read frame header");
                    return;
                }
            }

            let len = u32::from_le_bytes(len_buf) as usize;
            if len > MAX_FRAME_LEN {
                warn!(len, "message too large, disconnecting");
                return;
            }

            // Read message body
            let mut msg_buf = vec![0u8; len];
            if let Err(e) = reader.read_exact(&mut msg_buf).await {
                warn!(?e, "failed to read frame body");
                return;
            }

            let incoming = serde_json::from_slice::<Request>(&msg_buf).map_err(|e| {
                debug!(?e, "malformed request");
                format!("failed to parse request: {e}")
            });

            if incoming_tx.send(incoming).await.is_err() {
                return;
            }
        }
    }

    /// Send a length-prefixed JSON message
    async fn send_message<T: serde::Serialize>(writer: &mut OwnedWriteHalf, msg: &T) -> Result<()> {
        let msg_bytes = serde_json::to_vec(msg)?;
        let msg_len = (msg_bytes.len() as u32).to_le_bytes();

        writer.write_all(&msg_len).await?;
        writer.write_all(&msg_bytes).await?;

        Ok(())
    }

    /// Process a request and return a response
    /// Returns (Response, should_subscribe)
    async fn process_request(request: Request, shared: &Shared) -> (Response, bool) {
        match request {
            Request::Ping => (Response::Pong, false),

            Request::GetStatus => {
                let uptime = shared.start_time.elapsed().as_secs();
                let view = shared.view_rx.borrow().clone();
                (Response::Status(AssistantStatus::from_view(&view, uptime)), false)
            }

            Request::GetView => {
                let view = shared.view_rx.borrow().clone();
                (Response::View(view), false)
            }

            Request::Subscribe => (Response::Subscribed, true),

            command => {
                let Some(command) = command.into_command() else {
                    return (
                        Response::Error {
                            code: "unsupported".to_string(),
                            message: "request carries no command".to_string(),
                        },
                        false,
                    );
                };

                match shared.command_tx.send(command).await {
                    Ok(()) => (Response::Accepted, false),
                    Err(_) => (
                        Response::Error {
                            code: "unavailable".to_string(),
                            message: "controller is not running".to_string(),
                        },
                        false,
                    ),
                }
            }
        }
    }

    /// Gracefully shutdown the server
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());

        // Remove socket file
        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!(?e, "failed to remove socket file");
            }
        }

        info!("IPC server shutdown complete");
    }
}

/// Receive from an optional subscription; only polled when it is `Some`
async fn next_event(
    event_rx: &mut Option<broadcast::Receiver<AssistantEvent>>,
) -> Result<AssistantEvent, broadcast::error::RecvError> {
    match event_rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{SessionState, Transcript};
    use crate::transcribe::Mode;
    use crate::view::Snapshot;

    fn idle_view(mode: Mode) -> View {
        View::render(&Snapshot {
            mode,
            state: SessionState::Idle,
            transcript: &Transcript::Placeholder,
            files: &[],
            notifications: &[],
        })
    }

    async fn send(stream: &mut UnixStream, value: serde_json::Value) {
        let bytes = serde_json::to_vec(&value).unwrap();
        stream.write_all(&(bytes.len() as u32).to_le_bytes()).await.unwrap();
        stream.write_all(&bytes).await.unwrap();
    }

    async fn recv(stream: &mut UnixStream) -> serde_json::Value {
        let mut len_buf = [0u8; 4];
        stream.read_exact(&mut len_buf).await.unwrap();
        let mut body = vec![0u8; u32::from_le_bytes(len_buf) as usize];
        stream.read_exact(&mut body).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    struct Harness {
        server: Arc<Server>,
        command_rx: mpsc::Receiver<Command>,
        view_tx: watch::Sender<View>,
        event_tx: broadcast::Sender<AssistantEvent>,
        socket_path: PathBuf,
    }

    fn harness(name: &str) -> Harness {
        let socket_path = std::env::temp_dir().join(format!("voice-assistant-{}-{}.sock", name, std::process::id()));
        let (command_tx, command_rx) = mpsc::channel(8);
        let (view_tx, view_rx) = watch::channel(idle_view(Mode::Voice));
        let (event_tx, _) = broadcast::channel(8);
        let server = Arc::new(Server::new(&socket_path, command_tx, view_rx, event_tx.clone()).unwrap());

        let runner = Arc::clone(&server);
        tokio::spawn(async move {
            let _ = runner.run().await;
        });

        Harness {
            server,
            command_rx,
            view_tx,
            event_tx,
            socket_path,
        }
    }

    #[tokio::test]
    async fn test_ping_and_view() {
        let h = harness("ping");
        let mut stream = UnixStream::connect(&h.socket_path).await.unwrap();

        send(&mut stream, serde_json::json!({"type": "ping"})).await;
        assert_eq!(recv(&mut stream).await["type"], "pong");

        send(&mut stream, serde_json::json!({"type": "get_view"})).await;
        let view = recv(&mut stream).await;
        assert_eq!(view["type"], "view");
        assert_eq!(view["status"]["text"], "Tap to speak");

        h.server.shutdown().await;
    }

    #[tokio::test]
    async fn test_commands_are_forwarded() {
        let mut h = harness("commands");
        let mut stream = UnixStream::connect(&h.socket_path).await.unwrap();

        send(&mut stream, serde_json::json!({"type": "set_mode", "mode": "document"})).await;
        assert_eq!(recv(&mut stream).await["type"], "accepted");
        assert_eq!(h.command_rx.recv().await, Some(Command::SetMode(Mode::Document)));

        send(&mut stream, serde_json::json!({"type": "no_such_request"})).await;
        let response = recv(&mut stream).await;
        assert_eq!(response["type"], "error");
        assert_eq!(response["code"], "bad_request");

        h.server.shutdown().await;
    }

    #[tokio::test]
    async fn test_subscriber_receives_pushes() {
        let h = harness("subscribe");
        let mut stream = UnixStream::connect(&h.socket_path).await.unwrap();

        send(&mut stream, serde_json::json!({"type": "subscribe"})).await;
        assert_eq!(recv(&mut stream).await["type"], "subscribed");

        h.view_tx.send_replace(idle_view(Mode::Document));
        let push = recv(&mut stream).await;
        assert_eq!(push["type"], "view_changed");
        assert_eq!(push["view"]["upload_panel_visible"], true);

        let _ = h.event_tx.send(AssistantEvent::ModeChanged { mode: Mode::Document });
        let push = recv(&mut stream).await;
        assert_eq!(push["type"], "event");
        assert_eq!(push["event"]["type"], "mode_changed");

        h.server.shutdown().await;
    }
}
