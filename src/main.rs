//! voice-assistant: Voice assistant client for a local transcription service
//!
//! Provides:
//! - Mic sessions (Idle, Listening, Success, Error) against `POST /transcribe`
//! - Document mode with a validated, client-side upload list
//! - Auto-dismissing notifications
//! - A console front end and a Unix socket binding for external UIs
//!
//! Audio capture and speech-to-text live in the transcription service; this
//! client only sends the request and renders the outcome.

mod config;
mod console;
mod controller;
mod events;
mod ipc;
mod lifecycle;
mod notify;
mod session;
mod transcribe;
mod upload;
mod view;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::console::{ConsoleInput, ConsoleListener, HELP};
use crate::controller::AssistantController;
use crate::events::AssistantEvent;
use crate::ipc::Server;
use crate::lifecycle::ShutdownSignal;
use crate::transcribe::HttpTranscriptionClient;
use crate::view::ConsoleRenderer;

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so they do not interleave with rendered frames
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "voice-assistant starting");

    // Load configuration
    let config = Config::load()?;
    config.ensure_dirs()?;
    info!(
        service_url = %config.service_url,
        method = ?config.request_method,
        socket_path = ?config.socket_path,
        "configuration loaded"
    );

    let shutdown = ShutdownSignal::new();

    // Console/IPC -> controller
    let (command_tx, command_rx) = mpsc::channel(32);
    // Stdin thread -> console dispatcher
    let (console_tx, mut console_rx) = mpsc::channel::<ConsoleInput>(32);
    // Controller -> event log and IPC subscribers
    let (event_tx, _event_rx) = broadcast::channel::<AssistantEvent>(64);

    let client = HttpTranscriptionClient::new(
        &config.service_url,
        config.request_method,
        config.request_timeout,
    )
    .context("failed to build transcription client")?;
    info!(endpoint = client.endpoint(), "transcription client ready");

    let controller = AssistantController::new(&config, Arc::new(client), event_tx.clone());
    let view_rx = controller.subscribe_view();

    tokio::spawn(ConsoleRenderer::new(std::io::stdout()).run(view_rx.clone()));

    let console_listener = ConsoleListener::new(console_tx);
    match console_listener.start() {
        Ok(()) => info!("console listener started, type `help` for commands"),
        Err(e) => warn!(?e, "continuing without console input"),
    }

    let server = Server::new(
        &config.socket_path,
        command_tx.clone(),
        view_rx.clone(),
        event_tx.clone(),
    )?;

    let mut log_event_rx = event_tx.subscribe();

    info!("assistant initialized, entering main loop");

    tokio::select! {
        // Run the controller (processes commands, results and timers)
        _ = controller.run(command_rx) => {
            info!("controller exited");
        }

        // Run the IPC server (accepts client connections)
        result = server.run() => {
            if let Err(e) = result {
                error!(?e, "IPC server error");
            }
        }

        // Dispatch console input
        _ = async {
            while let Some(input) = console_rx.recv().await {
                match input {
                    ConsoleInput::Command(command) => {
                        if command_tx.send(command).await.is_err() {
                            break;
                        }
                    }
                    ConsoleInput::ListFiles => {
                        let view = view_rx.borrow().clone();
                        if view.files.is_empty() {
                            println!("no documents attached");
                        }
                        for file in &view.files {
                            println!("{} {} {} ({})", file.icon.glyph(), file.name, file.size, file.display_size);
                        }
                    }
                    ConsoleInput::Help => println!("{HELP}"),
                    ConsoleInput::Quit => shutdown.trigger(),
                }
            }
            // Stdin closed; keep serving the IPC binding
            info!("console input closed");
            std::future::pending::<()>().await
        } => {}

        // Log assistant events
        _ = async {
            loop {
                match log_event_rx.recv().await {
                    Ok(event) => info!(%event, "assistant event"),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "event log receiver lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        } => {
            info!("event log exited");
        }

        // Wait for shutdown signal
        _ = shutdown.wait() => {
            info!("shutdown signal received");
        }
    }

    // Cleanup
    info!("shutting down...");

    console_listener.stop();
    server.shutdown().await;

    info!("voice-assistant stopped");

    Ok(())
}
