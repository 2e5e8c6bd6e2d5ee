//! Assistant controller
//!
//! Owns the upload list, the session machine and the toast stack, and is the
//! only place where they change. Commands arrive over a channel; network
//! results and timer ticks come back as internal messages, so everything runs
//! on a single task without locks.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::events::AssistantEvent;
use crate::notify::{Notifier, Severity};
use crate::session::{Reversion, SessionMachine, SessionState, Settlement};
use crate::transcribe::{Mode, TranscribeError, TranscribeRequest, TranscribeResponse, TranscriptionClient};
use crate::upload::{RawFile, UploadManager, UploadedFile};
use crate::view::{Snapshot, View};

/// User intents delivered to the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Mic button or keyboard shortcut
    ActivateMic,
    SetMode(Mode),
    AddFiles(Vec<RawFile>),
    RemoveFile { name: String, size: u64 },
}

/// Messages the controller sends to itself from spawned tasks
#[derive(Debug)]
enum Internal {
    Settled {
        session_id: u64,
        result: Result<TranscribeResponse, TranscribeError>,
    },
    Revert {
        session_id: u64,
    },
    DismissToast {
        id: u64,
    },
}

pub struct AssistantController {
    mode: Mode,
    uploads: UploadManager,
    session: SessionMachine,
    notifier: Notifier,
    client: Arc<dyn TranscriptionClient>,
    toast_lifetime: Duration,
    requests_sent: u64,
    internal_tx: mpsc::UnboundedSender<Internal>,
    internal_rx: mpsc::UnboundedReceiver<Internal>,
    event_tx: broadcast::Sender<AssistantEvent>,
    view_tx: watch::Sender<View>,
}

impl AssistantController {
    pub fn new(
        config: &Config,
        client: Arc<dyn TranscriptionClient>,
        event_tx: broadcast::Sender<AssistantEvent>,
    ) -> Self {
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        let uploads = UploadManager::new(config.uploads.clone());
        let session = SessionMachine::new(config.timings, event_tx.clone());
        let notifier = Notifier::new();

        let initial = View::render(&Snapshot {
            mode: Mode::default(),
            state: session.state(),
            transcript: session.transcript(),
            files: uploads.files(),
            notifications: notifier.active(),
        });
        let (view_tx, _) = watch::channel(initial);

        Self {
            mode: Mode::default(),
            uploads,
            session,
            notifier,
            client,
            toast_lifetime: config.timings.toast_lifetime,
            requests_sent: 0,
            internal_tx,
            internal_rx,
            event_tx,
            view_tx,
        }
    }

    /// Receiver of every re-rendered view
    pub fn subscribe_view(&self) -> watch::Receiver<View> {
        self.view_tx.subscribe()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn files(&self) -> &[UploadedFile] {
        self.uploads.files()
    }

    /// Number of transcription requests issued so far
    pub fn requests_sent(&self) -> u64 {
        self.requests_sent
    }

    pub fn view(&self) -> View {
        View::render(&self.snapshot())
    }

    /// Run the controller until every command sender is dropped
    pub async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        info!("controller started in Idle state");

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some(message) = self.internal_rx.recv() => {
                    self.handle_internal(message);
                }
            }
        }

        info!("controller stopped");
    }

    pub fn handle_command(&mut self, command: Command) {
        debug!(?command, "handling command");
        match command {
            Command::ActivateMic => self.activate_mic(),
            Command::SetMode(mode) => self.set_mode(mode),
            Command::AddFiles(files) => self.add_files(files),
            Command::RemoveFile { name, size } => self.remove_file(&name, size),
        }
        self.publish();
    }

    fn activate_mic(&mut self) {
        let Some(session_id) = self.session.activate() else {
            return;
        };

        let request = TranscribeRequest::new(self.mode, self.uploads.files());
        self.requests_sent += 1;
        info!(session_id, mode = %request.mode, files = request.files.len(), "issuing transcription request");

        let client = Arc::clone(&self.client);
        let internal_tx = self.internal_tx.clone();
        tokio::spawn(async move {
            let result = client.transcribe(&request).await;
            let _ = internal_tx.send(Internal::Settled { session_id, result });
        });
    }

    fn set_mode(&mut self, mode: Mode) {
        if self.mode == mode {
            return;
        }
        info!(from = %self.mode, to = %mode, "mode changed");
        self.mode = mode;
        let _ = self.event_tx.send(AssistantEvent::ModeChanged { mode });
    }

    fn add_files(&mut self, files: Vec<RawFile>) {
        for outcome in self.uploads.add_files(files) {
            match outcome {
                Ok(file) => {
                    let message = format!("File uploaded: {}", file.name);
                    let _ = self.event_tx.send(AssistantEvent::FileAdded {
                        name: file.name,
                        size: file.size,
                    });
                    self.notify(message, Severity::Success);
                }
                Err(rejection) => self.notify(rejection.to_string(), rejection.severity()),
            }
        }
    }

    fn remove_file(&mut self, name: &str, size: u64) {
        let Some(removed) = self.uploads.remove_file(name, size) else {
            debug!(name, size, "no upload entry to remove");
            return;
        };

        let message = format!("File removed: {}", removed.name);
        let _ = self.event_tx.send(AssistantEvent::FileRemoved {
            name: removed.name,
            size: removed.size,
        });
        self.notify(message, Severity::Success);
    }

    fn notify(&mut self, message: String, severity: Severity) {
        let notification = self.notifier.notify(message, severity);
        let id = notification.id;
        let _ = self.event_tx.send(AssistantEvent::NotificationShown {
            id,
            message: notification.message,
            severity,
        });

        let internal_tx = self.internal_tx.clone();
        let lifetime = self.toast_lifetime;
        tokio::spawn(async move {
            tokio::time::sleep(lifetime).await;
            let _ = internal_tx.send(Internal::DismissToast { id });
        });
    }

    fn handle_internal(&mut self, message: Internal) {
        match message {
            Internal::Settled { session_id, result } => {
                let settlement = match result {
                    Ok(response) => Settlement::Transcribed {
                        question: response.question,
                        answer: response.answer,
                    },
                    Err(e) => {
                        warn!(session_id, error = %e, "transcription failed");
                        Settlement::Failed {
                            reason: e.to_string(),
                        }
                    }
                };
                if let Some(reversion) = self.session.settle(session_id, settlement) {
                    self.schedule_reversion(reversion);
                }
            }
            Internal::Revert { session_id } => {
                self.session.revert(session_id);
            }
            Internal::DismissToast { id } => {
                if self.notifier.dismiss(id) {
                    let _ = self.event_tx.send(AssistantEvent::NotificationDismissed { id });
                }
            }
        }
        self.publish();
    }

    fn schedule_reversion(&self, reversion: Reversion) {
        let internal_tx = self.internal_tx.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = reversion.token.cancelled() => {
                    debug!(session_id = reversion.session_id, "reversion cancelled");
                }
                _ = tokio::time::sleep(reversion.after) => {
                    let _ = internal_tx.send(Internal::Revert {
                        session_id: reversion.session_id,
                    });
                }
            }
        });
    }

    fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            mode: self.mode,
            state: self.session.state(),
            transcript: self.session.transcript(),
            files: self.uploads.files(),
            notifications: self.notifier.active(),
        }
    }

    fn publish(&self) {
        self.view_tx.send_replace(View::render(&self.snapshot()));
    }

    /// Process the next internal message, waiting for timers as needed
    #[cfg(test)]
    async fn step(&mut self) {
        if let Some(message) = self.internal_rx.recv().await {
            self.handle_internal(message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::CONNECTION_ERROR_MESSAGE;
    use crate::view::{PanelContent, IDLE_STATUS, SUCCESS_STATUS, ERROR_STATUS};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::sync::Notify;
    use tokio::time::Instant;

    const MIB: u64 = 1024 * 1024;

    /// Client that records requests and answers with a fixed reply
    struct ScriptedClient {
        calls: AtomicUsize,
        requests: Mutex<Vec<TranscribeRequest>>,
        reply: Result<TranscribeResponse, String>,
        gate: Option<Arc<Notify>>,
    }

    impl ScriptedClient {
        fn answering(question: &str) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
                reply: Ok(TranscribeResponse {
                    question: question.to_string(),
                    answer: None,
                }),
                gate: None,
            }
        }

        fn unreachable() -> Self {
            Self {
                reply: Err("connection refused".to_string()),
                ..Self::answering("")
            }
        }

        fn gated(mut self, gate: Arc<Notify>) -> Self {
            self.gate = Some(gate);
            self
        }
    }

    #[async_trait]
    impl TranscriptionClient for ScriptedClient {
        async fn transcribe(
            &self,
            request: &TranscribeRequest,
        ) -> Result<TranscribeResponse, TranscribeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request.clone());
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.reply.clone().map_err(TranscribeError::Transport)
        }
    }

    fn controller(client: Arc<ScriptedClient>) -> AssistantController {
        let config = Config::load().unwrap();
        let (event_tx, _) = broadcast::channel(64);
        AssistantController::new(&config, client, event_tx)
    }

    fn toasts(controller: &AssistantController) -> Vec<(String, Severity)> {
        controller
            .view()
            .toasts
            .into_iter()
            .map(|t| (t.message, t.severity))
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_voice_session_success_reverts_to_idle() {
        let client = Arc::new(ScriptedClient::answering("hello world"));
        let mut controller = controller(client.clone());
        let started = Instant::now();

        controller.handle_command(Command::ActivateMic);
        assert_eq!(controller.state(), SessionState::Listening);
        assert!(!controller.view().mic.enabled);

        controller.step().await;
        assert_eq!(controller.state(), SessionState::Success);
        let view = controller.view();
        assert!(view.mic.enabled);
        assert_eq!(view.status.text, SUCCESS_STATUS);
        assert!(matches!(
            view.transcript.content,
            PanelContent::Transcript { ref question, .. } if question == "hello world"
        ));

        controller.step().await;
        assert_eq!(controller.state(), SessionState::Idle);
        assert_eq!(controller.view().status.text, IDLE_STATUS);
        assert!(started.elapsed() >= Duration::from_millis(2500));

        let requests = client.requests.lock().unwrap();
        assert_eq!(requests[0], TranscribeRequest::new(Mode::Voice, &[]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_document_session_sends_file_metadata() {
        let client = Arc::new(ScriptedClient::answering("what is in my notes"));
        let mut controller = controller(client.clone());

        controller.handle_command(Command::SetMode(Mode::Document));
        controller.handle_command(Command::AddFiles(vec![RawFile::new("notes.txt", 500, "text/plain")]));
        controller.handle_command(Command::ActivateMic);
        controller.step().await;

        let requests = client.requests.lock().unwrap();
        let json = serde_json::to_value(&requests[0]).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "mode": "document",
                "files": [{"name": "notes.txt", "size": 500, "type": "text/plain"}]
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_service_shows_error_and_reenables_mic() {
        let client = Arc::new(ScriptedClient::unreachable());
        let mut controller = controller(client);
        let started = Instant::now();

        controller.handle_command(Command::ActivateMic);
        controller.step().await;

        // Mic comes back as soon as the request settles
        assert!(started.elapsed() < Duration::from_millis(100));
        let view = controller.view();
        assert_eq!(controller.state(), SessionState::Error);
        assert!(view.mic.enabled);
        assert_eq!(view.status.text, ERROR_STATUS);
        assert!(matches!(
            view.transcript.content,
            PanelContent::Error { ref message, .. } if message == CONNECTION_ERROR_MESSAGE
        ));

        controller.step().await;
        assert_eq!(controller.state(), SessionState::Idle);
        assert!(started.elapsed() >= Duration::from_millis(4000));
        // The error stays in the panel after reverting
        assert!(matches!(controller.view().transcript.content, PanelContent::Error { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_activations_issue_one_request() {
        let gate = Arc::new(Notify::new());
        let client = Arc::new(ScriptedClient::answering("once").gated(gate.clone()));
        let mut controller = controller(client.clone());

        for _ in 0..5 {
            controller.handle_command(Command::ActivateMic);
            tokio::task::yield_now().await;
        }
        assert_eq!(controller.requests_sent(), 1);
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);

        gate.notify_one();
        controller.step().await;
        assert_eq!(controller.state(), SessionState::Success);
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_session_supersedes_reversion() {
        let client = Arc::new(ScriptedClient::answering("again"));
        let mut controller = controller(client.clone());

        controller.handle_command(Command::ActivateMic);
        controller.step().await;
        assert_eq!(controller.state(), SessionState::Success);

        // Start a second session inside the first display window
        controller.handle_command(Command::ActivateMic);
        controller.step().await;
        assert_eq!(controller.state(), SessionState::Success);
        let second_settled = Instant::now();

        controller.step().await;
        assert_eq!(controller.state(), SessionState::Idle);
        assert!(second_settled.elapsed() >= Duration::from_millis(2500));
        assert_eq!(controller.requests_sent(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_files_notifications() {
        let client = Arc::new(ScriptedClient::answering(""));
        let mut controller = controller(client);

        controller.handle_command(Command::AddFiles(vec![
            RawFile::guessed("malware.exe", 10),
            RawFile::guessed("big.pdf", 11 * MIB),
            RawFile::guessed("notes.txt", 500),
            RawFile::guessed("notes.txt", 500),
        ]));

        assert_eq!(controller.files().len(), 1);
        assert_eq!(
            toasts(&controller),
            vec![
                ("File type not supported: malware.exe".to_string(), Severity::Error),
                ("File too large: big.pdf".to_string(), Severity::Error),
                ("File uploaded: notes.txt".to_string(), Severity::Success),
                ("File already uploaded: notes.txt".to_string(), Severity::Warning),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_toasts_expire_after_lifetime() {
        let client = Arc::new(ScriptedClient::answering(""));
        let mut controller = controller(client);
        let started = Instant::now();

        controller.handle_command(Command::AddFiles(vec![RawFile::guessed("a.txt", 1)]));
        tokio::time::advance(Duration::from_secs(1)).await;
        controller.handle_command(Command::AddFiles(vec![RawFile::guessed("b.txt", 1)]));
        assert_eq!(toasts(&controller).len(), 2);

        controller.step().await;
        assert_eq!(toasts(&controller).len(), 1);
        assert!(started.elapsed() >= Duration::from_secs(3));

        controller.step().await;
        assert!(toasts(&controller).is_empty());
        assert!(started.elapsed() >= Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_file_panel_visibility() {
        let client = Arc::new(ScriptedClient::answering(""));
        let mut controller = controller(client);

        controller.handle_command(Command::SetMode(Mode::Document));
        assert_eq!(controller.mode(), Mode::Document);
        assert!(controller.view().upload_panel_visible);
        assert!(!controller.view().file_list_visible);

        controller.handle_command(Command::AddFiles(vec![RawFile::guessed("paper.pdf", 2048)]));
        assert!(controller.view().file_list_visible);

        // Switching away hides the panel without clearing the list
        controller.handle_command(Command::SetMode(Mode::Voice));
        assert!(!controller.view().upload_panel_visible);
        assert_eq!(controller.files().len(), 1);

        controller.handle_command(Command::RemoveFile {
            name: "paper.pdf".into(),
            size: 2048,
        });
        assert!(controller.files().is_empty());
        assert!(!controller.view().file_list_visible);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remove_missing_file_is_safe() {
        let client = Arc::new(ScriptedClient::answering(""));
        let mut controller = controller(client);
        controller.handle_command(Command::AddFiles(vec![RawFile::guessed("a.txt", 1)]));

        controller.handle_command(Command::RemoveFile {
            name: "a.txt".into(),
            size: 2,
        });
        assert_eq!(controller.files().len(), 1);
        assert_eq!(toasts(&controller).len(), 1);

        controller.handle_command(Command::RemoveFile {
            name: "a.txt".into(),
            size: 1,
        });
        assert!(controller.files().is_empty());
        assert_eq!(
            toasts(&controller).last(),
            Some(&("File removed: a.txt".to_string(), Severity::Success))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_view_channel_tracks_changes() {
        let client = Arc::new(ScriptedClient::answering(""));
        let mut controller = controller(client);
        let mut view_rx = controller.subscribe_view();

        controller.handle_command(Command::SetMode(Mode::Document));
        assert!(view_rx.has_changed().unwrap());
        assert!(view_rx.borrow_and_update().upload_panel_visible);
    }
}
