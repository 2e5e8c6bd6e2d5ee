//! Core session state machine
//!
//! Handles transitions between Idle, Listening, Success and Error for a
//! single outstanding transcription request.

use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::Timings;
use crate::events::AssistantEvent;

/// Fixed message shown when the service cannot be reached
pub const CONNECTION_ERROR_MESSAGE: &str =
    "Could not connect to the transcription service. Please make sure the server is running.";

/// The four possible states of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Waiting for the mic to be activated
    #[default]
    Idle,
    /// A transcription request is in flight
    Listening,
    /// Last request succeeded; reverts to Idle after the display window
    Success,
    /// Last request failed; reverts to Idle after the display window
    Error,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => write!(f, "Idle"),
            SessionState::Listening => write!(f, "Listening"),
            SessionState::Success => write!(f, "Success"),
            SessionState::Error => write!(f, "Error"),
        }
    }
}

/// Content of the transcript panel
///
/// Survives the reversion to Idle; only the next session replaces it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Transcript {
    /// Nothing transcribed yet
    #[default]
    Placeholder,
    /// Spinner while the request is in flight
    Pending,
    Transcribed {
        question: String,
        answer: Option<String>,
    },
    Failed {
        message: String,
    },
}

/// How a request settled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    Transcribed {
        question: String,
        answer: Option<String>,
    },
    Failed {
        reason: String,
    },
}

/// A reversion to Idle that the caller must schedule
///
/// Cancelling `token` drops the reversion; a new session does so.
#[derive(Debug, Clone)]
pub struct Reversion {
    pub session_id: u64,
    pub after: Duration,
    pub token: CancellationToken,
}

/// The state machine that drives mic sessions
pub struct SessionMachine {
    state: SessionState,
    /// Id of the latest session; stale settlements and reversions are ignored
    session_id: u64,
    /// Time when the current non-Idle state was entered
    state_entered_at: Option<Instant>,
    transcript: Transcript,
    pending_reversion: Option<CancellationToken>,
    timings: Timings,
    event_tx: broadcast::Sender<AssistantEvent>,
}

impl SessionMachine {
    pub fn new(timings: Timings, event_tx: broadcast::Sender<AssistantEvent>) -> Self {
        Self {
            state: SessionState::Idle,
            session_id: 0,
            state_entered_at: None,
            transcript: Transcript::Placeholder,
            pending_reversion: None,
            timings,
            event_tx,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// The mic is inert while a request is in flight
    pub fn mic_enabled(&self) -> bool {
        self.state != SessionState::Listening
    }

    /// Start a new session; returns its id, or `None` if one is in flight
    pub fn activate(&mut self) -> Option<u64> {
        if self.state == SessionState::Listening {
            debug!(session_id = self.session_id, "mic activation ignored while listening");
            return None;
        }

        if let Some(token) = self.pending_reversion.take() {
            debug!("superseding pending reversion");
            token.cancel();
        }

        self.session_id += 1;
        self.transcript = Transcript::Pending;
        self.transition_to(SessionState::Listening);
        let _ = self.event_tx.send(AssistantEvent::SessionStarted {
            session_id: self.session_id,
        });

        Some(self.session_id)
    }

    /// Apply the result of the request for `session_id`
    ///
    /// Leaves Listening unconditionally and returns the reversion to schedule.
    pub fn settle(&mut self, session_id: u64, settlement: Settlement) -> Option<Reversion> {
        if session_id != self.session_id || self.state != SessionState::Listening {
            debug!(session_id, current = self.session_id, "ignoring stale settlement");
            return None;
        }

        let duration_ms = self.elapsed_ms();
        let (next, after, event) = match settlement {
            Settlement::Transcribed { question, answer } => {
                self.transcript = Transcript::Transcribed {
                    question: question.clone(),
                    answer,
                };
                (
                    SessionState::Success,
                    self.timings.success_display,
                    AssistantEvent::TranscriptionSucceeded {
                        session_id,
                        question,
                        duration_ms,
                    },
                )
            }
            Settlement::Failed { reason } => {
                self.transcript = Transcript::Failed {
                    message: CONNECTION_ERROR_MESSAGE.to_string(),
                };
                (
                    SessionState::Error,
                    self.timings.error_display,
                    AssistantEvent::TranscriptionFailed {
                        session_id,
                        reason,
                        duration_ms,
                    },
                )
            }
        };

        self.transition_to(next);
        let _ = self.event_tx.send(event);

        let token = CancellationToken::new();
        self.pending_reversion = Some(token.clone());
        Some(Reversion {
            session_id,
            after,
            token,
        })
    }

    /// Return to Idle after the display window of `session_id`
    pub fn revert(&mut self, session_id: u64) -> bool {
        let transient = matches!(self.state, SessionState::Success | SessionState::Error);
        if session_id != self.session_id || !transient {
            debug!(session_id, current = self.session_id, state = %self.state, "ignoring stale reversion");
            return false;
        }

        self.pending_reversion = None;
        self.transition_to(SessionState::Idle);
        let _ = self.event_tx.send(AssistantEvent::SessionReverted { session_id });
        true
    }

    fn elapsed_ms(&self) -> u64 {
        self.state_entered_at
            .map(|t| t.elapsed().as_millis() as u64)
            .unwrap_or(0)
    }

    fn transition_to(&mut self, new_state: SessionState) {
        let old_state = self.state;

        info!(
            from = %old_state,
            to = %new_state,
            session_id = self.session_id,
            duration_ms = self.elapsed_ms(),
            "session transition"
        );

        self.state = new_state;
        self.state_entered_at = if new_state != SessionState::Idle {
            Some(Instant::now())
        } else {
            None
        };
    }
}
