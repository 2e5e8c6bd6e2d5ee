//! Session state machine for mic activations
//!
//! Provides an explicit state machine with four states:
//! - Idle: Default state, mic ready
//! - Listening: One transcription request in flight, mic inert
//! - Success: Transcript shown, reverts to Idle after a short window
//! - Error: Connection failure shown, reverts to Idle after a short window

mod machine;

pub use machine::{
    Reversion, SessionMachine, SessionState, Settlement, Transcript, CONNECTION_ERROR_MESSAGE,
};
