//! IPC module for the host binding
//!
//! An external presentation layer drives the assistant over a Unix socket
//! and receives rendered views.

mod protocol;
mod server;

pub use protocol::{AssistantStatus, Push, Request, Response};
pub use server::Server;
