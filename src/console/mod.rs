//! Console module for terminal input
//!
//! Parses typed line commands (`mic`, `mode`, `add`, `remove`, ...) and
//! forwards them to the controller.

mod commands;
mod listener;

pub use commands::{ConsoleInput, HELP};
pub use listener::ConsoleListener;
