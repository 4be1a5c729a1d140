//! Managed interpreter processes.
//!
//! This module owns a long-lived interpreter subprocess (usually a shell)
//! and runs commands through it one at a time.
//!
//! # Architecture
//!
//! ```text
//! blockrun                                interpreter
//! ┌────────────────────┐                 ┌─────────────┐
//! │ ManagedInterpreter │──stdin (cmd)───▶│             │
//! │                    │◀─stdout + mark──│             │
//! │                    │◀─stderr + mark──│             │
//! └────────────────────┘                 └─────────────┘
//! ```
//!
//! # Framing Protocol
//!
//! Each command is written followed by two echo lines that print a fresh
//! random marker, once to stdout and once to stderr. Output is read from
//! both streams concurrently until each shows the marker. Stderr may lag
//! behind stdout by at most the configured grace period.

mod io;
mod spawn;

pub use io::{CommandWriter, Drained, MarkedReader};
pub use spawn::{InterpreterState, ManagedInterpreter};

/// Prefix of every completion marker.
pub const SENTINEL_PREFIX: &str = "__BLOCKRUN_EOC_";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn types_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ManagedInterpreter>();
        assert_send_sync::<InterpreterState>();
    }

    #[test]
    fn pipes_are_send() {
        fn assert_send<T: Send>() {}
        assert_send::<CommandWriter>();
        assert_send::<MarkedReader<tokio::process::ChildStdout>>();
    }

    #[test]
    fn prefix_is_shell_safe() {
        assert!(SENTINEL_PREFIX
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_'));
    }
}
