use crate::output::ExecOutput;

/// Errors that can occur when driving a managed interpreter.
///
/// Errors are organized by category:
/// - Configuration errors: detected before any process is spawned
/// - Lifecycle errors: an operation issued in the wrong interpreter state
/// - IO errors: communication failures with the subprocess
/// - Shutdown errors: failures while reaping the subprocess
///
/// The line scanner never produces these; it reports through its channel.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    // -------------------------------------------------------------------------
    // Configuration errors
    // -------------------------------------------------------------------------
    /// Invalid argument or configuration, e.g. an empty interpreter path.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    // -------------------------------------------------------------------------
    // Lifecycle errors
    // -------------------------------------------------------------------------
    /// Failed to spawn the interpreter process or wire its pipes.
    #[error("failed to start interpreter {program}: {source}")]
    StartFailure {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// `start` was called on an interpreter that is already running.
    #[error("interpreter already started")]
    AlreadyStarted,

    /// `start` was called on an interpreter that has been stopped.
    ///
    /// A stopped interpreter cannot be restarted; create a new one.
    #[error("interpreter has been stopped and cannot be restarted")]
    Stopped,

    /// A command was issued before `start` or after `stop`.
    #[error("interpreter process not started")]
    NotStarted,

    // -------------------------------------------------------------------------
    // IO errors
    // -------------------------------------------------------------------------
    /// Writing a command to the interpreter's stdin failed.
    #[error("failed to write command to interpreter stdin: {0}")]
    WriteFailure(#[source] std::io::Error),

    /// Stdout ended or failed before the command's completion marker showed up.
    ///
    /// Whatever was collected before the failure is kept in `output`.
    #[error("command output truncated: {source}")]
    Truncated {
        output: ExecOutput,
        #[source]
        source: std::io::Error,
    },

    /// The interpreter was stopped while the command was in flight.
    #[error("command interrupted by interpreter shutdown")]
    Interrupted,

    // -------------------------------------------------------------------------
    // Shutdown errors
    // -------------------------------------------------------------------------
    /// Waiting for the killed interpreter to exit failed.
    #[error("failed to wait for interpreter to exit: {0}")]
    ShutdownFailure(#[source] std::io::Error),
}

/// A specialized Result type for interpreter operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Output collected before a [`Truncated`](Error::Truncated) failure.
    pub fn partial_output(&self) -> Option<&ExecOutput> {
        match self {
            Error::Truncated { output, .. } => Some(output),
            _ => None,
        }
    }

    /// Check if this error comes from calling an operation in the wrong state.
    pub fn is_lifecycle_error(&self) -> bool {
        matches!(
            self,
            Error::AlreadyStarted | Error::Stopped | Error::NotStarted | Error::Interrupted
        )
    }
}
