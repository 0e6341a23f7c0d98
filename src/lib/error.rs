//! Error types for pc-buddy
//!
//! One error enum covers the whole privileged execution layer. Workflows
//! that turn failures into user-facing messages (system repair) do so on
//! top of these variants rather than inventing their own.

use std::fmt;

use thiserror::Error;

/// Why a subprocess run failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCause {
    /// The process exited with a non-zero code (None when killed by a signal)
    NonZeroExit(Option<i32>),
    /// The wall-clock timeout elapsed
    Timeout,
    /// stdout or stderr grew past the configured ceiling
    OutputLimit,
    /// The user declined (or the OS refused) the elevation request
    ElevationDenied,
    /// The process could not be started or its pipes failed
    Io,
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureCause::NonZeroExit(Some(code)) => write!(f, "exit code {}", code),
            FailureCause::NonZeroExit(None) => write!(f, "terminated by signal"),
            FailureCause::Timeout => write!(f, "timeout"),
            FailureCause::OutputLimit => write!(f, "output limit exceeded"),
            FailureCause::ElevationDenied => write!(f, "elevation denied"),
            FailureCause::Io => write!(f, "process I/O error"),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    /// Input to the sanitizer was not valid text
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A path matched a structural deny rule
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Command failed ({cause}): {message}")]
    ExecutionFailed { cause: FailureCause, message: String },

    #[error("Could not enumerate startup programs: {0}")]
    EnumerationFailed(String),

    #[error("Could not parse script output: {0}")]
    ParseFailed(String),

    #[error("Startup program not found: {0}")]
    NotFound(String),

    /// Another elevated command holds the admission gate
    #[error("Another privileged operation is already running: {0}")]
    Busy(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn execution(cause: FailureCause, message: impl Into<String>) -> Self {
        Error::ExecutionFailed {
            cause,
            message: message.into(),
        }
    }

    /// Failure cause when this is an execution failure
    pub fn failure_cause(&self) -> Option<FailureCause> {
        match self {
            Error::ExecutionFailed { cause, .. } => Some(*cause),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::ParseFailed(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
