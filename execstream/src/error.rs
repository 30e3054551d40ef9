//! Error types for process handling.

use std::process::ExitStatus;

use thiserror::Error;

/// Result type alias using the crate [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by [`Command`](crate::process::Command) operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The stream was already claimed by a pipe accessor or a channel.
    #[error("{stream} already claimed")]
    PipeClaimed { stream: &'static str },

    /// The operation is only valid before the process is started.
    #[error("process already started")]
    AlreadyStarted,

    /// The operation needs a running process.
    #[error("process not started")]
    NotStarted,

    /// `wait` was already called for this process.
    #[error("wait was already called")]
    AlreadyWaited,

    /// A capture operation was requested on a stream that is piped or relayed.
    #[error("cannot capture {stream}: stream is already piped or relayed")]
    CaptureConflict { stream: &'static str },

    /// The OS refused to create a pipe.
    #[error("failed to create pipe: {0}")]
    Pipe(#[source] std::io::Error),

    /// The OS failed to spawn the executable.
    #[error("failed to spawn process {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Waiting on the child failed at the OS level.
    #[error("failed to wait for process: {0}")]
    Wait(#[source] std::io::Error),

    /// The process exited unsuccessfully (non-zero code or signal).
    #[error("process exited unsuccessfully: {status}")]
    Exit {
        status: ExitStatus,
        /// Output captured before the failure: stderr for `output`, both
        /// streams for `combined_output`, empty otherwise.
        captured: Vec<u8>,
    },

    /// Other I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Exit code of the child when this is an [`Error::Exit`] with a code.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Exit { status, .. } => status.code(),
            _ => None,
        }
    }
}
