//! Capability surface of a process handle.

use std::future::Future;
use std::io::{PipeReader, PipeWriter};
use std::process::ExitStatus;

use crate::error::Result;

/// Start, wait and pipe operations over one OS process.
///
/// Pipe accessors and `start` are only valid before the process starts.
/// `output` and `combined_output` start the process themselves and cannot be
/// mixed with pipe- or channel-based streaming of the stream they capture.
pub trait Process: Send {
    /// Wire any attached channels, then spawn the process.
    ///
    /// # Errors
    ///
    /// [`Error::AlreadyStarted`](crate::Error::AlreadyStarted) on a second
    /// call, [`Error::PipeClaimed`](crate::Error::PipeClaimed) or
    /// [`Error::Pipe`](crate::Error::Pipe) if a channel's pipe cannot be
    /// acquired, [`Error::Spawn`](crate::Error::Spawn) if the OS cannot run
    /// the program.
    fn start(&mut self) -> Result<()>;

    /// Wait for the process to exit. Relay tasks are not joined.
    ///
    /// # Errors
    ///
    /// [`Error::NotStarted`](crate::Error::NotStarted) before a successful
    /// start, [`Error::AlreadyWaited`](crate::Error::AlreadyWaited) on a
    /// second call, [`Error::Wait`](crate::Error::Wait) if the OS wait fails,
    /// [`Error::Exit`](crate::Error::Exit) for a non-zero exit or a signal.
    fn wait(&mut self) -> impl Future<Output = Result<ExitStatus>> + Send;

    /// Start the process and capture its stdout.
    ///
    /// # Errors
    ///
    /// [`Error::CaptureConflict`](crate::Error::CaptureConflict) if a channel
    /// is attached or stdout is already claimed, otherwise any error of
    /// [`start`](Self::start) or [`wait`](Self::wait). On
    /// [`Error::Exit`](crate::Error::Exit) the captured stderr is attached.
    fn output(&mut self) -> impl Future<Output = Result<Vec<u8>>> + Send;

    /// Start the process and capture stdout and stderr through one pipe.
    ///
    /// # Errors
    ///
    /// [`Error::CaptureConflict`](crate::Error::CaptureConflict) if a channel
    /// is attached or either stream is already claimed, otherwise any error
    /// of [`start`](Self::start) or [`wait`](Self::wait). On
    /// [`Error::Exit`](crate::Error::Exit) the combined output is attached.
    fn combined_output(&mut self) -> impl Future<Output = Result<Vec<u8>>> + Send;

    /// Claim the read end of a pipe connected to the child's stdout.
    ///
    /// # Errors
    ///
    /// [`Error::AlreadyStarted`](crate::Error::AlreadyStarted) once the
    /// process has started, [`Error::PipeClaimed`](crate::Error::PipeClaimed)
    /// if stdout is already claimed, [`Error::Pipe`](crate::Error::Pipe) if
    /// the OS cannot create the pipe.
    fn stdout_pipe(&mut self) -> Result<PipeReader>;

    /// Claim the read end of a pipe connected to the child's stderr.
    ///
    /// # Errors
    ///
    /// As [`stdout_pipe`](Self::stdout_pipe), for stderr.
    fn stderr_pipe(&mut self) -> Result<PipeReader>;

    /// Claim the write end of a pipe connected to the child's stdin.
    ///
    /// # Errors
    ///
    /// As [`stdout_pipe`](Self::stdout_pipe), for stdin.
    fn stdin_pipe(&mut self) -> Result<PipeWriter>;

    /// Send a kill signal to the running process without waiting for it.
    ///
    /// # Errors
    ///
    /// [`Error::NotStarted`](crate::Error::NotStarted) unless the process is
    /// running, [`Error::Io`](crate::Error::Io) if the signal cannot be sent.
    fn kill(&mut self) -> Result<()>;

    /// OS process id while the process is running.
    fn id(&self) -> Option<u32>;

    /// Start the process and wait for it to exit.
    ///
    /// # Errors
    ///
    /// Any error of [`start`](Self::start) or [`wait`](Self::wait).
    fn run(&mut self) -> impl Future<Output = Result<ExitStatus>> + Send {
        async move {
            self.start()?;
            self.wait().await
        }
    }
}
