//! Panicking adapters over [`Process`].
//!
//! For top-level code and test harnesses that treat every process failure as
//! fatal. Library code should use the fallible methods instead.

use std::future::Future;
use std::io::{PipeReader, PipeWriter};
use std::process::ExitStatus;

use super::handle::Process;
use crate::error::Result;

/// Unwrap `result`, panicking with the error as the message.
///
/// # Panics
///
/// Panics if `result` is an error.
#[track_caller]
pub fn must<T>(result: Result<T>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => panic!("{e}"),
    }
}

/// `must_*` variants of every fallible [`Process`] operation.
///
/// Each method panics with the underlying error where the fallible version
/// would return it.
pub trait MustProcess: Process {
    /// # Panics
    ///
    /// Panics if the process cannot be started.
    fn must_start(&mut self) {
        must(self.start());
    }

    /// # Panics
    ///
    /// Panics if the process cannot be started or exits unsuccessfully.
    fn must_run(&mut self) -> impl Future<Output = ExitStatus> + Send {
        async move { must(self.run().await) }
    }

    /// # Panics
    ///
    /// Panics if waiting fails or the process exits unsuccessfully.
    fn must_wait(&mut self) -> impl Future<Output = ExitStatus> + Send {
        async move { must(self.wait().await) }
    }

    /// # Panics
    ///
    /// Panics if the output cannot be captured or the process fails.
    fn must_output(&mut self) -> impl Future<Output = Vec<u8>> + Send {
        async move { must(self.output().await) }
    }

    /// # Panics
    ///
    /// Panics if the output cannot be captured or the process fails.
    fn must_combined_output(&mut self) -> impl Future<Output = Vec<u8>> + Send {
        async move { must(self.combined_output().await) }
    }

    /// # Panics
    ///
    /// Panics if stdout is already claimed or the process has started.
    fn must_stdout_pipe(&mut self) -> PipeReader {
        must(self.stdout_pipe())
    }

    /// # Panics
    ///
    /// Panics if stderr is already claimed or the process has started.
    fn must_stderr_pipe(&mut self) -> PipeReader {
        must(self.stderr_pipe())
    }

    /// # Panics
    ///
    /// Panics if stdin is already claimed or the process has started.
    fn must_stdin_pipe(&mut self) -> PipeWriter {
        must(self.stdin_pipe())
    }
}

impl<P: Process> MustProcess for P {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::Command;

    fn sh(script: &str) -> Command {
        Command::new("sh", ["-c", script])
    }

    #[tokio::test]
    async fn test_must_combined_output() {
        let out = sh("echo hallo1; echo hallo3 1>&2")
            .must_combined_output()
            .await;
        assert_eq!(out, b"hallo1\nhallo3\n");
    }

    #[tokio::test]
    async fn test_must_start_and_wait() {
        let mut cmd = sh("exit 0");
        cmd.must_start();
        assert!(cmd.must_wait().await.success());
    }

    #[tokio::test]
    #[should_panic(expected = "failed to spawn process")]
    async fn test_must_start_panics_on_missing_binary() {
        Command::new("nonexistent_command_12345", ["x"]).must_start();
    }

    #[tokio::test]
    #[should_panic(expected = "exited unsuccessfully")]
    async fn test_must_run_panics_on_failure() {
        let _ = sh("exit 1").must_run().await;
    }

    #[tokio::test]
    #[should_panic(expected = "stdout already claimed")]
    async fn test_must_stdout_pipe_panics_when_claimed() {
        let mut cmd = sh("true");
        let _first = cmd.must_stdout_pipe();
        let _second = cmd.must_stdout_pipe();
    }

    #[tokio::test]
    #[should_panic(expected = "exited unsuccessfully")]
    async fn test_must_wait_panics_on_failure() {
        let mut cmd = sh("exit 3");
        cmd.must_start();
        let _ = cmd.must_wait().await;
    }

    #[tokio::test]
    #[should_panic(expected = "exited unsuccessfully")]
    async fn test_must_output_panics_on_failure() {
        let _ = sh("echo oops >&2; exit 1").must_output().await;
    }

    #[tokio::test]
    #[should_panic(expected = "cannot capture stdout")]
    async fn test_must_output_panics_on_capture_conflict() {
        let (tx, _rx) = tokio::sync::mpsc::channel(1);
        let _ = sh("echo x").stdout_channel(tx).must_output().await;
    }

    #[tokio::test]
    #[should_panic(expected = "exited unsuccessfully")]
    async fn test_must_combined_output_panics_on_failure() {
        let _ = sh("echo partial; exit 2").must_combined_output().await;
    }

    #[tokio::test]
    #[should_panic(expected = "cannot capture stderr")]
    async fn test_must_combined_output_panics_on_capture_conflict() {
        let mut cmd = sh("echo x");
        let _stderr = cmd.must_stderr_pipe();
        let _ = cmd.must_combined_output().await;
    }

    #[tokio::test]
    #[should_panic(expected = "stderr already claimed")]
    async fn test_must_stderr_pipe_panics_when_claimed() {
        let mut cmd = sh("true");
        let _first = cmd.must_stderr_pipe();
        let _second = cmd.must_stderr_pipe();
    }

    #[tokio::test]
    #[should_panic(expected = "stdin already claimed")]
    async fn test_must_stdin_pipe_panics_when_claimed() {
        let mut cmd = sh("true");
        let _first = cmd.must_stdin_pipe();
        let _second = cmd.must_stdin_pipe();
    }

    #[test]
    fn test_must_passes_value_through() {
        assert_eq!(must(Ok(7)), 7);
    }
}
