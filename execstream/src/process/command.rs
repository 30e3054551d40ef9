//! Process handle with channel-based output streaming.
//!
//! A [`Command`] wraps one OS command. Before it starts, callers may attach
//! an output channel and an error channel; `start` then acquires the
//! matching pipes and spawns one relay per stream before the child runs, so
//! no output is produced without a reader already in place.

use std::ffi::OsStr;
use std::io::{PipeReader, PipeWriter, Read};
use std::path::Path;
use std::process::{ExitStatus, Stdio};

use tokio::process::{Child, Command as OsCommand};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::handle::Process;
use super::relay::{self, RelayConfig};
use super::scanner::MAX_TOKEN_SIZE;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdin,
    Stdout,
    Stderr,
}

impl Stream {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Stdin => "stdin",
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
        }
    }
}

#[derive(Debug)]
enum State {
    Idle(OsCommand),
    Running(Child),
    SpawnFailed,
    Finished,
}

#[derive(Debug, Default)]
struct Claims {
    stdin: bool,
    stdout: bool,
    stderr: bool,
}

impl Claims {
    fn get_mut(&mut self, stream: Stream) -> &mut bool {
        match stream {
            Stream::Stdin => &mut self.stdin,
            Stream::Stdout => &mut self.stdout,
            Stream::Stderr => &mut self.stderr,
        }
    }
}

/// Handle to an external process whose output can be streamed as lines.
///
/// # Example
///
/// ```rust,no_run
/// use execstream::process::{Command, Process};
/// use tokio::sync::mpsc;
///
/// #[tokio::main]
/// async fn main() -> execstream::Result<()> {
///     let (tx, mut rx) = mpsc::channel(100);
///     let mut cmd = Command::new("ls", ["-la"])
///         .output_prefix("[ls] ")
///         .stdout_channel(tx);
///
///     cmd.start()?;
///     while let Some(line) = rx.recv().await {
///         println!("{line}");
///     }
///     cmd.wait().await?;
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct Command {
    program: String,
    state: State,
    output_prefix: String,
    stdout_channel: Option<mpsc::Sender<String>>,
    stderr_channel: Option<mpsc::Sender<String>>,
    max_line_len: usize,
    claims: Claims,
    pipes_wired: bool,
    relays: Vec<JoinHandle<usize>>,
}

impl Command {
    /// Create a handle for `program` with the given arguments.
    ///
    /// Streams not claimed before start are connected to the null device.
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let program = program.into();
        let mut cmd = OsCommand::new(&program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        Self {
            program,
            state: State::Idle(cmd),
            output_prefix: String::new(),
            stdout_channel: None,
            stderr_channel: None,
            max_line_len: MAX_TOKEN_SIZE,
            claims: Claims::default(),
            pipes_wired: false,
            relays: Vec::new(),
        }
    }

    /// The program this handle runs.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Prefix prepended to every relayed line on both channels.
    #[must_use]
    pub fn output_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.output_prefix = prefix.into();
        self
    }

    /// Relay stdout lines into `tx`.
    #[must_use]
    pub fn stdout_channel(mut self, tx: mpsc::Sender<String>) -> Self {
        self.stdout_channel = Some(tx);
        self
    }

    /// Relay stderr lines into `tx`.
    #[must_use]
    pub fn stderr_channel(mut self, tx: mpsc::Sender<String>) -> Self {
        self.stderr_channel = Some(tx);
        self
    }

    /// Bytes a relayed line may occupy, counting its terminator. A longer
    /// line ends its relay.
    #[must_use]
    pub const fn max_line_len(mut self, len: usize) -> Self {
        self.max_line_len = len;
        self
    }

    /// Set the working directory.
    #[must_use]
    pub fn current_dir(self, dir: impl AsRef<Path>) -> Self {
        self.configure(|cmd| {
            cmd.current_dir(dir);
        })
    }

    /// Set an environment variable.
    #[must_use]
    pub fn env(self, key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) -> Self {
        self.configure(|cmd| {
            cmd.env(key, value);
        })
    }

    /// Set multiple environment variables.
    #[must_use]
    pub fn envs<I, K, V>(self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<OsStr>,
        V: AsRef<OsStr>,
    {
        self.configure(|cmd| {
            cmd.envs(vars);
        })
    }

    /// Remove an environment variable.
    #[must_use]
    pub fn env_remove(self, key: impl AsRef<OsStr>) -> Self {
        self.configure(|cmd| {
            cmd.env_remove(key);
        })
    }

    /// Clear the inherited environment.
    #[must_use]
    pub fn env_clear(self) -> Self {
        self.configure(|cmd| {
            cmd.env_clear();
        })
    }

    /// Wait for exit, then for every relay to finish delivering.
    ///
    /// Unlike [`Process::wait`], every line the child wrote has been handed
    /// to its channel when this returns. The caller must keep draining the
    /// channels concurrently or this never completes.
    ///
    /// # Errors
    ///
    /// Same as [`Process::wait`]. A failed relay task is logged, not returned.
    pub async fn wait_drained(&mut self) -> Result<ExitStatus> {
        let result = self.wait().await;
        for handle in std::mem::take(&mut self.relays) {
            if let Err(e) = handle.await {
                warn!(error = %e, "relay task failed");
            }
        }
        result
    }

    fn configure(mut self, f: impl FnOnce(&mut OsCommand)) -> Self {
        // Settings have no effect once the command has been spawned.
        if let State::Idle(cmd) = &mut self.state {
            f(cmd);
        }
        self
    }

    fn ensure_unclaimed(&self, stream: Stream) -> Result<()> {
        if !matches!(self.state, State::Idle(_)) {
            return Err(Error::AlreadyStarted);
        }
        let claimed = match stream {
            Stream::Stdin => self.claims.stdin,
            Stream::Stdout => self.claims.stdout,
            Stream::Stderr => self.claims.stderr,
        };
        if claimed {
            return Err(Error::PipeClaimed {
                stream: stream.as_str(),
            });
        }
        Ok(())
    }

    fn attach(&mut self, stream: Stream, stdio: Stdio) -> Result<()> {
        let State::Idle(cmd) = &mut self.state else {
            return Err(Error::AlreadyStarted);
        };
        match stream {
            Stream::Stdin => cmd.stdin(stdio),
            Stream::Stdout => cmd.stdout(stdio),
            Stream::Stderr => cmd.stderr(stdio),
        };
        *self.claims.get_mut(stream) = true;
        Ok(())
    }

    fn output_pipe(&mut self, stream: Stream) -> Result<PipeReader> {
        self.ensure_unclaimed(stream)?;
        let (reader, writer) = std::io::pipe().map_err(Error::Pipe)?;
        self.attach(stream, writer.into())?;
        Ok(reader)
    }

    /// Acquire pipes for every attached channel and start their relays.
    ///
    /// Runs at most once per handle. If any pipe cannot be acquired the
    /// handle is left unchanged: nothing is claimed and no relay is started.
    fn wire_relays(&mut self) -> Result<()> {
        self.wire_relays_with(std::io::pipe)
    }

    fn wire_relays_with(
        &mut self,
        mut make_pipe: impl FnMut() -> std::io::Result<(PipeReader, PipeWriter)>,
    ) -> Result<()> {
        if self.pipes_wired {
            return Ok(());
        }

        if self.stdout_channel.is_some() {
            self.ensure_unclaimed(Stream::Stdout)?;
        }
        if self.stderr_channel.is_some() {
            self.ensure_unclaimed(Stream::Stderr)?;
        }

        let stdout = if self.stdout_channel.is_some() {
            Some(make_pipe().map_err(Error::Pipe)?)
        } else {
            None
        };
        let stderr = if self.stderr_channel.is_some() {
            Some(make_pipe().map_err(Error::Pipe)?)
        } else {
            None
        };

        let config = RelayConfig {
            prefix: self.output_prefix.clone(),
            max_line_len: self.max_line_len,
        };
        let wired = [
            (Stream::Stdout, stdout, self.stdout_channel.take()),
            (Stream::Stderr, stderr, self.stderr_channel.take()),
        ];
        for (stream, pipe, tx) in wired {
            if let (Some((reader, writer)), Some(tx)) = (pipe, tx) {
                self.attach(stream, writer.into())?;
                self.relays
                    .push(relay::spawn_relay(stream.as_str(), reader, tx, config.clone()));
            }
        }

        self.pipes_wired = true;
        Ok(())
    }

    fn ensure_capturable(&self, streams: &[Stream]) -> Result<()> {
        if !matches!(self.state, State::Idle(_)) {
            return Err(Error::AlreadyStarted);
        }
        if self.stdout_channel.is_some() {
            return Err(Error::CaptureConflict { stream: "stdout" });
        }
        if self.stderr_channel.is_some() {
            return Err(Error::CaptureConflict { stream: "stderr" });
        }
        for &stream in streams {
            if self.ensure_unclaimed(stream).is_err() {
                return Err(Error::CaptureConflict {
                    stream: stream.as_str(),
                });
            }
        }
        Ok(())
    }
}

impl Process for Command {
    fn start(&mut self) -> Result<()> {
        if !matches!(self.state, State::Idle(_)) {
            return Err(Error::AlreadyStarted);
        }
        self.wire_relays()?;

        let mut cmd = match std::mem::replace(&mut self.state, State::SpawnFailed) {
            State::Idle(cmd) => cmd,
            other => {
                self.state = other;
                return Err(Error::AlreadyStarted);
            }
        };
        let spawned = cmd.spawn();
        // Dropping the command closes our copies of the child's pipe ends,
        // so relays see EOF once the child exits.
        drop(cmd);

        let child = spawned.map_err(|source| Error::Spawn {
            program: self.program.clone(),
            source,
        })?;
        debug!(program = %self.program, pid = ?child.id(), relays = self.relays.len(), "process started");
        self.state = State::Running(child);
        Ok(())
    }

    async fn wait(&mut self) -> Result<ExitStatus> {
        let child = match &mut self.state {
            State::Running(child) => child,
            State::Idle(_) | State::SpawnFailed => return Err(Error::NotStarted),
            State::Finished => return Err(Error::AlreadyWaited),
        };
        let status = child.wait().await.map_err(Error::Wait)?;
        self.state = State::Finished;
        debug!(program = %self.program, %status, "process exited");

        if status.success() {
            Ok(status)
        } else {
            Err(Error::Exit {
                status,
                captured: Vec::new(),
            })
        }
    }

    async fn output(&mut self) -> Result<Vec<u8>> {
        self.ensure_capturable(&[Stream::Stdout])?;
        let stdout = self.output_pipe(Stream::Stdout)?;
        let stderr = if self.claims.stderr {
            None
        } else {
            Some(self.output_pipe(Stream::Stderr)?)
        };

        self.start()?;
        let stdout = read_to_end(stdout);
        let stderr = stderr.map(read_to_end);
        let status = self.wait().await;

        let stdout = join_bytes(stdout).await?;
        let stderr = match stderr {
            Some(handle) => join_bytes(handle).await?,
            None => Vec::new(),
        };
        match status {
            Ok(_) => Ok(stdout),
            Err(Error::Exit { status, .. }) => Err(Error::Exit {
                status,
                captured: stderr,
            }),
            Err(e) => Err(e),
        }
    }

    async fn combined_output(&mut self) -> Result<Vec<u8>> {
        self.ensure_capturable(&[Stream::Stdout, Stream::Stderr])?;
        let (reader, writer) = std::io::pipe().map_err(Error::Pipe)?;
        let writer_err = writer.try_clone().map_err(Error::Pipe)?;
        self.attach(Stream::Stdout, writer.into())?;
        self.attach(Stream::Stderr, writer_err.into())?;

        self.start()?;
        let combined = read_to_end(reader);
        let status = self.wait().await;

        let combined = join_bytes(combined).await?;
        match status {
            Ok(_) => Ok(combined),
            Err(Error::Exit { status, .. }) => Err(Error::Exit {
                status,
                captured: combined,
            }),
            Err(e) => Err(e),
        }
    }

    fn stdout_pipe(&mut self) -> Result<PipeReader> {
        self.output_pipe(Stream::Stdout)
    }

    fn stderr_pipe(&mut self) -> Result<PipeReader> {
        self.output_pipe(Stream::Stderr)
    }

    fn stdin_pipe(&mut self) -> Result<PipeWriter> {
        self.ensure_unclaimed(Stream::Stdin)?;
        let (reader, writer) = std::io::pipe().map_err(Error::Pipe)?;
        self.attach(Stream::Stdin, reader.into())?;
        Ok(writer)
    }

    fn kill(&mut self) -> Result<()> {
        match &mut self.state {
            State::Running(child) => child.start_kill().map_err(Error::Io),
            _ => Err(Error::NotStarted),
        }
    }

    fn id(&self) -> Option<u32> {
        match &self.state {
            State::Running(child) => child.id(),
            _ => None,
        }
    }
}

fn read_to_end(mut reader: PipeReader) -> JoinHandle<std::io::Result<Vec<u8>>> {
    tokio::task::spawn_blocking(move || {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Ok(buf)
    })
}

async fn join_bytes(handle: JoinHandle<std::io::Result<Vec<u8>>>) -> Result<Vec<u8>> {
    let bytes = handle.await.map_err(std::io::Error::other)??;
    Ok(bytes)
}
