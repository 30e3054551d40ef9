//! CLI command execution.

use std::io::{self, Write};
use std::process::ExitStatus;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tracing::{debug, info};

use execstream::process::{Command, Process};
use execstream::Error;

use super::args::Cli;

/// A relayed line and the stream it came from.
enum Line {
    Stdout(String),
    Stderr(String),
}

/// Run the program described by `cli` and return the exit code to use.
///
/// # Errors
///
/// Fails if the program cannot be started or waited on, or if writing its
/// output fails for a reason other than the reader going away.
pub async fn execute(cli: Cli) -> Result<i32> {
    let mut cmd = Command::new(&cli.program, &cli.args)
        .output_prefix(&cli.prefix)
        .max_line_len(cli.max_line_len)
        .envs(cli.env.iter().map(|(k, v)| (k, v)));
    if let Some(ref dir) = cli.dir {
        cmd = cmd.current_dir(dir);
    }

    if cli.combined {
        run_combined(cmd).await
    } else {
        run_streaming(cmd, cli.buffer.get()).await
    }
}

async fn run_streaming(cmd: Command, buffer: usize) -> Result<i32> {
    let (out_tx, out_rx) = mpsc::channel(buffer);
    let (err_tx, err_rx) = mpsc::channel(buffer);
    let mut cmd = cmd.stdout_channel(out_tx).stderr_channel(err_tx);

    cmd.start()
        .with_context(|| format!("Failed to start {}", cmd.program()))?;
    info!(program = cmd.program(), pid = ?cmd.id(), "streaming output");

    // Ends once both relays have dropped their senders.
    let mut lines = ReceiverStream::new(out_rx)
        .map(Line::Stdout)
        .merge(ReceiverStream::new(err_rx).map(Line::Stderr));
    while let Some(line) = lines.next().await {
        let open = match line {
            Line::Stdout(line) => still_open(writeln!(io::stdout().lock(), "{line}"))?,
            Line::Stderr(line) => still_open(writeln!(io::stderr().lock(), "{line}"))?,
        };
        if !open {
            debug!("output closed by reader, stopping relays");
            break;
        }
    }
    // Dropping the receivers stops any relay that is still running.
    drop(lines);

    exit_code(cmd.wait().await)
}

async fn run_combined(mut cmd: Command) -> Result<i32> {
    let result = cmd.combined_output().await;
    let mut stdout = io::stdout().lock();
    match result {
        Ok(bytes) => {
            still_open(stdout.write_all(&bytes))?;
            Ok(0)
        }
        Err(Error::Exit { status, captured }) => {
            still_open(stdout.write_all(&captured))?;
            Ok(status_code(status))
        }
        Err(e) => Err(e).with_context(|| format!("Failed to run {}", cmd.program())),
    }
}

/// `Ok(false)` when the write failed because the reader closed its end.
fn still_open(result: io::Result<()>) -> io::Result<bool> {
    match result {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(false),
        Err(e) => Err(e),
    }
}

fn exit_code(result: execstream::Result<ExitStatus>) -> Result<i32> {
    match result {
        Ok(status) => Ok(status_code(status)),
        Err(Error::Exit { status, .. }) => Ok(status_code(status)),
        Err(e) => Err(e).context("Failed to wait for process"),
    }
}

/// Shell-style exit code: the child's code, or 128 + signal on Unix.
fn status_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}
