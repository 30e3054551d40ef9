//! execstream - run a program and stream its output line by line.
//!
//! Thin CLI over the `execstream` library: stdout and stderr of the child
//! are relayed through channels, prefixed, and printed as they arrive.

mod cli;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use cli::{execute, Cli};
use execstream::logging::{init_tracing, DEFAULT_FILTER};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(DEFAULT_FILTER, cli.log_json);

    let code = execute(cli).await?;
    Ok(ExitCode::from(u8::try_from(code).unwrap_or(1)))
}
