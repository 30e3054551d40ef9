//! CLI argument definitions.

use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::Parser;

use execstream::process::scanner::MAX_TOKEN_SIZE;

/// Run a program and stream its stdout/stderr line by line
#[derive(Parser, Debug)]
#[command(name = "execstream")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "Use `--` before the program when its arguments start with `-`.")]
pub struct Cli {
    /// Prefix prepended to every relayed line
    #[arg(short, long, default_value = "")]
    pub prefix: String,

    /// Capacity of the stdout and stderr channels
    #[arg(short, long, default_value = "1000")]
    pub buffer: NonZeroUsize,

    /// Bytes a line may occupy, terminator included, before its stream is abandoned
    #[arg(long, default_value_t = MAX_TOKEN_SIZE)]
    pub max_line_len: usize,

    /// Working directory for the program
    #[arg(short, long)]
    pub dir: Option<PathBuf>,

    /// Environment variable for the program as KEY=VALUE (repeatable)
    #[arg(short, long = "env", value_name = "KEY=VALUE", value_parser = parse_env_pair)]
    pub env: Vec<(String, String)>,

    /// Capture stdout and stderr together and print them once the program exits
    #[arg(long, conflicts_with = "prefix")]
    pub combined: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long)]
    pub log_json: bool,

    /// Program to run
    pub program: String,

    /// Arguments passed to the program
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

fn parse_env_pair(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{s}'")),
    }
}
