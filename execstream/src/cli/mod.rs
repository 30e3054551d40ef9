//! Command-line front end: argument parsing and the streaming runner.

mod args;
mod commands;

pub use args::Cli;
pub use commands::execute;
