//! Process handles with line-streaming output.
//!
//! A [`Command`] streams its child's stdout and stderr, line by line, into
//! caller-supplied channels. The relays run on the blocking pool, one per
//! attached stream, and are wired before the child is spawned.

mod command;
mod handle;
mod must;
pub mod relay;
pub mod scanner;

pub use command::Command;
pub use handle::Process;
pub use must::{must, MustProcess};
