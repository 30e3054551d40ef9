//! Run external processes and stream their output as lines over channels.
//!
//! See [`process::Command`] for the entry point.

pub mod error;
pub mod logging;
pub mod process;

pub use error::{Error, Result};
