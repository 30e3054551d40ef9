//! Line relays.
//!
//! A relay owns one readable stream and one channel sender. It scans the
//! stream line by line and sends `prefix + line` for each line, in source
//! order, until end of input or a read error. Read errors end the relay
//! without being reported to the channel.

use std::io::Read;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::scanner::LineScanner;

/// Settings shared by every relay of one process.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Prepended to every delivered line.
    pub prefix: String,
    /// Longest line the scanner accepts, in bytes.
    pub max_line_len: usize,
}

/// Spawn a relay on the blocking pool.
///
/// The returned handle resolves to the number of lines delivered once the
/// stream is exhausted.
pub fn spawn_relay<R>(
    stream: &'static str,
    source: R,
    tx: mpsc::Sender<String>,
    config: RelayConfig,
) -> JoinHandle<usize>
where
    R: Read + Send + 'static,
{
    debug!(stream, "starting relay");
    tokio::task::spawn_blocking(move || relay_lines(stream, source, &tx, &config))
}

/// Relay lines from `source` into `tx` on the current thread.
///
/// Must not be called from within an async context since delivery uses
/// [`mpsc::Sender::blocking_send`].
pub fn relay_lines<R: Read>(
    stream: &'static str,
    source: R,
    tx: &mpsc::Sender<String>,
    config: &RelayConfig,
) -> usize {
    let mut scanner = LineScanner::with_max_len(source, config.max_line_len);
    let mut delivered = 0;

    loop {
        match scanner.next_line() {
            Ok(Some(line)) => {
                let mut message = String::with_capacity(config.prefix.len() + line.len());
                message.push_str(&config.prefix);
                message.push_str(&line);
                if tx.blocking_send(message).is_err() {
                    warn!(stream, delivered, "receiver dropped, stopping relay");
                    break;
                }
                delivered += 1;
            }
            Ok(None) => break,
            Err(e) => {
                debug!(stream, error = %e, "read failed, stopping relay");
                break;
            }
        }
    }

    debug!(stream, delivered, "relay finished");
    delivered
}
