//! Newline-delimited tokenizer for process output.
//!
//! Splits a byte stream on `\n`, strips one trailing `\r` from each line and
//! emits a final unterminated line at end of input. A read error ends the
//! scan and discards whatever partial line was buffered.

use std::io::{self, BufRead, BufReader, Read};

/// Default buffer bound for a single line and its terminator, in bytes.
pub const MAX_TOKEN_SIZE: usize = 64 * 1024;

/// Reads newline-delimited lines from a byte stream.
#[derive(Debug)]
pub struct LineScanner<R> {
    reader: BufReader<R>,
    buf: Vec<u8>,
    max_len: usize,
    done: bool,
}

impl<R: Read> LineScanner<R> {
    /// Create a scanner with the default maximum line length.
    pub fn new(source: R) -> Self {
        Self::with_max_len(source, MAX_TOKEN_SIZE)
    }

    /// Create a scanner whose lines, counting `\r` and the `\n` terminator,
    /// must fit in `max_len` bytes.
    pub fn with_max_len(source: R, max_len: usize) -> Self {
        Self {
            reader: BufReader::new(source),
            buf: Vec::new(),
            max_len,
            done: false,
        }
    }

    /// Read the next line.
    ///
    /// Returns `Ok(None)` at end of input. After an error every further call
    /// returns `Ok(None)`.
    pub fn next_line(&mut self) -> io::Result<Option<String>> {
        if self.done {
            return Ok(None);
        }
        self.buf.clear();

        loop {
            let available = match self.reader.fill_buf() {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.done = true;
                    return Err(e);
                }
            };

            if available.is_empty() {
                self.done = true;
                if self.buf.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(self.take_line()));
            }

            if let Some(pos) = available.iter().position(|&b| b == b'\n') {
                self.buf.extend_from_slice(&available[..pos]);
                self.reader.consume(pos + 1);
                self.check_len()?;
                return Ok(Some(self.take_line()));
            }

            let consumed = available.len();
            self.buf.extend_from_slice(available);
            self.reader.consume(consumed);
            self.check_len()?;
        }
    }

    // The buffered bytes plus the pending `\n` must fit in `max_len`.
    fn check_len(&mut self) -> io::Result<()> {
        if self.buf.len() >= self.max_len {
            self.done = true;
            self.buf.clear();
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("line exceeds {} bytes", self.max_len),
            ));
        }
        Ok(())
    }

    fn take_line(&mut self) -> String {
        if self.buf.last() == Some(&b'\r') {
            self.buf.pop();
        }
        let bytes = std::mem::take(&mut self.buf);
        String::from_utf8(bytes)
            .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
    }
}
