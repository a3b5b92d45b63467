//! Line-oriented text adapter over a byte stream.
//!
//! Wraps anything implementing `Read + Write` (a `Box<dyn serialport::SerialPort>`
//! is the usual case) and exchanges terminator-delimited text lines.
use super::Transport;
use crate::config::TransportConfig;
use crate::error::TransportError;
use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, Instant};
use tracing::trace;

/// Line-oriented adapter for RS-232 / GPIB-style text protocols.
pub struct StreamAdapter<S> {
    stream: S,

    /// Appended to every outgoing command (e.g. "\r\n")
    write_terminator: String,

    /// Marks the end of a reply (e.g. "\r\n")
    read_terminator: String,

    /// Maximum time to wait for a complete reply
    timeout: Duration,

    /// Bytes read past the end of the last reply
    pending: Vec<u8>,
}

impl<S: Read + Write + Send> StreamAdapter<S> {
    /// Create an adapter with `"\r\n"` terminators and a 3 s reply timeout.
    pub fn new(stream: S) -> Self {
        Self::from_config(stream, &TransportConfig::default())
    }

    /// Apply terminators and timeout from a [`TransportConfig`].
    pub fn from_config(stream: S, config: &TransportConfig) -> Self {
        Self {
            stream,
            write_terminator: config.write_terminator.clone(),
            read_terminator: config.read_terminator.clone(),
            timeout: config.timeout,
            pending: Vec::new(),
        }
    }

    /// Override the reply deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the outgoing and reply terminators.
    pub fn with_terminators(mut self, write: impl Into<String>, read: impl Into<String>) -> Self {
        self.write_terminator = write.into();
        self.read_terminator = read.into();
        self
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    /// Unwrap the underlying stream.
    pub fn into_inner(self) -> S {
        self.stream
    }

    fn write_line(&mut self, command: &str) -> Result<(), TransportError> {
        trace!(command = %command.escape_default(), "write");
        let line = format!("{}{}", command, self.write_terminator);
        self.stream.write_all(line.as_bytes())?;
        self.stream.flush()?;
        Ok(())
    }

    /// Read one reply. A failed read discards whatever partial reply was
    /// buffered so it cannot prefix the answer to the next command.
    fn read_line(&mut self, command: &str) -> Result<String, TransportError> {
        let reply = self.take_line(command);
        if reply.is_err() {
            self.pending.clear();
        }
        reply
    }

    fn take_line(&mut self, command: &str) -> Result<String, TransportError> {
        let terminator = self.read_terminator.as_bytes().to_vec();
        let start = Instant::now();
        let mut chunk = [0u8; 256];

        let end = loop {
            if let Some(pos) = find(&self.pending, &terminator) {
                break pos;
            }
            if start.elapsed() >= self.timeout {
                return Err(TransportError::Timeout {
                    command: command.to_string(),
                    waited_ms: start.elapsed().as_millis(),
                });
            }
            match self.stream.read(&mut chunk) {
                Ok(0) => {
                    return Err(TransportError::Closed {
                        command: command.to_string(),
                    })
                }
                Ok(n) => self.pending.extend_from_slice(&chunk[..n]),
                // Port-level read timeouts just mean "nothing yet"; the
                // reply deadline above is what bounds the wait.
                Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                    std::thread::sleep(Duration::from_millis(1));
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        };

        let mut line: Vec<u8> = self.pending.drain(..end + terminator.len()).collect();
        line.truncate(end);
        let reply = String::from_utf8(line).map_err(|_| TransportError::Encoding {
            command: command.to_string(),
        })?;
        trace!(command = %command, reply = %reply.escape_default(), "read");
        Ok(reply)
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

impl<S: Read + Write + Send> Transport for StreamAdapter<S> {
    fn send(&mut self, command: &str) -> Result<(), TransportError> {
        self.write_line(command)
    }

    fn query(&mut self, command: &str) -> Result<String, TransportError> {
        self.write_line(command)?;
        self.read_line(command)
    }
}
