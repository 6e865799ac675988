//! Line framing over a persistent byte stream.
//!
//! One command per line out, one response per line back, both terminated by `\n`. A response
//! is complete only once the last byte received is the terminator, however many reads it
//! takes to get there.

use core::time::Duration;
use std::time::Instant;

use embedded_io::Error as _;

use crate::error::{Error, Result};

/// Line terminator used in both directions.
pub const TERMINATOR: u8 = b'\n';

/// Owns the connection to the instrument and frames everything that goes over it.
///
/// `L` bounds both the length of a command and of a response.
pub struct ScpiTransport<S: embedded_io::Read + embedded_io::Write, const L: usize = 128> {
    /// `None` while disconnected.
    stream: Option<S>,
    response_timeout: Duration,
}

impl<S: embedded_io::Read + embedded_io::Write, const L: usize> ScpiTransport<S, L> {
    /// Create a disconnected transport.
    ///
    /// A zero `response_timeout` fails every command before the first read.
    pub fn new(response_timeout: Duration) -> Self {
        Self {
            stream: None,
            response_timeout,
        }
    }

    /// Take ownership of an open stream. Any previous stream is dropped.
    pub fn attach(&mut self, stream: S) {
        self.stream = Some(stream);
    }

    /// Give up the stream, leaving the transport disconnected.
    pub fn detach(&mut self) -> Option<S> {
        self.stream.take()
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    #[cfg(test)]
    pub(crate) fn stream_mut(&mut self) -> Option<&mut S> {
        self.stream.as_mut()
    }

    /// Write a command line, without waiting for a reply.
    pub fn send_command_no_reply(&mut self, command: &str) -> Result<(), S::Error> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(Error::NotConnected);
        };

        let mut line: heapless::Vec<u8, L> = heapless::Vec::new();
        line.extend_from_slice(command.as_bytes())
            .map_err(|_| Error::<S::Error>::BufferOverflow)?;
        line.push(TERMINATOR).map_err(|_| Error::<S::Error>::BufferOverflow)?;

        log::debug!("> {command}");
        stream.write_all(&line).map_err(Error::Io)?;
        stream.flush().map_err(Error::Io)?;
        Ok(())
    }

    /// Write a command line and return its response line, trimmed.
    ///
    /// On a timeout, an end-of-stream or an oversized response the stream can no longer be
    /// trusted to be in step with our commands, so it is dropped and the transport is left
    /// disconnected.
    pub fn send_command(&mut self, command: &str) -> Result<heapless::String<L>, S::Error> {
        self.send_command_no_reply(command)?;

        let Some(stream) = self.stream.as_mut() else {
            return Err(Error::NotConnected);
        };
        let received = read_line::<S, L>(stream, self.response_timeout);
        let line = match received {
            Ok(line) => line,
            Err(err) => {
                if matches!(
                    err,
                    Error::Timeout(_) | Error::ConnectionClosed | Error::BufferOverflow
                ) {
                    log::warn!("No usable response to `{command}` ({err}), dropping connection");
                    self.stream = None;
                }
                return Err(err);
            }
        };

        let Ok(text) = core::str::from_utf8(&line) else {
            return Err(Error::protocol(format!(
                "Response to `{command}` is not valid UTF-8"
            )));
        };
        let text = text.trim();
        log::debug!("< {text}");

        let mut response = heapless::String::new();
        response
            .push_str(text)
            .map_err(|_| Error::<S::Error>::BufferOverflow)?;
        Ok(response)
    }
}

/// Accumulate reads until the buffer ends with the terminator or the deadline passes.
fn read_line<S: embedded_io::Read, const L: usize>(
    stream: &mut S,
    timeout: Duration,
) -> Result<heapless::Vec<u8, L>, S::Error> {
    let deadline = Instant::now() + timeout;
    let mut line: heapless::Vec<u8, L> = heapless::Vec::new();
    let mut chunk = [0u8; 32];

    loop {
        if Instant::now() >= deadline {
            return Err(Error::Timeout(timeout));
        }
        match stream.read(&mut chunk) {
            Ok(0) => return Err(Error::ConnectionClosed),
            Ok(bytes_read) => {
                line.extend_from_slice(&chunk[..bytes_read])
                    .map_err(|_| Error::<S::Error>::BufferOverflow)?;
                if line.last() == Some(&TERMINATOR) {
                    return Ok(line);
                }
            }
            Err(e) if matches!(e.kind(), embedded_io::ErrorKind::TimedOut) => {
                return Err(Error::Timeout(timeout));
            }
            Err(e) => return Err(Error::Io(e)),
        }
    }
}
