//! We use this mocking module in unit tests to emulate the instrument's socket.

use std::collections::VecDeque;

/// Our mock type used to emulate a stream connection.
pub struct MockStream {
    /// Everything written to the mock stream.
    write_buffer: Vec<u8>,
    /// Pre-configured responses. Each chunk is delivered by its own read call(s), so a reply
    /// can be split across reads.
    read_chunks: VecDeque<Vec<u8>>,
    /// Report end-of-stream once the chunks run out, instead of timing out.
    closed: bool,
    /// Flag to simulate write errors
    should_error_on_write: bool,
    /// Flag to simulate read errors
    should_error_on_read: bool,
}

#[derive(Debug)]
pub enum MockStreamError {
    /// No data available, what a socket with a read timeout reports.
    Timeout,
    /// Generic simulated error for testing
    SimulatedError,
}

impl core::fmt::Display for MockStreamError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            MockStreamError::Timeout => write!(f, "simulated timeout"),
            MockStreamError::SimulatedError => write!(f, "simulated error"),
        }
    }
}

impl core::error::Error for MockStreamError {}

impl embedded_io::Error for MockStreamError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            MockStreamError::Timeout => embedded_io::ErrorKind::TimedOut,
            MockStreamError::SimulatedError => embedded_io::ErrorKind::ConnectionReset,
        }
    }
}

impl embedded_io::ErrorType for MockStream {
    type Error = MockStreamError;
}

impl embedded_io::Write for MockStream {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        if self.should_error_on_write {
            return Err(MockStreamError::SimulatedError);
        }
        self.write_buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        if self.should_error_on_write {
            return Err(MockStreamError::SimulatedError);
        }
        Ok(())
    }
}

impl embedded_io::Read for MockStream {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if self.should_error_on_read {
            return Err(MockStreamError::SimulatedError);
        }

        let Some(chunk) = self.read_chunks.front_mut() else {
            return if self.closed {
                Ok(0)
            } else {
                Err(MockStreamError::Timeout)
            };
        };

        let n = core::cmp::min(buf.len(), chunk.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        chunk.drain(..n);
        if chunk.is_empty() {
            self.read_chunks.pop_front();
        }
        Ok(n)
    }
}

impl MockStream {
    /// Create a new MockStream instance with empty buffers
    pub fn new() -> Self {
        Self {
            write_buffer: Vec::new(),
            read_chunks: VecDeque::new(),
            closed: false,
            should_error_on_write: false,
            should_error_on_read: false,
        }
    }

    /// Queue a full response line, the terminator is appended.
    pub fn push_line(&mut self, line: &str) {
        let mut data = line.as_bytes().to_vec();
        data.push(b'\n');
        self.read_chunks.push_back(data);
    }

    /// Queue raw bytes as one read chunk.
    pub fn push_chunk(&mut self, data: &[u8]) {
        self.read_chunks.push_back(data.to_vec());
    }

    /// Get a reference to the data that was written to this mock stream
    pub fn written_data(&self) -> &[u8] {
        &self.write_buffer
    }

    /// Written data split into command lines.
    pub fn written_lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.write_buffer)
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Clear the write buffer
    pub fn clear_written_data(&mut self) {
        self.write_buffer.clear();
    }

    /// Number of queued chunks not yet read.
    pub fn pending_chunks(&self) -> usize {
        self.read_chunks.len()
    }

    /// Report end-of-stream once the queued chunks are consumed.
    pub fn set_closed(&mut self, closed: bool) {
        self.closed = closed;
    }

    /// Configure whether write operations should fail with an error
    pub fn set_write_error(&mut self, should_error: bool) {
        self.should_error_on_write = should_error;
    }

    /// Configure whether read operations should fail with an error
    pub fn set_read_error(&mut self, should_error: bool) {
        self.should_error_on_read = should_error;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_io::{Error, Read, Write};

    #[test]
    fn test_written_lines() {
        let mut mock = MockStream::new();
        mock.write_all(b":OUTP CH1,ON\n:OUTP? CH1\n").unwrap();
        assert_eq!(mock.written_lines(), vec![":OUTP CH1,ON", ":OUTP? CH1"]);

        mock.clear_written_data();
        assert!(mock.written_data().is_empty());
    }

    #[test]
    fn test_chunks_are_read_separately() {
        let mut mock = MockStream::new();
        mock.push_chunk(b"1.2");
        mock.push_chunk(b"34\n");

        let mut buffer = [0u8; 16];
        assert_eq!(mock.read(&mut buffer).unwrap(), 3);
        assert_eq!(&buffer[..3], b"1.2");
        assert_eq!(mock.read(&mut buffer).unwrap(), 3);
        assert_eq!(&buffer[..3], b"34\n");
        assert_eq!(mock.pending_chunks(), 0);
    }

    #[test]
    fn test_small_buffer_splits_chunk() {
        let mut mock = MockStream::new();
        mock.push_line("Hello World");

        let mut buffer = [0u8; 5];
        assert_eq!(mock.read(&mut buffer).unwrap(), 5);
        assert_eq!(&buffer, b"Hello");
        assert_eq!(mock.pending_chunks(), 1);
    }

    #[test]
    fn test_drained_times_out_or_closes() {
        let mut mock = MockStream::new();
        let mut buffer = [0u8; 4];
        let err = mock.read(&mut buffer).unwrap_err();
        assert!(matches!(err.kind(), embedded_io::ErrorKind::TimedOut));

        mock.set_closed(true);
        assert_eq!(mock.read(&mut buffer).unwrap(), 0);
    }

    #[test]
    fn test_error_simulation() {
        let mut mock = MockStream::new();
        mock.set_write_error(true);
        assert!(mock.write(b"test").is_err());
        assert!(mock.flush().is_err());
        assert!(mock.written_data().is_empty());

        mock.push_line("data");
        mock.set_read_error(true);
        let mut buffer = [0u8; 8];
        assert!(matches!(
            mock.read(&mut buffer),
            Err(MockStreamError::SimulatedError)
        ));
    }
}
