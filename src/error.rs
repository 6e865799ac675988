//! Our error types for the DP832 driver.

use core::time::Duration;

use thiserror::Error;

pub type Result<T, I> = core::result::Result<T, Error<I>>;

/// Custom error type for DP832 communications.
///
/// `I` is the error type of the underlying byte stream, so connection-level failures reach the
/// caller exactly as the stream reported them.
#[derive(Error, Debug)]
pub enum Error<I: embedded_io::Error> {
    /// Rejected locally, nothing was sent to the instrument.
    #[error("Invalid parameter: {0}")]
    Parameter(#[from] ParameterError),
    #[error("Device is not connected")]
    NotConnected,
    /// The reply was empty, malformed or came from an unexpected device.
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),
    /// The connection is dropped when this is returned, reconnect before the next command.
    #[error("No complete response within {0:?}")]
    Timeout(Duration),
    #[error("Device did not confirm `{command}` after {attempts} attempts")]
    DeviceUnresponsive { command: String, attempts: u32 },
    #[error("Connection closed by the instrument")]
    ConnectionClosed,
    #[error("Command or response does not fit the buffer")]
    BufferOverflow,
    #[error("Stream error: {0:?}")]
    Io(I),
}

/// Argument errors, detected before any I/O happens.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParameterError {
    #[error("Channel {channel} out of range, expected 1 to {channels}")]
    ChannelOutOfRange { channel: u8, channels: u8 },
    #[error("Voltage {value}V out of range [{min}, {max}] for channel {channel}")]
    VoltageOutOfRange {
        channel: u8,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("Current {value}A out of range [{min}, {max}] for channel {channel}")]
    CurrentOutOfRange {
        channel: u8,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("Port has to be in range from 1 to 65535, got {0}")]
    InvalidPort(u16),
    #[error("Instrument cannot {0}")]
    Unsupported(&'static str),
    #[error("{0} must be longer than zero")]
    ZeroTimeout(&'static str),
}

impl<I: embedded_io::Error> Error<I> {
    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        Error::ProtocolViolation(message.into())
    }
}
