//! Driver tuning: timing, retry bounds and the capability descriptor.

use fugit::MillisDurationU32;

use crate::{capabilities::Capabilities, error::ParameterError};

/// TCP port of the DP832's raw SCPI socket.
pub const DEFAULT_PORT: u16 = 5555;

/// Settings for a [`Dp832`](crate::psu::Dp832).
///
/// Start from [`Dp832Config::default`] and adjust with the `with_*` methods.
#[derive(Debug, Clone, PartialEq)]
pub struct Dp832Config {
    /// Bounds used to validate channel indices and setpoints.
    pub capabilities: Capabilities,
    /// Settle time after a mutating command, before its confirmation query. Also the pause
    /// between retries.
    pub command_delay: MillisDurationU32,
    /// How many times a mutating command is re-issued after the first failed confirmation.
    pub readback_retries: u32,
    /// Total time budget for one set-and-confirm cycle.
    pub readback_deadline: MillisDurationU32,
    /// Longest wait for one complete response line.
    ///
    /// Over TCP this is also the socket read timeout, and a read already blocked when the
    /// deadline passes is allowed to finish. A reply trickling in byte by byte can therefore
    /// take up to twice this long to time out.
    pub response_timeout: MillisDurationU32,
    /// Longest wait for the TCP connection to be established.
    pub connect_timeout: MillisDurationU32,
}

impl Default for Dp832Config {
    fn default() -> Self {
        Dp832Config {
            capabilities: Capabilities::DP832,
            command_delay: MillisDurationU32::millis(100),
            readback_retries: 3,
            readback_deadline: MillisDurationU32::secs(10),
            response_timeout: MillisDurationU32::secs(3),
            connect_timeout: MillisDurationU32::secs(3),
        }
    }
}

impl Dp832Config {
    /// Use a different capability descriptor.
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Set the settle delay. Zero disables it.
    pub fn with_command_delay(mut self, delay: MillisDurationU32) -> Self {
        self.command_delay = delay;
        self
    }

    /// Set the number of re-issues after a failed confirmation.
    pub fn with_readback_retries(mut self, retries: u32) -> Self {
        self.readback_retries = retries;
        self
    }

    pub fn with_readback_deadline(mut self, deadline: MillisDurationU32) -> Self {
        self.readback_deadline = deadline;
        self
    }

    /// Set the response timeout. Has to be non-zero, see [`Dp832Config::validate`].
    pub fn with_response_timeout(mut self, timeout: MillisDurationU32) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Set the connect timeout. Has to be non-zero, see [`Dp832Config::validate`].
    pub fn with_connect_timeout(mut self, timeout: MillisDurationU32) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Reject settings no connection can work with.
    ///
    /// A zero timeout would fail every read before it starts, and sockets refuse it outright.
    /// Checked whenever a connection is made.
    pub fn validate(&self) -> Result<(), ParameterError> {
        if self.response_timeout.to_millis() == 0 {
            return Err(ParameterError::ZeroTimeout("response timeout"));
        }
        if self.connect_timeout.to_millis() == 0 {
            return Err(ParameterError::ZeroTimeout("connect timeout"));
        }
        Ok(())
    }
}

pub(crate) fn to_std(duration: MillisDurationU32) -> core::time::Duration {
    core::time::Duration::from_millis(duration.to_millis() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_instrument_behaviour() {
        let config = Dp832Config::default();
        assert_eq!(config.command_delay.to_millis(), 100);
        assert_eq!(config.readback_retries, 3);
        assert_eq!(config.capabilities, Capabilities::DP832);
    }

    #[test]
    fn builder_overrides() {
        let config = Dp832Config::default()
            .with_command_delay(MillisDurationU32::millis(0))
            .with_readback_retries(7)
            .with_response_timeout(MillisDurationU32::millis(250));
        assert_eq!(config.command_delay.to_millis(), 0);
        assert_eq!(config.readback_retries, 7);
        assert_eq!(to_std(config.response_timeout).as_millis(), 250);
    }

    #[test]
    fn zero_timeouts_rejected() {
        assert_eq!(Dp832Config::default().validate(), Ok(()));
        // A zero settle delay or deadline is fine.
        let config = Dp832Config::default()
            .with_command_delay(MillisDurationU32::millis(0))
            .with_readback_deadline(MillisDurationU32::millis(0));
        assert_eq!(config.validate(), Ok(()));

        assert_eq!(
            Dp832Config::default()
                .with_response_timeout(MillisDurationU32::millis(0))
                .validate(),
            Err(ParameterError::ZeroTimeout("response timeout"))
        );
        assert_eq!(
            Dp832Config::default()
                .with_connect_timeout(MillisDurationU32::millis(0))
                .validate(),
            Err(ParameterError::ZeroTimeout("connect timeout"))
        );
    }
}
