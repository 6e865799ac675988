use core::fmt::{self, Write as _};
use core::str::FromStr;
use std::time::Instant;

use crate::{
    config::{Dp832Config, to_std},
    error::{Error, ParameterError, Result},
    identity::Identity,
    lan::{IoError, TcpPort},
    transport::ScpiTransport,
    types::{LimitMode, Measurement, State},
};

/// A DP832 reached over its LAN SCPI socket.
pub type Dp832Lan = Dp832<TcpPort>;

/// You can drive a Dp832 over any stream which implements [embedded_io::Read] & [embedded_io::Write].
///
/// For its methods, "set" writes a setting and confirms it by reading it back, "get" queries the
/// instrument. Nothing is cached, apart from the identity captured when connecting.
///
/// Every method takes `&mut self`, so one validate-act-confirm cycle can never interleave with
/// another on the same connection. Share an instrument between threads by putting it in a
/// `Mutex`.
pub struct Dp832<S: embedded_io::Read + embedded_io::Write, const L: usize = 128> {
    transport: ScpiTransport<S, L>,
    config: Dp832Config,
    identity: Option<Identity>,
}

impl<S: embedded_io::Read + embedded_io::Write, const L: usize> Dp832<S, L> {
    /// Create a disconnected instance.
    pub fn new(config: Dp832Config) -> Self {
        Self {
            transport: ScpiTransport::new(to_std(config.response_timeout)),
            config,
            identity: None,
        }
    }

    pub fn config(&self) -> &Dp832Config {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Identity captured by the handshake of the current connection.
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref().filter(|_| self.is_connected())
    }

    /// Take over an open stream and identify the instrument on the other end.
    ///
    /// Anything but a Rigol DP832 with a well-formed firmware version is refused with
    /// [`Error::ProtocolViolation`], and the stream is dropped. So is the stream when the
    /// configuration does not pass [`Dp832Config::validate`]. Does nothing if already connected.
    pub fn attach(&mut self, stream: S) -> Result<(), S::Error> {
        if self.is_connected() {
            log::debug!("Device already connected");
            return Ok(());
        }
        self.config.validate()?;
        self.transport.attach(stream);
        if let Err(err) = self.handshake() {
            self.disconnect();
            return Err(err);
        }
        Ok(())
    }

    fn handshake(&mut self) -> Result<(), S::Error> {
        log::debug!("Requesting identity");
        let response = self.transport.send_command("*IDN?")?;
        log::debug!("ID: {response}");

        let identity = Identity::parse_expected(&response)
            .map_err(|e| Error::<S::Error>::protocol(e.to_string()))?;
        log::info!("Device {} ready", identity.serial);
        self.identity = Some(identity);
        Ok(())
    }

    /// Close the connection. Does nothing if already disconnected.
    pub fn disconnect(&mut self) {
        if let Some(stream) = self.transport.detach() {
            log::debug!("Disconnecting");
            drop(stream);
        }
        self.identity = None;
    }

    /// Return the raw `*IDN?` reply.
    pub fn get_identity_raw(&mut self) -> Result<heapless::String<L>, S::Error> {
        let response = self.transport.send_command("*IDN?")?;
        if response.is_empty() {
            return Err(Error::protocol("Device did not respond to identification command"));
        }
        Ok(response)
    }

    /// Query and parse the identity, without checking who made the device.
    pub fn get_identity(&mut self) -> Result<Identity, S::Error> {
        let response = self.get_identity_raw()?;
        Identity::parse(&response).map_err(|e| Error::protocol(e.to_string()))
    }

    /// Enable/disable a channel's output, and confirm the instrument did so.
    pub fn set_channel_enable(
        &mut self,
        channel: u8,
        state: impl Into<State>,
    ) -> Result<(), S::Error> {
        self.config.capabilities.channel(channel)?;
        self.require(self.config.capabilities.can_switch_output, "switch outputs")?;
        let state = state.into();

        let command = Self::command(format_args!(":OUTP CH{channel},{}", state.as_scpi()))?;
        let query = Self::command(format_args!(":OUTP? CH{channel}"))?;
        self.set_and_confirm("output state", state.as_scpi(), &command, &query, |response| {
            Ok(response == state.as_scpi())
        })
    }

    /// Set a channel's voltage setpoint in volts, and confirm it by reading it back.
    pub fn set_voltage(&mut self, channel: u8, voltage: f64) -> Result<(), S::Error> {
        self.config.capabilities.check_voltage(channel, voltage)?;
        self.require(self.config.capabilities.can_limit_voltage, "set voltage")?;

        let caps = self.config.capabilities;
        // Range checked, so `abs` only strips the sign of -0.0.
        let command = Self::command(format_args!(
            ":SOUR{channel}:VOLT {:.*}",
            caps.decimals(),
            voltage.abs()
        ))?;
        let query = Self::command(format_args!(":SOUR{channel}:VOLT?"))?;
        self.set_and_confirm("voltage", voltage, &command, &query, |response| {
            Ok(caps.confirms(voltage, parse_decimal::<S::Error>(response, "voltage")?))
        })
    }

    /// Set a channel's current limit in amps, and confirm it by reading it back.
    pub fn set_current(&mut self, channel: u8, current: f64) -> Result<(), S::Error> {
        self.config.capabilities.check_current(channel, current)?;
        self.require(self.config.capabilities.can_limit_current, "set current")?;

        let caps = self.config.capabilities;
        let command = Self::command(format_args!(
            ":SOUR{channel}:CURR {:.*}",
            caps.decimals(),
            current.abs()
        ))?;
        let query = Self::command(format_args!(":SOUR{channel}:CURR?"))?;
        self.set_and_confirm("current", current, &command, &query, |response| {
            Ok(caps.confirms(current, parse_decimal::<S::Error>(response, "current")?))
        })
    }

    /// Disable every output, lowest channel first.
    pub fn off(&mut self) -> Result<(), S::Error> {
        for channel in 1..=self.config.capabilities.channel_count() {
            self.set_channel_enable(channel, State::Off)?;
        }
        Ok(())
    }

    /// Read whether a channel's output is enabled.
    pub fn get_output_state(&mut self, channel: u8) -> Result<State, S::Error> {
        self.config.capabilities.channel(channel)?;
        let query = Self::command(format_args!(":OUTP? CH{channel}"))?;
        let response = self.transport.send_command(&query)?;
        State::from_str(&response).map_err(|_| {
            Error::protocol(format!("Unknown response for output state query {response}"))
        })
    }

    /// Return the programmed voltage setpoint, in volts.
    pub fn get_voltage_setpoint(&mut self, channel: u8) -> Result<f64, S::Error> {
        self.config.capabilities.channel(channel)?;
        let query = Self::command(format_args!(":SOUR{channel}:VOLT?"))?;
        let response = self.transport.send_command(&query)?;
        parse_decimal(&response, "voltage")
    }

    /// Return the programmed current limit, in amps.
    pub fn get_current_setpoint(&mut self, channel: u8) -> Result<f64, S::Error> {
        self.config.capabilities.channel(channel)?;
        let query = Self::command(format_args!(":SOUR{channel}:CURR?"))?;
        let response = self.transport.send_command(&query)?;
        parse_decimal(&response, "current")
    }

    /// Measure voltage, current and power of a channel in one query.
    pub fn measure(&mut self, channel: u8) -> Result<Measurement, S::Error> {
        self.config.capabilities.channel(channel)?;
        let query = Self::command(format_args!(":MEAS:ALL? CH{channel}"))?;
        let response = self.transport.send_command(&query)?;

        let Some(measurement) = Measurement::parse(&response) else {
            return Err(Error::protocol(format!(
                "Unknown response for measurement `{response}`"
            )));
        };
        log::debug!(
            "Measured CH{channel}: {}V, {}A, {}W",
            measurement.voltage,
            measurement.current,
            measurement.power
        );
        Ok(measurement)
    }

    /// Return the measured output voltage in volts.
    pub fn get_voltage(&mut self, channel: u8) -> Result<f64, S::Error> {
        self.config.capabilities.channel(channel)?;
        self.require(self.config.capabilities.can_measure_voltage, "measure voltage")?;
        Ok(self.measure(channel)?.voltage)
    }

    /// Return the measured output current in amps.
    pub fn get_current(&mut self, channel: u8) -> Result<f64, S::Error> {
        self.config.capabilities.channel(channel)?;
        self.require(self.config.capabilities.can_measure_current, "measure current")?;
        Ok(self.measure(channel)?.current)
    }

    /// Get which setpoint is currently limiting a channel. (CV or CC.)
    pub fn get_limit_mode(&mut self, channel: u8) -> Result<LimitMode, S::Error> {
        self.config.capabilities.channel(channel)?;
        let query = Self::command(format_args!(":OUTP:CVCC? CH{channel}"))?;
        let response = self.transport.send_command(&query)?;
        if response.is_empty() {
            return Err(Error::protocol("Unknown response for mode query (CVCC)"));
        }
        Ok(LimitMode::from_response(&response))
    }

    /// Issue `command` until `query` confirms it, within the configured retry bounds.
    fn set_and_confirm(
        &mut self,
        what: &str,
        requested: impl fmt::Display,
        command: &str,
        query: &str,
        confirmed: impl Fn(&str) -> Result<bool, S::Error>,
    ) -> Result<(), S::Error> {
        let attempts = self.config.readback_retries.saturating_add(1);
        let deadline = Instant::now() + to_std(self.config.readback_deadline);
        let mut attempt = 0;

        loop {
            attempt += 1;
            self.transport.send_command_no_reply(command)?;
            self.settle();

            let response = self.transport.send_command(query)?;
            if confirmed(response.as_str())? {
                return Ok(());
            }

            if attempt >= attempts || Instant::now() >= deadline {
                log::warn!("Requested set {what} {requested} but read back {response}, giving up");
                return Err(Error::DeviceUnresponsive {
                    command: command.to_string(),
                    attempts: attempt,
                });
            }
            log::warn!("Requested set {what} {requested} but read back {response}, retrying");
            self.settle();
        }
    }

    /// Wait for the instrument to apply a command.
    fn settle(&self) {
        let delay = to_std(self.config.command_delay);
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }

    fn require(&self, capable: bool, operation: &'static str) -> Result<(), S::Error> {
        if capable {
            Ok(())
        } else {
            Err(ParameterError::Unsupported(operation).into())
        }
    }

    fn command(args: fmt::Arguments<'_>) -> Result<heapless::String<L>, S::Error> {
        let mut command = heapless::String::new();
        command
            .write_fmt(args)
            .map_err(|_| Error::<S::Error>::BufferOverflow)?;
        Ok(command)
    }
}

impl<S: embedded_io::Read + embedded_io::Write, const L: usize> Drop for Dp832<S, L> {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl<const L: usize> Dp832<TcpPort, L> {
    /// Open a TCP connection to the instrument and identify it.
    ///
    /// Does nothing if already connected.
    pub fn connect(&mut self, host: &str, port: u16) -> Result<(), IoError> {
        if port == 0 {
            return Err(ParameterError::InvalidPort(port).into());
        }
        if self.is_connected() {
            log::debug!("Device already connected");
            return Ok(());
        }
        self.config.validate()?;

        log::debug!("Connecting to {host} : {port}");
        let stream = TcpPort::connect(
            host,
            port,
            to_std(self.config.connect_timeout),
            to_std(self.config.response_timeout),
        )
        .map_err(Error::Io)?;
        self.attach(stream)
    }

    /// Connect, hand the instrument to `f`, and disconnect again whatever `f` returns.
    pub fn session<T>(
        host: &str,
        port: u16,
        config: Dp832Config,
        f: impl FnOnce(&mut Self) -> Result<T, IoError>,
    ) -> Result<T, IoError> {
        let mut psu = Self::new(config);
        psu.connect(host, port)?;
        let result = f(&mut psu);
        psu.disconnect();
        result
    }
}

fn parse_decimal<I: embedded_io::Error>(response: &str, what: &str) -> Result<f64, I> {
    response
        .parse()
        .map_err(|_| Error::protocol(format!("Unknown response for {what} readback `{response}`")))
}
