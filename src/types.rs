//! This module contains the value types exchanged with the DP832.

use strum_macros::{EnumIter, EnumString, IntoStaticStr};

/// Used to be less ambiguous about whether an output is on or off.
///
/// The strum serializations are the tokens the instrument uses on the wire.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, EnumIter, EnumString, IntoStaticStr)]
pub enum State {
    /// Disabled.
    #[default]
    #[strum(serialize = "OFF")]
    Off,
    /// Enabled.
    #[strum(serialize = "ON")]
    On,
}

impl State {
    /// Wire token, `ON` or `OFF`.
    pub fn as_scpi(self) -> &'static str {
        self.into()
    }
}

impl From<State> for bool {
    fn from(value: State) -> Self {
        match value {
            State::Off => false,
            State::On => true,
        }
    }
}

impl From<bool> for State {
    fn from(value: bool) -> Self {
        match value {
            true => State::On,
            false => State::Off,
        }
    }
}

/// Which setpoint is currently limiting a channel's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum LimitMode {
    /// Neither limit is active (the instrument reports e.g. `UR`, unregulated).
    None,
    /// Constant voltage regulation (`CV`).
    Voltage,
    /// Constant current regulation (`CC`).
    Current,
}

impl LimitMode {
    /// Map the reply to `:OUTP:CVCC?`. Unknown tokens mean no limit is active.
    pub fn from_response(response: &str) -> Self {
        match response {
            "CV" => LimitMode::Voltage,
            "CC" => LimitMode::Current,
            _ => LimitMode::None,
        }
    }
}

/// One `:MEAS:ALL?` reading. Never cached, every read is a fresh query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    /// Volts.
    pub voltage: f64,
    /// Amps.
    pub current: f64,
    /// Watts.
    pub power: f64,
}

impl Measurement {
    /// Parse `<voltage>,<current>,<power>`. Returns `None` unless there are exactly three
    /// decimal fields.
    pub fn parse(response: &str) -> Option<Self> {
        let mut fields = response.split(',').map(|f| f.trim().parse::<f64>());
        let voltage = fields.next()?.ok()?;
        let current = fields.next()?.ok()?;
        let power = fields.next()?.ok()?;
        if fields.next().is_some() {
            return None;
        }
        Some(Measurement {
            voltage,
            current,
            power,
        })
    }
}
