//! Capability descriptor for the supported power supplies.
//!
//! Channel count, setpoint ranges and feature flags are plain data, consulted by the
//! controller when it validates arguments.

use crate::error::ParameterError;

/// Setpoint and power limits of a single output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelLimits {
    /// Highest programmable voltage in volts. The lower bound is always 0.
    pub max_voltage: f64,
    /// Highest programmable current in amps. The lower bound is always 0.
    pub max_current: f64,
    /// Rated output power in watts.
    pub max_power: f64,
}

impl ChannelLimits {
    pub const fn new(max_voltage: f64, max_current: f64, max_power: f64) -> Self {
        Self {
            max_voltage,
            max_current,
            max_power,
        }
    }
}

/// What an instrument can do, and within which bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Capabilities {
    /// One entry per output, channel 1 first.
    pub channels: &'static [ChannelLimits],
    /// Reporting resolution of setpoints. A readback within this distance of the request
    /// counts as confirmed.
    pub resolution: f64,
    pub can_limit_voltage: bool,
    pub can_limit_current: bool,
    pub can_measure_voltage: bool,
    pub can_measure_current: bool,
    pub can_switch_output: bool,
}

const DP832_CHANNELS: [ChannelLimits; 3] = [
    ChannelLimits::new(30.0, 3.0, 90.0),
    ChannelLimits::new(30.0, 3.0, 90.0),
    ChannelLimits::new(5.0, 3.0, 15.0),
];

impl Capabilities {
    /// Rigol DP832: two 30V/3A outputs and one 5V/3A output.
    pub const DP832: Capabilities = Capabilities {
        channels: &DP832_CHANNELS,
        resolution: 1e-3,
        can_limit_voltage: true,
        can_limit_current: true,
        can_measure_voltage: true,
        can_measure_current: true,
        can_switch_output: true,
    };

    /// Number of outputs.
    pub fn channel_count(&self) -> u8 {
        self.channels.len() as u8
    }

    /// Return the limits of a 1-based channel index, or reject the index.
    pub fn channel(&self, channel: u8) -> Result<&ChannelLimits, ParameterError> {
        channel
            .checked_sub(1)
            .and_then(|idx| self.channels.get(idx as usize))
            .ok_or(ParameterError::ChannelOutOfRange {
                channel,
                channels: self.channel_count(),
            })
    }

    /// Check a channel and a voltage setpoint for it.
    pub fn check_voltage(&self, channel: u8, voltage: f64) -> Result<(), ParameterError> {
        let limits = self.channel(channel)?;
        if (0.0..=limits.max_voltage).contains(&voltage) {
            Ok(())
        } else {
            Err(ParameterError::VoltageOutOfRange {
                channel,
                value: voltage,
                min: 0.0,
                max: limits.max_voltage,
            })
        }
    }

    /// Check a channel and a current setpoint for it.
    pub fn check_current(&self, channel: u8, current: f64) -> Result<(), ParameterError> {
        let limits = self.channel(channel)?;
        if (0.0..=limits.max_current).contains(&current) {
            Ok(())
        } else {
            Err(ParameterError::CurrentOutOfRange {
                channel,
                value: current,
                min: 0.0,
                max: limits.max_current,
            })
        }
    }

    /// Decimal places a setpoint is sent with, one per digit of resolution.
    pub fn decimals(&self) -> usize {
        (-self.resolution.log10()).round().max(0.0) as usize
    }

    /// Whether `readback` confirms `requested` at this instrument's resolution.
    pub fn confirms(&self, requested: f64, readback: f64) -> bool {
        (readback - requested).abs() < self.resolution
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::DP832
    }
}
