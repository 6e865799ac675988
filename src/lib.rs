//! This crate provides an interface for controlling the Rigol DP832 triple-output programmable
//! power supply over its LAN port.
//!
//! The instrument speaks newline-terminated SCPI text on a raw TCP socket (port 5555 by default).
//! Every setting this driver writes is read back and compared to what was requested, and the
//! command is re-issued a bounded number of times until the instrument confirms it.
//!
//! Outputs of the DP832:
//! * CH1: 0-30V, 0-3A
//! * CH2: 0-30V, 0-3A
//! * CH3: 0-5V, 0-3A
//!
//! ```no_run
//! use rigol_dp832::{config::{Dp832Config, DEFAULT_PORT}, psu::Dp832Lan};
//!
//! Dp832Lan::session("192.168.1.20", DEFAULT_PORT, Dp832Config::default(), |psu| {
//!     psu.set_voltage(1, 5.0)?;
//!     psu.set_current(1, 0.5)?;
//!     psu.set_channel_enable(1, true)?;
//!     println!("{:?}", psu.measure(1)?);
//!     psu.set_channel_enable(1, false)
//! })?;
//! # Ok::<(), rigol_dp832::error::Error<rigol_dp832::lan::IoError>>(())
//! ```
//!
//! The driver itself is generic over any `embedded_io` stream, see [`psu::Dp832`].

pub mod capabilities;
pub mod config;
pub mod error;
pub mod identity;
pub mod lan;
pub mod psu;
pub mod transport;
pub mod types;

#[cfg(test)]
mod mock_stream;
