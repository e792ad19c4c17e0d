//! Magic-board bit-register encoding.
//!
//! The auxiliary "magic board" is configured through a serial shift register
//! that the controllers expose as a single parameter (`BitLevel`).  A logical
//! channel selection is first encoded into a fixed-width binary string, then
//! the operation layer clocks that string into the register one bit per
//! broadcast round trip (see `camerad-ctl`'s `application::magic`).
//!
//! The widths and base offsets below come from the board's register layout:
//! drivers, the DNL line, and the HV outputs share a 6-bit address space,
//! while the ADC select lines are a 16-bit one-hot field.

use std::fmt;

use thiserror::Error;
use tracing::warn;

/// Error returned when a channel-kind name is not recognised.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown channel kind: {0}")]
pub struct UnknownChannelKind(pub String);

/// A logical magic-board channel selection: kind plus channel number.
///
/// Channel numbers are reduced modulo the number of channels the kind
/// actually has, so any integer is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelId {
    /// Clock/bias driver output, 24 channels.
    Driver(u32),
    /// The DNL calibration line; the channel number is ignored.
    Dnl(u32),
    /// High-voltage low-current output, 24 channels at offset 32.
    Hvlc(u32),
    /// High-voltage high-current output, 6 channels at offset 56.
    Hvhc(u32),
    /// ADC input select, one-hot over 16 channels.
    Adc(u32),
    /// No connection.  Channel 16 selects the wide (16-bit) null word;
    /// anything else selects the 6-bit null address.
    Null(u32),
}

impl ChannelId {
    /// Parses a `(kind, channel)` pair as given on the command line.
    /// Kind names are case-insensitive.
    pub fn parse(kind: &str, channel: u32) -> Result<Self, UnknownChannelKind> {
        match kind.to_ascii_lowercase().as_str() {
            "driver" => Ok(ChannelId::Driver(channel)),
            "dnl" => Ok(ChannelId::Dnl(channel)),
            "hvlc" => Ok(ChannelId::Hvlc(channel)),
            "hvhc" => Ok(ChannelId::Hvhc(channel)),
            "adc" => Ok(ChannelId::Adc(channel)),
            "null" => Ok(ChannelId::Null(channel)),
            _ => Err(UnknownChannelKind(kind.to_string())),
        }
    }

    /// Encodes this channel selection as a fixed-width binary string
    /// (`'0'`/`'1'` characters, most-significant bit first).
    pub fn bitstring(self) -> String {
        match self {
            ChannelId::Driver(c) => format!("{:06b}", c % 24),
            ChannelId::Dnl(_) => format!("{:06b}", 24),
            ChannelId::Hvlc(c) => format!("{:06b}", 32 + c % 24),
            ChannelId::Hvhc(c) => format!("{:06b}", 56 + c % 6),
            ChannelId::Adc(c) => format!("{:016b}", 1u32 << (c % 16)),
            ChannelId::Null(16) => format!("{:016b}", 0),
            ChannelId::Null(_) => format!("{:06b}", 25),
        }
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelId::Driver(c) => write!(f, "driver {c}"),
            ChannelId::Dnl(c) => write!(f, "dnl {c}"),
            ChannelId::Hvlc(c) => write!(f, "hvlc {c}"),
            ChannelId::Hvhc(c) => write!(f, "hvhc {c}"),
            ChannelId::Adc(c) => write!(f, "adc {c}"),
            ChannelId::Null(c) => write!(f, "null {c}"),
        }
    }
}

/// Lenient encoding entry point for stringly-typed callers.
///
/// An unrecognised kind name does **not** abort a board sequence: it is
/// logged and degraded to the single bit `"0"`, leaving the register in a
/// defined (all-deselected) state.  This is deliberate behavior, not error
/// swallowing — a half-programmed board is worse than a null selection.
pub fn bitstring_for(kind: &str, channel: u32) -> String {
    match ChannelId::parse(kind, channel) {
        Ok(id) => id.bitstring(),
        Err(e) => {
            warn!("{e}; substituting null bit");
            "0".to_string()
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
