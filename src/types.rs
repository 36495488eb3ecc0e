//! Shared types used across the beacon firmware
//!
//! This module defines domain-specific types that enforce invariants
//! at compile time and provide type safety throughout the codebase.

use core::fmt;

/// Centihertz per hertz
pub const CENTIHZ_PER_HZ: u64 = 100;

/// Carrier frequency with sub-hertz resolution
///
/// Stored in centihertz so that slow weak-signal modes (WSPR tone spacing
/// is 1.4648 Hz) and receiver alignment offsets can be placed exactly.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Frequency(u64);

impl Frequency {
    /// Minimum supported frequency (lowest Si5351 output)
    pub const MIN_HZ: u32 = 100_000;

    /// Maximum supported frequency (top of the Si4063 range)
    pub const MAX_HZ: u32 = 1_050_000_000;

    /// Create a new Frequency from Hz, returns None if out of range
    #[must_use]
    pub const fn from_hz(hz: u32) -> Option<Self> {
        if hz >= Self::MIN_HZ && hz <= Self::MAX_HZ {
            Some(Self(hz as u64 * CENTIHZ_PER_HZ))
        } else {
            None
        }
    }

    /// Create a new Frequency from kHz
    #[must_use]
    pub const fn from_khz(khz: u32) -> Option<Self> {
        match khz.checked_mul(1000) {
            Some(hz) => Self::from_hz(hz),
            None => None,
        }
    }

    /// Add a sub-hertz offset (0-99 centihertz) for receiver alignment
    #[must_use]
    pub const fn with_offset_centihz(self, centihz: u8) -> Option<Self> {
        if (centihz as u64) < CENTIHZ_PER_HZ {
            Some(Self(self.0 + centihz as u64))
        } else {
            None
        }
    }

    /// Shift the carrier up by a tone offset in centihertz
    #[must_use]
    pub const fn shifted(self, centihz: u32) -> Self {
        Self(self.0 + centihz as u64)
    }

    /// Get the frequency in Hz (truncated)
    #[must_use]
    pub const fn as_hz(self) -> u32 {
        (self.0 / CENTIHZ_PER_HZ) as u32
    }

    /// Get the frequency in kHz (truncated)
    #[must_use]
    pub const fn as_khz(self) -> u32 {
        self.as_hz() / 1000
    }

    /// Get the frequency in centihertz
    #[must_use]
    pub const fn as_centihz(self) -> u64 {
        self.0
    }

    /// Get the sub-hertz part in centihertz (0-99)
    #[must_use]
    pub const fn sub_hz_centihz(self) -> u8 {
        (self.0 % CENTIHZ_PER_HZ) as u8
    }
}

impl fmt::Debug for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frequency({}.{:02} Hz)", self.as_hz(), self.sub_hz_centihz())
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for Frequency {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{} cHz", self.0);
    }
}

/// Power level setting
///
/// Each backend maps the percentage onto its own register range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PowerLevel(u8);

impl PowerLevel {
    /// Minimum power
    pub const MIN: Self = Self(0);

    /// Maximum power
    pub const MAX: Self = Self(100);

    /// Create a power level from percentage (0-100)
    #[must_use]
    pub const fn from_percent(percent: u8) -> Self {
        if percent > 100 {
            Self(100)
        } else {
            Self(percent)
        }
    }

    /// Get the power level as a percentage
    #[must_use]
    pub const fn as_percent(self) -> u8 {
        self.0
    }

    /// Scale onto a register range `0..=max`
    #[must_use]
    pub const fn scaled(self, max: u8) -> u8 {
        ((self.0 as u16 * max as u16) / 100) as u8
    }
}

impl Default for PowerLevel {
    fn default() -> Self {
        Self(100)
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for PowerLevel {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{}%", self.0);
    }
}

/// Symbol timing of a transmission
///
/// A mode is timed either by a nominal symbol rate or by a fixed
/// inter-symbol delay, never both.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SymbolTiming {
    /// Symbols per second
    Rate(u32),
    /// Inter-symbol delay in centi-milliseconds (1/100 000 s)
    Delay(u32),
}

impl SymbolTiming {
    /// Symbol period in microseconds (rounded to nearest)
    #[must_use]
    pub const fn period_us(self) -> u32 {
        match self {
            Self::Rate(0) | Self::Delay(0) => 0,
            Self::Rate(rate) => (1_000_000 + rate / 2) / rate,
            Self::Delay(cms) => cms * 10,
        }
    }

    /// Symbol period as an exact fraction of a second: `(numerator, denominator)`
    #[must_use]
    pub const fn period_fraction(self) -> (u64, u64) {
        match self {
            Self::Rate(rate) => (1, rate as u64),
            Self::Delay(cms) => (cms as u64, 100_000),
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for SymbolTiming {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Rate(rate) => defmt::write!(f, "{} Bd", rate),
            Self::Delay(cms) => defmt::write!(f, "{}0 us/sym", cms),
        }
    }
}

/// Transmitter fitted on the board
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Si4032 UHF transmitter (RS41 original)
    Si4032,
    /// Si4063 UHF transceiver (RS41 new revision)
    Si4063,
    /// Si5351 clock generator used as an HF transmitter
    Si5351,
}

#[cfg(feature = "embedded")]
impl defmt::Format for BackendKind {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Si4032 => defmt::write!(f, "Si4032"),
            Self::Si4063 => defmt::write!(f, "Si4063"),
            Self::Si5351 => defmt::write!(f, "Si5351"),
        }
    }
}

/// Data mode of a schedule entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataMode {
    /// Morse code
    Cw,
    /// APRS packets, AFSK Bell 202
    Aprs,
    /// Horus binary telemetry, multi-tone FSK
    Horus,
    /// WSPR weak-signal beacon
    Wspr,
    /// FT8
    Ft8,
    /// JT65
    Jt65,
    /// JT9
    Jt9,
    /// JT4
    Jt4,
    /// CATS packets streamed through the radio FIFO
    Cats,
}

impl DataMode {
    /// Check if the mode sends an externally computed symbol table
    #[must_use]
    pub const fn is_symbol_table(self) -> bool {
        matches!(self, Self::Wspr | Self::Ft8 | Self::Jt65 | Self::Jt9 | Self::Jt4)
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for DataMode {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Cw => defmt::write!(f, "CW"),
            Self::Aprs => defmt::write!(f, "APRS"),
            Self::Horus => defmt::write!(f, "Horus"),
            Self::Wspr => defmt::write!(f, "WSPR"),
            Self::Ft8 => defmt::write!(f, "FT8"),
            Self::Jt65 => defmt::write!(f, "JT65"),
            Self::Jt9 => defmt::write!(f, "JT9"),
            Self::Jt4 => defmt::write!(f, "JT4"),
            Self::Cats => defmt::write!(f, "CATS"),
        }
    }
}
