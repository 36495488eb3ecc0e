//! M-ary FSK Encoder
//!
//! Slices each payload byte MSB-first into fields of `log2(M)` bits; each
//! field is one tone index. Used for Horus binary telemetry (4-FSK) and
//! generic 2/16-FSK beacons.

use super::{load_payload, EncoderError, Payload, ToneEncoder};
use crate::config::{HORUS_SYMBOL_RATE, HORUS_TONE_SPACING_CENTIHZ};

/// Largest supported tone count
const MAX_TONES: usize = 16;

/// Modulation order
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MfskType {
    /// 2-FSK, one bit per symbol
    Binary,
    /// 4-FSK, two bits per symbol
    Quaternary,
    /// 16-FSK, four bits per symbol
    Sixteen,
}

impl MfskType {
    /// Number of tones
    #[must_use]
    pub const fn tone_count(self) -> usize {
        match self {
            Self::Binary => 2,
            Self::Quaternary => 4,
            Self::Sixteen => 16,
        }
    }

    /// Bits carried by one symbol
    #[must_use]
    pub const fn bits_per_symbol(self) -> u8 {
        match self {
            Self::Binary => 1,
            Self::Quaternary => 2,
            Self::Sixteen => 4,
        }
    }

    /// Tone held while the carrier idles between frames
    #[must_use]
    pub const fn idle_tone(self) -> u8 {
        match self {
            Self::Binary => 1,
            Self::Quaternary | Self::Sixteen => 0,
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for MfskType {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{}-FSK", self.tone_count());
    }
}

/// M-ary FSK parameters
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MfskConfig {
    /// Modulation order
    pub kind: MfskType,
    /// Symbols per second
    pub symbol_rate: u32,
    /// Tone spacing in centihertz
    pub tone_spacing_centihz: u32,
}

impl MfskConfig {
    /// Horus binary: 4-FSK, 100 Bd, 270 Hz spacing
    pub const HORUS: Self = Self {
        kind: MfskType::Quaternary,
        symbol_rate: HORUS_SYMBOL_RATE,
        tone_spacing_centihz: HORUS_TONE_SPACING_CENTIHZ,
    };
}

/// M-ary FSK encoder
#[derive(Clone, Debug)]
pub struct MfskEncoder {
    config: MfskConfig,
    tones: [u32; MAX_TONES],
    data: Payload,
    byte_index: usize,
    /// Bits of the current byte already sent
    bit_offset: u8,
}

impl MfskEncoder {
    /// Create an encoder with no data loaded
    #[must_use]
    pub fn new(config: MfskConfig) -> Self {
        let mut tones = [0u32; MAX_TONES];
        for (i, tone) in tones.iter_mut().enumerate().take(config.kind.tone_count()) {
            *tone = i as u32 * config.tone_spacing_centihz;
        }
        Self {
            config,
            tones,
            data: Payload::new(),
            byte_index: 0,
            bit_offset: 0,
        }
    }

    /// Tone held while idle
    #[must_use]
    pub const fn idle_tone(&self) -> u8 {
        self.config.kind.idle_tone()
    }

    /// Modulation order
    #[must_use]
    pub const fn kind(&self) -> MfskType {
        self.config.kind
    }
}

impl ToneEncoder for MfskEncoder {
    fn tone_catalog(&self) -> &[u32] {
        &self.tones[..self.config.kind.tone_count()]
    }

    fn tone_spacing(&self) -> u32 {
        self.config.tone_spacing_centihz
    }

    fn symbol_rate(&self) -> u32 {
        self.config.symbol_rate
    }

    fn symbol_delay(&self) -> u32 {
        0
    }

    /// An empty buffer is accepted and ends the sequence immediately.
    fn set_data(&mut self, data: &[u8]) -> Result<(), EncoderError> {
        self.byte_index = 0;
        self.bit_offset = 0;
        load_payload(&mut self.data, data)
    }

    fn next_tone(&mut self) -> Option<u8> {
        let byte = *self.data.get(self.byte_index)?;
        let bits = self.config.kind.bits_per_symbol();
        let shift = 8 - self.bit_offset - bits;
        let mask = (1u8 << bits) - 1;
        let symbol = (byte >> shift) & mask;

        self.bit_offset += bits;
        if self.bit_offset == 8 {
            self.bit_offset = 0;
            self.byte_index += 1;
        }
        Some(symbol)
    }
}
