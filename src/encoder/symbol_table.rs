//! Opaque symbol-table encoder
//!
//! Weak-signal modes (WSPR, FT8, JT65, JT9, JT4) are generated by an
//! external symbol generator. This variant replays its table one symbol at a
//! time with the mode's tone spacing and symbol timing.

use super::{EncoderError, Payload, ToneEncoder};

/// Largest tone catalog (JT65 uses 65 tones)
const MAX_TONES: usize = 65;

/// Weak-signal mode
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JtMode {
    /// WSPR: 162 symbols, 4 tones, 1.4648 Hz, 0.683 s
    Wspr,
    /// FT8: 79 symbols, 8 tones, 6.25 Hz, 0.160 s
    Ft8,
    /// JT65: 126 symbols, 65 tones, 2.69 Hz, 0.372 s
    Jt65,
    /// JT9: 85 symbols, 9 tones, 1.74 Hz, 0.576 s
    Jt9,
    /// JT4: 207 symbols, 4 tones, 4.37 Hz, 0.229 s
    Jt4,
}

impl JtMode {
    /// Symbols in one transmission
    #[must_use]
    pub const fn symbol_count(self) -> usize {
        match self {
            Self::Wspr => 162,
            Self::Ft8 => 79,
            Self::Jt65 => 126,
            Self::Jt9 => 85,
            Self::Jt4 => 207,
        }
    }

    /// Tones in the catalog
    #[must_use]
    pub const fn tone_count(self) -> usize {
        match self {
            Self::Wspr | Self::Jt4 => 4,
            Self::Ft8 => 8,
            Self::Jt65 => 65,
            Self::Jt9 => 9,
        }
    }

    /// Tone spacing in centihertz
    #[must_use]
    pub const fn tone_spacing_centihz(self) -> u32 {
        match self {
            Self::Wspr => 146,
            Self::Ft8 => 625,
            Self::Jt65 => 269,
            Self::Jt9 => 174,
            Self::Jt4 => 437,
        }
    }

    /// Symbol duration in centi-milliseconds
    #[must_use]
    pub const fn symbol_delay_cms(self) -> u32 {
        match self {
            Self::Wspr => 68_267,
            Self::Ft8 => 16_000,
            Self::Jt65 => 37_152,
            Self::Jt9 => 57_600,
            Self::Jt4 => 22_857,
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for JtMode {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Wspr => defmt::write!(f, "WSPR"),
            Self::Ft8 => defmt::write!(f, "FT8"),
            Self::Jt65 => defmt::write!(f, "JT65"),
            Self::Jt9 => defmt::write!(f, "JT9"),
            Self::Jt4 => defmt::write!(f, "JT4"),
        }
    }
}

/// Symbol-table replay encoder
#[derive(Clone, Debug)]
pub struct SymbolTableEncoder {
    mode: JtMode,
    tones: [u32; MAX_TONES],
    symbols: Payload,
    index: usize,
}

impl SymbolTableEncoder {
    /// Create an encoder with no table loaded
    #[must_use]
    pub fn new(mode: JtMode) -> Self {
        let mut tones = [0u32; MAX_TONES];
        for (i, tone) in tones.iter_mut().enumerate().take(mode.tone_count()) {
            *tone = i as u32 * mode.tone_spacing_centihz();
        }
        Self {
            mode,
            tones,
            symbols: Payload::new(),
            index: 0,
        }
    }

    /// Weak-signal mode
    #[must_use]
    pub const fn mode(&self) -> JtMode {
        self.mode
    }
}

impl ToneEncoder for SymbolTableEncoder {
    fn tone_catalog(&self) -> &[u32] {
        &self.tones[..self.mode.tone_count()]
    }

    fn tone_spacing(&self) -> u32 {
        self.mode.tone_spacing_centihz()
    }

    fn symbol_rate(&self) -> u32 {
        0
    }

    fn symbol_delay(&self) -> u32 {
        self.mode.symbol_delay_cms()
    }

    /// The table must hold at most one transmission of symbols, each within
    /// the mode's tone catalog.
    fn set_data(&mut self, data: &[u8]) -> Result<(), EncoderError> {
        self.symbols.clear();
        self.index = 0;
        if data.is_empty() {
            return Err(EncoderError::EmptyPayload);
        }
        let capacity = self.mode.symbol_count();
        if data.len() > capacity {
            return Err(EncoderError::PayloadTooLong {
                len: data.len(),
                capacity,
            });
        }
        let tone_count = self.mode.tone_count();
        if let Some(index) = data.iter().position(|&s| usize::from(s) >= tone_count) {
            return Err(EncoderError::InvalidSymbol {
                index,
                symbol: data[index],
            });
        }
        super::load_payload(&mut self.symbols, data)
    }

    fn next_tone(&mut self) -> Option<u8> {
        let symbol = *self.symbols.get(self.index)?;
        self.index += 1;
        Some(symbol)
    }
}
