//! Tone Encoders
//!
//! An encoder turns a byte payload into a finite, single-pass sequence of
//! tone indices. Strategies pull one index per symbol period with
//! [`ToneEncoder::next_tone`] until it returns `None`, the end of the
//! transmission. Once ended, an encoder keeps returning `None`.
//!
//! The set of encoders is closed, so [`Encoder`] dispatches over the
//! variants with a `match` instead of a trait object.

pub mod afsk;
pub mod mfsk;
pub mod morse;
pub mod raw;
pub mod symbol_table;

pub use afsk::{AfskConfig, AfskEncoder};
pub use mfsk::{MfskConfig, MfskEncoder, MfskType};
pub use morse::MorseEncoder;
pub use raw::RawEncoder;
pub use symbol_table::{JtMode, SymbolTableEncoder};

use crate::config::MAX_PAYLOAD_LEN;
use crate::types::SymbolTiming;

/// Fixed-capacity payload buffer
pub type Payload = heapless::Vec<u8, MAX_PAYLOAD_LEN>;

/// Error raised when an encoder rejects its input
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EncoderError {
    /// The variant needs at least one byte
    EmptyPayload,
    /// Input does not fit the encoder's storage
    PayloadTooLong {
        /// Bytes offered
        len: usize,
        /// Bytes accepted
        capacity: usize,
    },
    /// Symbol-table entry outside the mode's tone catalog
    InvalidSymbol {
        /// Position in the table
        index: usize,
        /// Offending tone index
        symbol: u8,
    },
}

#[cfg(feature = "embedded")]
impl defmt::Format for EncoderError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::EmptyPayload => defmt::write!(f, "empty payload"),
            Self::PayloadTooLong { len, capacity } => {
                defmt::write!(f, "payload {} > {} bytes", len, capacity);
            }
            Self::InvalidSymbol { index, symbol } => {
                defmt::write!(f, "symbol {} at {} out of range", symbol, index);
            }
        }
    }
}

/// Copy `data` into a payload buffer, reporting the capacity on overflow
pub(crate) fn load_payload(buffer: &mut Payload, data: &[u8]) -> Result<(), EncoderError> {
    buffer.clear();
    buffer
        .extend_from_slice(data)
        .map_err(|()| EncoderError::PayloadTooLong {
            len: data.len(),
            capacity: MAX_PAYLOAD_LEN,
        })
}

/// Common interface of every tone encoder
pub trait ToneEncoder {
    /// Tone offsets from the carrier in centihertz, indexed by tone
    ///
    /// Empty for variants without a tone concept (pass-through data and
    /// on/off keying).
    fn tone_catalog(&self) -> &[u32];

    /// Spacing between adjacent tones in centihertz
    fn tone_spacing(&self) -> u32;

    /// Nominal symbols per second, or 0 if the variant is delay-timed
    fn symbol_rate(&self) -> u32;

    /// Fixed inter-symbol delay in centi-milliseconds, or 0 if rate-timed
    fn symbol_delay(&self) -> u32;

    /// Load a payload and reset the sequence to its start
    ///
    /// # Errors
    ///
    /// Returns an [`EncoderError`] if the variant rejects the buffer. The
    /// encoder is then left at the end of its sequence.
    fn set_data(&mut self, data: &[u8]) -> Result<(), EncoderError>;

    /// Next tone index, or `None` once the sequence has ended
    fn next_tone(&mut self) -> Option<u8>;

    /// Number of tones in the catalog
    fn tone_count(&self) -> usize {
        self.tone_catalog().len()
    }

    /// Whichever of rate or delay the variant is timed by
    fn timing(&self) -> Option<SymbolTiming> {
        match (self.symbol_rate(), self.symbol_delay()) {
            (0, 0) => None,
            (0, delay) => Some(SymbolTiming::Delay(delay)),
            (rate, _) => Some(SymbolTiming::Rate(rate)),
        }
    }
}

/// Encoder selection for a schedule entry
///
/// Every transmission builds a fresh encoder from its configuration, so
/// no state leaks from one transmission into the next.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EncoderConfig {
    /// AFSK with HDLC framing
    Afsk(AfskConfig),
    /// M-ary FSK
    Mfsk(MfskConfig),
    /// Morse code at a unit rate (units per second)
    Morse {
        /// Morse units per second
        symbol_rate: u32,
    },
    /// Bytes streamed to a radio FIFO as-is
    Raw,
    /// Externally computed symbol table
    SymbolTable(JtMode),
}

impl EncoderConfig {
    /// Create a fresh encoder in its initial state
    #[must_use]
    pub fn build(&self) -> Encoder {
        match *self {
            Self::Afsk(config) => Encoder::Afsk(AfskEncoder::new(config)),
            Self::Mfsk(config) => Encoder::Mfsk(MfskEncoder::new(config)),
            Self::Morse { symbol_rate } => Encoder::Morse(MorseEncoder::new(symbol_rate)),
            Self::Raw => Encoder::Raw(RawEncoder::new()),
            Self::SymbolTable(mode) => Encoder::SymbolTable(SymbolTableEncoder::new(mode)),
        }
    }
}

/// Any tone encoder
#[derive(Clone, Debug)]
pub enum Encoder {
    /// AFSK / Bell 202 with HDLC bit-stuffing
    Afsk(AfskEncoder),
    /// 2/4/16-ary FSK
    Mfsk(MfskEncoder),
    /// Morse code on/off keying
    Morse(MorseEncoder),
    /// FIFO pass-through
    Raw(RawEncoder),
    /// Opaque symbol table (WSPR, FT8, JT-modes)
    SymbolTable(SymbolTableEncoder),
}

impl Encoder {
    /// Check if tone indices are key states (1 = key down) rather than tones
    #[must_use]
    pub const fn is_keyed(&self) -> bool {
        matches!(self, Self::Morse(_))
    }

    /// Raw bytes for the FIFO strategy, `None` for tone-producing variants
    #[must_use]
    pub fn raw_data(&self) -> Option<&[u8]> {
        match self {
            Self::Raw(raw) => Some(raw.data()),
            _ => None,
        }
    }
}

impl ToneEncoder for Encoder {
    fn tone_catalog(&self) -> &[u32] {
        match self {
            Self::Afsk(e) => e.tone_catalog(),
            Self::Mfsk(e) => e.tone_catalog(),
            Self::Morse(e) => e.tone_catalog(),
            Self::Raw(e) => e.tone_catalog(),
            Self::SymbolTable(e) => e.tone_catalog(),
        }
    }

    fn tone_spacing(&self) -> u32 {
        match self {
            Self::Afsk(e) => e.tone_spacing(),
            Self::Mfsk(e) => e.tone_spacing(),
            Self::Morse(e) => e.tone_spacing(),
            Self::Raw(e) => e.tone_spacing(),
            Self::SymbolTable(e) => e.tone_spacing(),
        }
    }

    fn symbol_rate(&self) -> u32 {
        match self {
            Self::Afsk(e) => e.symbol_rate(),
            Self::Mfsk(e) => e.symbol_rate(),
            Self::Morse(e) => e.symbol_rate(),
            Self::Raw(e) => e.symbol_rate(),
            Self::SymbolTable(e) => e.symbol_rate(),
        }
    }

    fn symbol_delay(&self) -> u32 {
        match self {
            Self::Afsk(e) => e.symbol_delay(),
            Self::Mfsk(e) => e.symbol_delay(),
            Self::Morse(e) => e.symbol_delay(),
            Self::Raw(e) => e.symbol_delay(),
            Self::SymbolTable(e) => e.symbol_delay(),
        }
    }

    fn set_data(&mut self, data: &[u8]) -> Result<(), EncoderError> {
        match self {
            Self::Afsk(e) => e.set_data(data),
            Self::Mfsk(e) => e.set_data(data),
            Self::Morse(e) => e.set_data(data),
            Self::Raw(e) => e.set_data(data),
            Self::SymbolTable(e) => e.set_data(data),
        }
    }

    fn next_tone(&mut self) -> Option<u8> {
        match self {
            Self::Afsk(e) => e.next_tone(),
            Self::Mfsk(e) => e.next_tone(),
            Self::Morse(e) => e.next_tone(),
            Self::Raw(e) => e.next_tone(),
            Self::SymbolTable(e) => e.next_tone(),
        }
    }
}
