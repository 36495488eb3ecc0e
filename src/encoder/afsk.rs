//! AFSK Encoder (Bell 202 / HDLC)
//!
//! Produces the tone sequence for an AX.25 frame that has already been
//! assembled by the payload producer, flags and CRC included.
//!
//! # Line Coding
//!
//! Bits are taken LSB-first from each byte and NRZI coded: a zero toggles
//! between the mark and space tone, a one keeps the current tone. HDLC
//! bit-stuffing is applied on the fly: after five consecutive ones an extra
//! zero (a tone toggle) is emitted without consuming a source bit.
//!
//! The first byte of the buffer is the flag. It is repeated
//! `1 + flag_count` times as the preamble. Flags are never stuffed, neither
//! in the preamble nor as a trailing closing flag.

use super::{load_payload, EncoderError, Payload, ToneEncoder};
use crate::config::APRS_PREAMBLE_FLAGS;

/// HDLC flag byte
pub const HDLC_FLAG: u8 = 0x7E;

/// Consecutive one bits that force a stuffed zero
const STUFF_AFTER_ONES: u8 = 5;

/// Tone index of the mark tone
pub const MARK: u8 = 0;

/// Tone index of the space tone
pub const SPACE: u8 = 1;

/// AFSK parameters
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AfskConfig {
    /// Symbols per second
    pub baud: u32,
    /// Mark tone in centihertz
    pub mark_centihz: u32,
    /// Space tone in centihertz
    pub space_centihz: u32,
    /// Extra repetitions of the leading flag
    pub flag_count: u16,
}

impl AfskConfig {
    /// Bell 202: 1200 Bd, mark 1200 Hz, space 2200 Hz
    pub const BELL_202: Self = Self {
        baud: 1_200,
        mark_centihz: 120_000,
        space_centihz: 220_000,
        flag_count: APRS_PREAMBLE_FLAGS,
    };

    /// Same tones with a different preamble length
    #[must_use]
    pub const fn with_flag_count(self, flag_count: u16) -> Self {
        Self { flag_count, ..self }
    }
}

impl Default for AfskConfig {
    fn default() -> Self {
        Self::BELL_202
    }
}

/// Bell 202 AFSK encoder with HDLC bit-stuffing
#[derive(Clone, Debug)]
pub struct AfskEncoder {
    config: AfskConfig,
    tones: [u32; 2],
    data: Payload,
    /// Byte being sent
    byte_index: usize,
    /// Next bit of that byte (LSB first)
    bit_index: u8,
    /// Preamble flags still to repeat after the current one
    flags_remaining: u16,
    /// Consecutive stuffable one bits
    ones: u8,
    /// Current NRZI tone
    tone: u8,
}

impl AfskEncoder {
    /// Create an encoder with no data loaded
    #[must_use]
    pub fn new(config: AfskConfig) -> Self {
        Self {
            config,
            tones: [config.mark_centihz, config.space_centihz],
            data: Payload::new(),
            byte_index: 0,
            bit_index: 0,
            flags_remaining: 0,
            ones: 0,
            tone: MARK,
        }
    }

    /// Encoder parameters
    #[must_use]
    pub const fn config(&self) -> &AfskConfig {
        &self.config
    }

    /// Check if the byte at `index` is sent without bit-stuffing
    fn is_unstuffed(&self, index: usize) -> bool {
        let last = self.data.len() - 1;
        index == 0 || (index == last && self.data[index] == HDLC_FLAG)
    }

    fn toggle(&mut self) {
        self.tone ^= 1;
    }

    fn advance_bit(&mut self) {
        self.bit_index += 1;
        if self.bit_index == 8 {
            self.bit_index = 0;
            if self.byte_index == 0 && self.flags_remaining > 0 {
                self.flags_remaining -= 1;
            } else {
                self.byte_index += 1;
            }
        }
    }
}

impl ToneEncoder for AfskEncoder {
    fn tone_catalog(&self) -> &[u32] {
        &self.tones
    }

    fn tone_spacing(&self) -> u32 {
        self.config.space_centihz.abs_diff(self.config.mark_centihz)
    }

    fn symbol_rate(&self) -> u32 {
        self.config.baud
    }

    fn symbol_delay(&self) -> u32 {
        0
    }

    fn set_data(&mut self, data: &[u8]) -> Result<(), EncoderError> {
        self.data.clear();
        self.byte_index = 0;
        self.bit_index = 0;
        self.ones = 0;
        self.tone = MARK;
        self.flags_remaining = 0;
        if data.is_empty() {
            return Err(EncoderError::EmptyPayload);
        }
        load_payload(&mut self.data, data)?;
        self.flags_remaining = self.config.flag_count;
        Ok(())
    }

    fn next_tone(&mut self) -> Option<u8> {
        // A stuffed zero is due right after the fifth one, even when the
        // following byte is a closing flag or the buffer has ended
        if self.ones == STUFF_AFTER_ONES {
            self.ones = 0;
            self.toggle();
            return Some(self.tone);
        }

        if self.byte_index >= self.data.len() {
            return None;
        }

        let stuffing = !self.is_unstuffed(self.byte_index);
        let bit = (self.data[self.byte_index] >> self.bit_index) & 1;
        self.advance_bit();

        if bit == 1 {
            self.ones = if stuffing { self.ones + 1 } else { 0 };
        } else {
            self.ones = 0;
            self.toggle();
        }
        Some(self.tone)
    }
}
