//! Raw pass-through encoder
//!
//! FIFO-capable radios modulate bytes themselves, so this variant only
//! holds the payload for the FIFO streamer. It produces no tones.

use super::{load_payload, EncoderError, Payload, ToneEncoder};

/// Pass-through encoder for radio FIFO streaming
#[derive(Clone, Debug, Default)]
pub struct RawEncoder {
    data: Payload,
}

impl RawEncoder {
    /// Create an encoder with no data loaded
    #[must_use]
    pub const fn new() -> Self {
        Self {
            data: Payload::new(),
        }
    }

    /// Bytes to stream
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl ToneEncoder for RawEncoder {
    fn tone_catalog(&self) -> &[u32] {
        &[]
    }

    fn tone_spacing(&self) -> u32 {
        0
    }

    fn symbol_rate(&self) -> u32 {
        0
    }

    fn symbol_delay(&self) -> u32 {
        0
    }

    fn set_data(&mut self, data: &[u8]) -> Result<(), EncoderError> {
        if data.is_empty() {
            self.data.clear();
            return Err(EncoderError::EmptyPayload);
        }
        load_payload(&mut self.data, data)
    }

    fn next_tone(&mut self) -> Option<u8> {
        None
    }
}
