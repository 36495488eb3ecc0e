//! Tick-stepped strategy
//!
//! For slow modes on a transmitter that is retuned per symbol. The system
//! tick counts down to each symbol boundary and the main loop then writes
//! the next tone as a carrier frequency, or keys the carrier for Morse.

use crate::encoder::{Encoder, ToneEncoder};
use crate::radio::backend::{BackendError, RadioBackend};
use crate::radio::signals::TxSignals;
use crate::radio::symbol_clock::SymbolClock;
use crate::types::Frequency;

/// Main-loop symbol stepper
#[derive(Clone, Copy, Debug)]
pub struct TickStepper {
    clock: SymbolClock,
    carrier: Frequency,
    keyed: bool,
    symbols_sent: u32,
}

impl TickStepper {
    /// Arm the first symbol for the next main-loop pass
    #[must_use]
    pub fn start(clock: SymbolClock, carrier: Frequency, keyed: bool, signals: &TxSignals) -> Self {
        signals.arm_next_symbol(0);
        Self {
            clock,
            carrier,
            keyed,
            symbols_sent: 0,
        }
    }

    /// Symbols sent so far
    #[must_use]
    pub const fn symbols_sent(&self) -> u32 {
        self.symbols_sent
    }

    /// Write the next symbol if one is due
    ///
    /// Returns `Ok(false)` once the encoder has ended and the last symbol
    /// has run its full length.
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] if retuning or keying fails.
    pub fn poll(
        &mut self,
        backend: &mut dyn RadioBackend,
        encoder: &mut Encoder,
        signals: &TxSignals,
    ) -> Result<bool, BackendError> {
        if !signals.take_symbol_due() {
            return Ok(true);
        }
        let Some(tone) = encoder.next_tone() else {
            return Ok(false);
        };
        if self.keyed {
            if tone == 0 {
                backend.disable_tx()?;
            } else {
                backend.enable_tx()?;
            }
        } else {
            let offset = encoder
                .tone_catalog()
                .get(usize::from(tone))
                .copied()
                .unwrap_or(0);
            backend.set_frequency(self.carrier.shifted(offset))?;
        }
        self.symbols_sent += 1;
        signals.arm_next_symbol(self.clock.next_ticks());
        Ok(true)
    }
}
