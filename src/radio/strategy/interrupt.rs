//! Interrupt toggle strategy
//!
//! A hardware timer fires once per symbol. Its interrupt pulls the next
//! tone from the encoder and writes it to the transmitter over the
//! bit-banged bus: a key state for Morse, a frequency offset otherwise.
//! The system tick is suspended for the whole transmission so nothing
//! delays the timer interrupt.

use crate::encoder::{Encoder, ToneEncoder};
use crate::radio::peripheral::{Board, BusHandoff, Symbol, SymbolSink, SymbolTimer, SystemTick};
use crate::radio::realtime::{IsrJob, RealTime};
use crate::types::BackendKind;

/// Encoder state owned by the symbol timer interrupt
#[derive(Debug)]
pub struct ToggleJob {
    encoder: Encoder,
    keyed: bool,
    symbols_sent: u32,
    finished: bool,
}

impl ToggleJob {
    /// Wrap a loaded encoder
    #[must_use]
    pub const fn new(encoder: Encoder) -> Self {
        let keyed = encoder.is_keyed();
        Self {
            encoder,
            keyed,
            symbols_sent: 0,
            finished: false,
        }
    }

    /// Symbols output so far
    #[must_use]
    pub const fn symbols_sent(&self) -> u32 {
        self.symbols_sent
    }

    /// Check if the encoder has ended
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Output one symbol; returns `false` once the encoder has ended
    pub fn step<S: SymbolSink>(&mut self, sink: &mut S) -> bool {
        let Some(tone) = self.encoder.next_tone() else {
            self.finished = true;
            return false;
        };
        let symbol = if self.keyed {
            Symbol::Key(tone != 0)
        } else {
            let offset = self
                .encoder
                .tone_catalog()
                .get(usize::from(tone))
                .copied()
                .unwrap_or(0);
            Symbol::Offset(offset)
        };
        sink.emit(symbol);
        self.symbols_sent += 1;
        true
    }
}

/// Claim the bus and tick, install the job and start the symbol timer
pub fn start<B: Board>(
    rt: &mut RealTime<B>,
    backend: BackendKind,
    encoder: Encoder,
    period_us: u32,
) {
    rt.bus.to_bitbang();
    rt.sink.bind(backend);
    rt.tick.suspend();
    rt.job = Some(IsrJob::Toggle(ToggleJob::new(encoder)));
    rt.timer.start(period_us);
}
