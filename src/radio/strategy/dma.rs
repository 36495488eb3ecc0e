//! DMA waveform strategy
//!
//! The tone is a square wave on the PWM pin. A circular DMA stream writes
//! one PWM period per timer update (half a tone cycle) from a two-half buffer; each half is
//! refilled from the encoder as soon as the DMA has consumed it. After the
//! encoder ends, the buffer is padded with silence and the stream keeps
//! running for [`DMA_GRACE_TRANSFERS`] more transfers so the queued
//! symbols still go out.

use crate::config::DMA_GRACE_TRANSFERS;
use crate::dsp::waveform::{SymbolWave, WaveformSynth};
use crate::encoder::{Encoder, ToneEncoder};
use crate::radio::peripheral::{Board, BusHandoff, WaveformPwm};
use crate::radio::realtime::{IsrJob, RealTime};

/// Encoder and waveform state owned by the DMA interrupts
#[derive(Debug)]
pub struct WaveformJob {
    encoder: Encoder,
    synth: WaveformSynth,
    current: SymbolWave,
    /// Updates of `current` not yet written
    updates_left: u32,
    ended: bool,
    grace: u8,
    finished: bool,
    symbols_sent: u32,
}

impl WaveformJob {
    /// Wrap a loaded encoder
    #[must_use]
    pub const fn new(encoder: Encoder, synth: WaveformSynth) -> Self {
        Self {
            encoder,
            synth,
            current: SymbolWave {
                period: 0,
                updates: 0,
            },
            updates_left: 0,
            ended: false,
            grace: 0,
            finished: false,
            symbols_sent: 0,
        }
    }

    /// Symbols written to the buffer so far
    #[must_use]
    pub const fn symbols_sent(&self) -> u32 {
        self.symbols_sent
    }

    /// Check if the encoder has ended
    #[must_use]
    pub const fn is_ended(&self) -> bool {
        self.ended
    }

    /// Grace transfers left before the stream stops
    #[must_use]
    pub const fn grace_left(&self) -> u8 {
        self.grace
    }

    /// Check if the stream has been stopped
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Fill `slots` with PWM periods, padding with silence after the end
    pub fn fill(&mut self, slots: &mut [u16]) {
        for slot in slots.iter_mut() {
            *slot = self.next_period();
        }
    }

    /// Handle one consumed half-buffer
    ///
    /// Refills it, or counts down the grace transfers once the encoder has
    /// ended. Returns `true` when the stream must stop now.
    pub fn refill(&mut self, slots: &mut [u16]) -> bool {
        if self.finished {
            return false;
        }
        if !self.ended {
            self.fill(slots);
            return false;
        }
        slots.fill(0);
        self.grace = self.grace.saturating_sub(1);
        if self.grace == 0 {
            self.finished = true;
        }
        self.finished
    }

    fn next_period(&mut self) -> u16 {
        loop {
            if self.updates_left > 0 {
                self.updates_left -= 1;
                return self.current.period;
            }
            if self.ended {
                return 0;
            }
            match self.encoder.next_tone() {
                Some(tone) => {
                    let tone_centihz = self
                        .encoder
                        .tone_catalog()
                        .get(usize::from(tone))
                        .copied()
                        .unwrap_or(0);
                    self.current = self.synth.symbol(tone_centihz);
                    self.updates_left = self.current.updates;
                    self.symbols_sent += 1;
                }
                None => {
                    self.ended = true;
                    self.grace = DMA_GRACE_TRANSFERS;
                }
            }
        }
    }
}

/// Claim the bus, prefill both halves and start the DMA stream
pub fn start<B: Board>(rt: &mut RealTime<B>, encoder: Encoder, synth: WaveformSynth) {
    let mut job = WaveformJob::new(encoder, synth);
    job.fill(&mut rt.dma_buffer);
    rt.bus.to_bitbang();
    rt.job = Some(IsrJob::Waveform(job));
    rt.pwm.start_dma(&rt.dma_buffer);
}
