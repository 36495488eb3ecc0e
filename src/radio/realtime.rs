//! Peripherals shared between the main loop and interrupt handlers
//!
//! [`RealTime`] owns the timer, PWM/DMA and bus peripherals plus the job
//! an interrupt-driven strategy is running. It lives behind a
//! `critical_section::Mutex`, so the main loop and the interrupt entry
//! points below never touch it at the same time.
//!
//! Interrupt handlers on the target call [`SharedRealTime::on_symbol_timer`],
//! [`SharedRealTime::on_dma_half_transfer`] and
//! [`SharedRealTime::on_dma_transfer_complete`].

use core::cell::RefCell;

use critical_section::Mutex;

use super::peripheral::{Board, SymbolTimer, SystemTick, WaveformPwm};
use super::signals::TxSignals;
use super::strategy::dma::WaveformJob;
use super::strategy::interrupt::ToggleJob;
use crate::config::DMA_BUFFER_LEN;

/// Half of the circular DMA buffer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Half {
    /// Entries `0..DMA_BUFFER_LEN / 2`
    First,
    /// Entries `DMA_BUFFER_LEN / 2..`
    Second,
}

/// Work owned by interrupt context for the transmission in progress
#[derive(Debug)]
pub enum IsrJob {
    /// Symbol timer driven output
    Toggle(ToggleJob),
    /// DMA waveform refill
    Waveform(WaveformJob),
}

impl IsrJob {
    /// Symbols output so far
    #[must_use]
    pub const fn symbols_sent(&self) -> u32 {
        match self {
            Self::Toggle(job) => job.symbols_sent(),
            Self::Waveform(job) => job.symbols_sent(),
        }
    }
}

/// Real-time peripherals and the interrupt-owned job
pub struct RealTime<B: Board> {
    pub(crate) tick: B::Tick,
    pub(crate) timer: B::Timer,
    pub(crate) sink: B::Sink,
    pub(crate) pwm: B::Pwm,
    pub(crate) bus: B::Bus,
    pub(crate) delay: B::Delay,
    pub(crate) job: Option<IsrJob>,
    pub(crate) dma_buffer: [u16; DMA_BUFFER_LEN],
}

impl<B: Board> RealTime<B> {
    /// Bundle the board peripherals
    pub fn new(
        tick: B::Tick,
        timer: B::Timer,
        sink: B::Sink,
        pwm: B::Pwm,
        bus: B::Bus,
        delay: B::Delay,
    ) -> Self {
        Self {
            tick,
            timer,
            sink,
            pwm,
            bus,
            delay,
            job: None,
            dma_buffer: [0; DMA_BUFFER_LEN],
        }
    }

    /// System tick
    pub fn tick(&self) -> &B::Tick {
        &self.tick
    }

    /// Symbol timer
    pub fn timer(&self) -> &B::Timer {
        &self.timer
    }

    /// Symbol output path
    pub fn sink(&self) -> &B::Sink {
        &self.sink
    }

    /// Waveform PWM
    pub fn pwm(&self) -> &B::Pwm {
        &self.pwm
    }

    /// SPI bus handoff
    pub fn bus(&self) -> &B::Bus {
        &self.bus
    }

    /// Busy-wait delay
    pub fn delay(&self) -> &B::Delay {
        &self.delay
    }

    /// Current DMA buffer contents
    pub fn dma_buffer(&self) -> &[u16] {
        &self.dma_buffer
    }

    /// Check if an interrupt job is installed
    pub fn has_job(&self) -> bool {
        self.job.is_some()
    }

    /// Stop every interrupt source and remove the job
    ///
    /// Returns the number of symbols the job output.
    pub(crate) fn stop_job(&mut self) -> u32 {
        match self.job.take() {
            Some(IsrJob::Toggle(job)) => {
                self.timer.stop();
                job.symbols_sent()
            }
            Some(IsrJob::Waveform(job)) => {
                self.pwm.stop_dma();
                self.pwm.stop();
                job.symbols_sent()
            }
            None => 0,
        }
    }

    fn symbol_timer_fired(&mut self, signals: &TxSignals) {
        let Some(IsrJob::Toggle(job)) = &mut self.job else {
            return;
        };
        if job.is_finished() {
            return;
        }
        if !job.step(&mut self.sink) {
            self.timer.stop();
            self.tick.resume();
            signals.signal_tx_finished();
        }
    }

    fn dma_transfer_done(&mut self, half: Half, signals: &TxSignals) {
        let Some(IsrJob::Waveform(job)) = &mut self.job else {
            return;
        };
        let middle = DMA_BUFFER_LEN / 2;
        let slots = match half {
            Half::First => &mut self.dma_buffer[..middle],
            Half::Second => &mut self.dma_buffer[middle..],
        };
        if job.refill(slots) {
            self.pwm.stop_dma();
            self.pwm.stop();
            signals.signal_tx_finished();
        }
    }
}

/// [`RealTime`] behind a critical-section mutex, installed at startup
pub struct SharedRealTime<B: Board>(Mutex<RefCell<Option<RealTime<B>>>>);

impl<B: Board> SharedRealTime<B> {
    /// Empty slot, usable in a `static`
    #[must_use]
    pub const fn new() -> Self {
        Self(Mutex::new(RefCell::new(None)))
    }

    /// Slot holding `realtime`
    #[must_use]
    pub const fn with_realtime(realtime: RealTime<B>) -> Self {
        Self(Mutex::new(RefCell::new(Some(realtime))))
    }

    /// Hand the peripherals over
    pub fn install(&self, realtime: RealTime<B>) {
        critical_section::with(|cs| {
            self.0.borrow_ref_mut(cs).replace(realtime);
        });
    }

    /// Run `f` on the peripherals inside a critical section
    ///
    /// Returns `None` if nothing is installed.
    pub fn with<R>(&self, f: impl FnOnce(&mut RealTime<B>) -> R) -> Option<R> {
        critical_section::with(|cs| self.0.borrow_ref_mut(cs).as_mut().map(f))
    }

    /// Symbol timer update interrupt
    pub fn on_symbol_timer(&self, signals: &TxSignals) {
        self.with(|rt| rt.symbol_timer_fired(signals));
    }

    /// DMA half-transfer interrupt
    pub fn on_dma_half_transfer(&self, signals: &TxSignals) {
        self.with(|rt| rt.dma_transfer_done(Half::First, signals));
    }

    /// DMA transfer-complete interrupt
    pub fn on_dma_transfer_complete(&self, signals: &TxSignals) {
        self.with(|rt| rt.dma_transfer_done(Half::Second, signals));
    }
}

impl<B: Board> Default for SharedRealTime<B> {
    fn default() -> Self {
        Self::new()
    }
}
