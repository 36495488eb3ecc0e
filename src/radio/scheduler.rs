//! Transmission Scheduler
//!
//! Cooperative state machine stepped from the main loop:
//!
//! ```text
//!   Idle ──delay elapsed──► PayloadReady ──sync window──► TxStarting
//!    ▲                                                      │
//!    │                                             start ok │ start failed
//!    │                                                      ▼       │
//!  TxStopped ◄── TxFinishing ◄──── strategy done ──── TxActive      │
//!    ▲                                                              │
//!    └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every entry consumes one schedule slot whether it completed or not, and
//! the delay of the following entry is armed on the way back to `Idle`.

use super::backend::{BackendError, BackendSet, Modulation};
use super::peripheral::{Board, BusHandoff, SystemTick};
use super::realtime::SharedRealTime;
use super::schedule::{ScheduleCursor, ScheduleEntry, ScheduleError};
use super::session::{RadioBackendSession, Strategy};
use super::signals::TxSignals;
use super::strategy::fifo::{FifoOutcome, FifoStream};
use super::strategy::stepped::TickStepper;
use super::strategy::{busy_wait, dma, interrupt};
use super::symbol_clock::SymbolClock;
use crate::config::{calibration, ms_to_ticks, PWM_TIMER_CLOCK_HZ, SYSTEM_TICK_HZ};
use crate::dsp::waveform::WaveformSynth;
use crate::encoder::{Encoder, EncoderError, Payload, ToneEncoder};
use crate::telemetry::{PayloadError, TelemetrySource};
use crate::types::{BackendKind, DataMode, SymbolTiming};

/// Scheduler state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TxState {
    /// Waiting for the entry's delay to elapse
    #[default]
    Idle,
    /// Delay elapsed, waiting for the time-sync window
    PayloadReady,
    /// Payload and encoder ready, configuring the backend
    TxStarting,
    /// Strategy running
    TxActive,
    /// Releasing resources
    TxFinishing,
    /// Reporting and advancing the cursor
    TxStopped,
}

#[cfg(feature = "embedded")]
impl defmt::Format for TxState {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Idle => defmt::write!(f, "IDLE"),
            Self::PayloadReady => defmt::write!(f, "PAYLOAD_READY"),
            Self::TxStarting => defmt::write!(f, "TX_STARTING"),
            Self::TxActive => defmt::write!(f, "TX_ACTIVE"),
            Self::TxFinishing => defmt::write!(f, "TX_FINISHING"),
            Self::TxStopped => defmt::write!(f, "TX_STOPPED"),
        }
    }
}

/// Why a transmission did not complete
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AbortReason {
    /// The payload producer failed
    Payload(PayloadError),
    /// The encoder rejected the payload
    Encoder(EncoderError),
    /// The encoder does not fit the selected strategy
    EncoderMismatch,
    /// No strategy exists for this mode on this backend
    UnsupportedMode {
        /// Requested backend
        backend: BackendKind,
        /// Requested mode
        mode: DataMode,
    },
    /// The backend is not fitted
    BackendMissing(BackendKind),
    /// The real-time peripherals are not installed
    NoPeripherals,
    /// A backend command failed
    Backend(BackendError),
    /// The radio FIFO ran dry
    FifoUnderflow,
    /// The transmission did not finish in time
    Timeout,
}

#[cfg(feature = "embedded")]
impl defmt::Format for AbortReason {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Payload(e) => defmt::write!(f, "payload: {}", e),
            Self::Encoder(e) => defmt::write!(f, "encoder: {}", e),
            Self::EncoderMismatch => defmt::write!(f, "encoder does not fit strategy"),
            Self::UnsupportedMode { backend, mode } => {
                defmt::write!(f, "{} unsupported on {}", mode, backend);
            }
            Self::BackendMissing(kind) => defmt::write!(f, "{} not fitted", kind),
            Self::NoPeripherals => defmt::write!(f, "no peripherals"),
            Self::Backend(e) => defmt::write!(f, "backend: {}", e),
            Self::FifoUnderflow => defmt::write!(f, "FIFO underflow"),
            Self::Timeout => defmt::write!(f, "timeout"),
        }
    }
}

/// Result of one transmission
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxOutcome {
    /// All symbols went out
    Completed,
    /// The transmission stopped early or never started
    Aborted(AbortReason),
}

#[cfg(feature = "embedded")]
impl defmt::Format for TxOutcome {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Completed => defmt::write!(f, "completed"),
            Self::Aborted(reason) => defmt::write!(f, "aborted ({})", reason),
        }
    }
}

/// Diagnostics of the last transmission
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TxReport {
    /// Schedule index
    pub entry: usize,
    /// Backend used
    pub backend: BackendKind,
    /// Data mode
    pub mode: DataMode,
    /// Strategy, `None` if selection failed
    pub strategy: Option<Strategy>,
    /// Outcome
    pub outcome: TxOutcome,
    /// Symbols output
    pub symbols_sent: u32,
    /// Bytes streamed to a FIFO
    pub bytes_streamed: usize,
    /// System ticks from payload production to the end
    pub elapsed_ticks: u32,
}

/// Running totals
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Counters {
    /// Transmissions that completed
    pub completed: u32,
    /// Transmissions that aborted
    pub aborted: u32,
}

/// Main-loop side of the strategy in progress
#[derive(Clone, Copy, Debug)]
enum Active {
    /// Interrupt context owns the encoder; wait for the finished latch
    Isr,
    /// Calibrated loop, run to completion on the next pass
    BusyWait { symbol_delay_us: u32 },
    Fifo(FifoStream),
    Stepped(TickStepper),
}

/// Round-robin transmission scheduler
pub struct Scheduler<'a, B: Board, R: BackendSet, T: TelemetrySource> {
    schedule: &'a [ScheduleEntry<'a>],
    cursor: ScheduleCursor,
    state: TxState,
    signals: &'a TxSignals,
    realtime: &'a SharedRealTime<B>,
    backends: R,
    telemetry: T,
    payload: Payload,
    /// Encoder for main-loop strategies (moved out for interrupt ones)
    encoder: Option<Encoder>,
    session: Option<RadioBackendSession>,
    active: Option<Active>,
    strategy: Option<Strategy>,
    outcome: Option<TxOutcome>,
    symbols_sent: u32,
    bytes_streamed: usize,
    entry_started: u32,
    sync_warned: bool,
    last_report: Option<TxReport>,
    counters: Counters,
}

impl<'a, B, R, T> Scheduler<'a, B, R, T>
where
    B: Board,
    R: BackendSet,
    T: TelemetrySource,
{
    /// Create a scheduler at the first entry, in `Idle`
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::Empty`] for an empty schedule.
    pub fn new(
        schedule: &'a [ScheduleEntry<'a>],
        signals: &'a TxSignals,
        realtime: &'a SharedRealTime<B>,
        backends: R,
        telemetry: T,
    ) -> Result<Self, ScheduleError> {
        let cursor = ScheduleCursor::new(schedule.len())?;
        Ok(Self {
            schedule,
            cursor,
            state: TxState::Idle,
            signals,
            realtime,
            backends,
            telemetry,
            payload: Payload::new(),
            encoder: None,
            session: None,
            active: None,
            strategy: None,
            outcome: None,
            symbols_sent: 0,
            bytes_streamed: 0,
            entry_started: 0,
            sync_warned: false,
            last_report: None,
            counters: Counters::default(),
        })
    }

    /// Arm the first entry's delay
    pub fn start(&mut self) {
        let entry = self.current_entry();
        info!("schedule of {} entries starting", self.schedule.len());
        self.signals.arm_post_tx_delay(ms_to_ticks(entry.post_tx_delay_ms));
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> TxState {
        self.state
    }

    /// Index of the current entry
    #[must_use]
    pub const fn current_index(&self) -> usize {
        self.cursor.index()
    }

    /// Active session, if a transmission is in progress
    #[must_use]
    pub const fn session(&self) -> Option<&RadioBackendSession> {
        self.session.as_ref()
    }

    /// Report of the last finished transmission
    #[must_use]
    pub const fn last_report(&self) -> Option<&TxReport> {
        self.last_report.as_ref()
    }

    /// Completed and aborted totals
    #[must_use]
    pub const fn counters(&self) -> Counters {
        self.counters
    }

    /// Fitted backends
    pub const fn backends(&self) -> &R {
        &self.backends
    }

    /// Fitted backends, mutably
    pub fn backends_mut(&mut self) -> &mut R {
        &mut self.backends
    }

    /// Telemetry source, mutably
    pub fn telemetry_mut(&mut self) -> &mut T {
        &mut self.telemetry
    }

    fn current_entry(&self) -> &'a ScheduleEntry<'a> {
        let schedule: &'a [ScheduleEntry<'a>] = self.schedule;
        &schedule[self.cursor.index()]
    }

    /// One cooperative main-loop step
    pub fn poll(&mut self) {
        match self.state {
            TxState::Idle => {
                if self.signals.take_post_tx_delay_elapsed() {
                    self.set_state(TxState::PayloadReady);
                }
            }
            TxState::PayloadReady => self.poll_payload_ready(),
            TxState::TxStarting => match self.start_transmission() {
                Ok(()) => self.set_state(TxState::TxActive),
                Err(reason) => {
                    self.release();
                    self.abort(reason);
                }
            },
            TxState::TxActive => self.poll_active(),
            TxState::TxFinishing => {
                self.release();
                self.set_state(TxState::TxStopped);
            }
            TxState::TxStopped => self.finish_entry(),
        }
    }

    fn set_state(&mut self, state: TxState) {
        trace!("scheduler {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    fn abort(&mut self, reason: AbortReason) {
        error!("entry {} aborted: {:?}", self.cursor.index(), reason);
        self.outcome = Some(TxOutcome::Aborted(reason));
        self.set_state(TxState::TxStopped);
    }

    fn poll_payload_ready(&mut self) {
        let entry = self.current_entry();
        if entry.time_sync.is_enabled() {
            match self.telemetry.time_of_week_ms() {
                Some(tow) if !entry.time_sync.is_open(tow) => return,
                Some(_) => {}
                None => {
                    if !self.sync_warned {
                        warn!("no GPS time, entry {} sent unsynchronised", self.cursor.index());
                        self.sync_warned = true;
                    }
                }
            }
        }
        self.sync_warned = false;

        self.entry_started = self.signals.ticks();
        self.symbols_sent = 0;
        self.bytes_streamed = 0;
        self.strategy = Strategy::select(entry.backend, entry.mode);

        let snapshot = self.telemetry.snapshot();
        self.payload.clear();
        if let Err(e) = entry.producer.encode(&snapshot, entry.template, &mut self.payload) {
            self.abort(AbortReason::Payload(e));
            return;
        }
        let mut encoder = entry.encoder.build();
        if let Err(e) = encoder.set_data(&self.payload) {
            self.abort(AbortReason::Encoder(e));
            return;
        }
        debug!("entry {}: {} payload bytes", self.cursor.index(), self.payload.len());
        self.encoder = Some(encoder);
        self.set_state(TxState::TxStarting);
    }

    fn start_transmission(&mut self) -> Result<(), AbortReason> {
        let entry = self.current_entry();
        let kind = entry.backend;
        let strategy = self.strategy.ok_or(AbortReason::UnsupportedMode {
            backend: kind,
            mode: entry.mode,
        })?;
        let encoder = self.encoder.take().ok_or(AbortReason::EncoderMismatch)?;
        let timing = encoder.timing();
        let fits = match strategy {
            Strategy::FifoStream => encoder.raw_data().is_some(),
            Strategy::DmaWaveform | Strategy::BusyWait => {
                matches!(timing, Some(SymbolTiming::Rate(_)))
            }
            Strategy::InterruptToggle | Strategy::TickStepped => timing.is_some(),
        };
        if !fits {
            return Err(AbortReason::EncoderMismatch);
        }
        let keyed = encoder.is_keyed();

        let backend = self
            .backends
            .backend(kind)
            .ok_or(AbortReason::BackendMissing(kind))?;
        info!(
            "entry {}: {:?} on {:?} via {:?}",
            self.cursor.index(),
            entry.mode,
            kind,
            strategy
        );

        // Open the session before the first command so any failure from
        // here on is followed by a disable
        let now = self.signals.ticks();
        let mut session = RadioBackendSession::new(kind, entry.mode, strategy, now);
        self.session = Some(session);

        backend.set_frequency(entry.frequency).map_err(AbortReason::Backend)?;
        backend.set_power(entry.power).map_err(AbortReason::Backend)?;
        backend
            .set_modulation(strategy.modulation(keyed))
            .map_err(AbortReason::Backend)?;
        // Keyed carriers stay off until the first key down; the FIFO
        // packet start turns the transmitter on by itself
        if strategy != Strategy::FifoStream && !keyed {
            backend.enable_tx().map_err(AbortReason::Backend)?;
        }

        let realtime = self.realtime;
        let active = match strategy {
            Strategy::InterruptToggle => {
                let period_us = timing.map_or(0, SymbolTiming::period_us);
                realtime
                    .with(|rt| interrupt::start(rt, kind, encoder, period_us))
                    .ok_or(AbortReason::NoPeripherals)?;
                session.mark_bus_bitbang();
                session.mark_tick_suspended();
                Active::Isr
            }
            Strategy::DmaWaveform => {
                let rate = encoder.symbol_rate();
                let synth = WaveformSynth::new(PWM_TIMER_CLOCK_HZ, rate);
                realtime
                    .with(|rt| dma::start(rt, encoder, synth))
                    .ok_or(AbortReason::NoPeripherals)?;
                session.mark_bus_bitbang();
                Active::Isr
            }
            Strategy::BusyWait => {
                let symbol_delay_us = calibration::busy_wait_symbol_delay_us(encoder.symbol_rate());
                realtime
                    .with(busy_wait::start)
                    .ok_or(AbortReason::NoPeripherals)?;
                session.mark_bus_bitbang();
                session.mark_tick_suspended();
                self.encoder = Some(encoder);
                Active::BusyWait { symbol_delay_us }
            }
            Strategy::FifoStream => {
                let data = encoder.raw_data().unwrap_or_default();
                let radio = backend
                    .fifo()
                    .ok_or(AbortReason::Backend(BackendError::Unsupported))?;
                let stream = FifoStream::start(radio, data, now).map_err(AbortReason::Backend)?;
                self.encoder = Some(encoder);
                Active::Fifo(stream)
            }
            Strategy::TickStepped => {
                let clock = timing
                    .and_then(|t| SymbolClock::new(t, SYSTEM_TICK_HZ))
                    .ok_or(AbortReason::EncoderMismatch)?;
                let stepper = TickStepper::start(clock, entry.frequency, keyed, self.signals);
                self.encoder = Some(encoder);
                Active::Stepped(stepper)
            }
        };
        self.session = Some(session);
        self.active = Some(active);
        Ok(())
    }

    fn poll_active(&mut self) {
        let Some(active) = self.active else {
            self.set_state(TxState::TxFinishing);
            return;
        };
        let done = match active {
            Active::Isr => self.signals.take_tx_finished().then_some(TxOutcome::Completed),
            Active::BusyWait { symbol_delay_us } => {
                if let Some(encoder) = self.encoder.as_mut() {
                    self.symbols_sent = busy_wait::run(self.realtime, encoder, symbol_delay_us);
                }
                Some(TxOutcome::Completed)
            }
            Active::Fifo(mut stream) => {
                let outcome = self.poll_fifo(&mut stream);
                self.bytes_streamed = stream.bytes_written();
                self.active = Some(Active::Fifo(stream));
                outcome
            }
            Active::Stepped(mut stepper) => {
                let outcome = self.poll_stepped(&mut stepper);
                self.symbols_sent = stepper.symbols_sent();
                self.active = Some(Active::Stepped(stepper));
                outcome
            }
        };
        if let Some(outcome) = done {
            self.outcome = Some(outcome);
            self.set_state(TxState::TxFinishing);
        }
    }

    fn poll_fifo(&mut self, stream: &mut FifoStream) -> Option<TxOutcome> {
        let kind = self.current_entry().backend;
        let data = self
            .encoder
            .as_ref()
            .and_then(Encoder::raw_data)
            .unwrap_or_default();
        let now = self.signals.ticks();
        let Some(radio) = self.backends.backend(kind).and_then(|b| b.fifo()) else {
            return Some(TxOutcome::Aborted(AbortReason::BackendMissing(kind)));
        };
        let outcome = match stream.poll(radio, data, now)? {
            FifoOutcome::Completed { .. } => TxOutcome::Completed,
            FifoOutcome::Underflow { .. } => TxOutcome::Aborted(AbortReason::FifoUnderflow),
            FifoOutcome::Timeout { .. } => TxOutcome::Aborted(AbortReason::Timeout),
            FifoOutcome::Error(e) => TxOutcome::Aborted(AbortReason::Backend(e)),
        };
        Some(outcome)
    }

    fn poll_stepped(&mut self, stepper: &mut TickStepper) -> Option<TxOutcome> {
        let kind = self.current_entry().backend;
        let Some(backend) = self.backends.backend(kind) else {
            return Some(TxOutcome::Aborted(AbortReason::BackendMissing(kind)));
        };
        let Some(encoder) = self.encoder.as_mut() else {
            return Some(TxOutcome::Aborted(AbortReason::EncoderMismatch));
        };
        match stepper.poll(backend, encoder, self.signals) {
            Ok(true) => None,
            Ok(false) => Some(TxOutcome::Completed),
            Err(e) => Some(TxOutcome::Aborted(AbortReason::Backend(e))),
        }
    }

    /// Give back everything the session claimed
    ///
    /// Order: stop the strategy, hand the SPI bus back, disable the
    /// transmitter, resume the tick. Safe to call without a session.
    fn release(&mut self) {
        let active = self.active.take();
        self.encoder = None;
        let Some(session) = self.session.take() else {
            return;
        };

        match active {
            Some(Active::Isr) => {
                if let Some(sent) = self.realtime.with(|rt| rt.stop_job()) {
                    self.symbols_sent = sent;
                }
            }
            Some(Active::Stepped(_)) => self.signals.disarm_next_symbol(),
            Some(Active::BusyWait { .. } | Active::Fifo(_)) | None => {}
        }

        if session.bus_bitbang() {
            self.realtime.with(|rt| rt.bus.restore());
        }

        if let Some(backend) = self.backends.backend(session.backend()) {
            if let Err(e) = backend.disable_tx() {
                warn!("disable {:?} failed: {:?}", session.backend(), e);
            }
            if let Err(e) = backend.set_modulation(Modulation::None) {
                warn!("modulation reset on {:?} failed: {:?}", session.backend(), e);
            }
        }

        if session.tick_suspended() {
            self.realtime.with(|rt| {
                if rt.tick.is_suspended() {
                    rt.tick.resume();
                }
            });
        }

        // A latch raised after the strategy was stopped must not leak
        let _ = self.signals.take_tx_finished();
    }

    fn finish_entry(&mut self) {
        let entry = self.current_entry();
        let outcome = self.outcome.take().unwrap_or(TxOutcome::Completed);
        let report = TxReport {
            entry: self.cursor.index(),
            backend: entry.backend,
            mode: entry.mode,
            strategy: self.strategy.take(),
            outcome,
            symbols_sent: self.symbols_sent,
            bytes_streamed: self.bytes_streamed,
            elapsed_ticks: self.signals.ticks().wrapping_sub(self.entry_started),
        };
        match outcome {
            TxOutcome::Completed => {
                self.counters.completed = self.counters.completed.wrapping_add(1);
                info!(
                    "entry {} done: {} symbols, {} bytes, {} ticks",
                    report.entry,
                    report.symbols_sent,
                    report.bytes_streamed,
                    report.elapsed_ticks
                );
            }
            TxOutcome::Aborted(_) => {
                self.counters.aborted = self.counters.aborted.wrapping_add(1);
            }
        }
        self.last_report = Some(report);

        self.cursor.complete(entry.repeat);
        let next = self.current_entry();
        self.signals.arm_post_tx_delay(ms_to_ticks(next.post_tx_delay_ms));
        self.set_state(TxState::Idle);
    }
}
