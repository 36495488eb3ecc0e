//! Host mocks shared by the integration tests
//!
//! Every mock appends to one shared event log so tests can check the order
//! in which the engine touches hardware.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use beacon_firmware::encoder::Payload;
use beacon_firmware::radio::backend::{
    BackendError, Backends, ChipState, FifoRadio, Modulation, RadioBackend,
};
use beacon_firmware::radio::peripheral::{
    Board, BusHandoff, Symbol, SymbolSink, SymbolTimer, SystemTick, WaveformPwm,
};
use beacon_firmware::radio::realtime::{RealTime, SharedRealTime};
use beacon_firmware::radio::scheduler::Scheduler;
use beacon_firmware::radio::signals::TxSignals;
use beacon_firmware::telemetry::{PayloadError, TelemetrySnapshot, TelemetrySource};
use beacon_firmware::types::{BackendKind, Frequency, PowerLevel};
use embedded_hal::delay::DelayNs;

/// Something the engine did to the hardware
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    TickSuspend,
    TickResume,
    TimerStart(u32),
    TimerStop,
    Bind(BackendKind),
    Emit(Symbol),
    PwmPeriod(u16),
    DmaStart(usize),
    DmaStop,
    PwmStop,
    BusBitbang,
    BusRestore,
    Delay(u32),
    Radio(BackendKind, Command),
}

/// Backend command
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Frequency(u64),
    Power(u8),
    Modulation(Modulation),
    Enable,
    Disable,
}

pub type Log = Rc<RefCell<Vec<Event>>>;

pub fn new_log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

/// Position of the first event matching `f`
pub fn position(log: &Log, f: impl Fn(&Event) -> bool) -> Option<usize> {
    log.borrow().iter().position(f)
}

/// Position of the last event matching `f`
pub fn last_position(log: &Log, f: impl Fn(&Event) -> bool) -> Option<usize> {
    log.borrow().iter().rposition(f)
}

pub fn count(log: &Log, event: &Event) -> usize {
    log.borrow().iter().filter(|e| *e == event).count()
}

// =============================================================================
// Real-time peripherals
// =============================================================================

pub struct MockTick {
    log: Log,
    suspended: bool,
}

impl SystemTick for MockTick {
    fn suspend(&mut self) {
        self.log.borrow_mut().push(Event::TickSuspend);
        self.suspended = true;
    }

    fn resume(&mut self) {
        self.log.borrow_mut().push(Event::TickResume);
        self.suspended = false;
    }

    fn is_suspended(&self) -> bool {
        self.suspended
    }
}

pub struct MockTimer {
    log: Log,
    pub running: bool,
}

impl SymbolTimer for MockTimer {
    fn start(&mut self, period_us: u32) {
        self.log.borrow_mut().push(Event::TimerStart(period_us));
        self.running = true;
    }

    fn stop(&mut self) {
        self.log.borrow_mut().push(Event::TimerStop);
        self.running = false;
    }
}

pub struct MockSink {
    log: Log,
}

impl SymbolSink for MockSink {
    fn bind(&mut self, backend: BackendKind) {
        self.log.borrow_mut().push(Event::Bind(backend));
    }

    fn emit(&mut self, symbol: Symbol) {
        self.log.borrow_mut().push(Event::Emit(symbol));
    }
}

pub struct MockPwm {
    log: Log,
    pub dma_running: bool,
}

impl WaveformPwm for MockPwm {
    fn set_period(&mut self, period: u16) {
        self.log.borrow_mut().push(Event::PwmPeriod(period));
    }

    fn start_dma(&mut self, buffer: &[u16]) {
        self.log.borrow_mut().push(Event::DmaStart(buffer.len()));
        self.dma_running = true;
    }

    fn stop_dma(&mut self) {
        self.log.borrow_mut().push(Event::DmaStop);
        self.dma_running = false;
    }

    fn stop(&mut self) {
        self.log.borrow_mut().push(Event::PwmStop);
    }
}

pub struct MockBus {
    log: Log,
    bitbang: bool,
}

impl BusHandoff for MockBus {
    fn to_bitbang(&mut self) {
        self.log.borrow_mut().push(Event::BusBitbang);
        self.bitbang = true;
    }

    fn restore(&mut self) {
        self.log.borrow_mut().push(Event::BusRestore);
        self.bitbang = false;
    }

    fn is_bitbang(&self) -> bool {
        self.bitbang
    }
}

pub struct MockDelay {
    log: Log,
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.log.borrow_mut().push(Event::Delay(ns / 1_000));
    }

    fn delay_us(&mut self, us: u32) {
        self.log.borrow_mut().push(Event::Delay(us));
    }
}

pub struct MockBoard;

impl Board for MockBoard {
    type Tick = MockTick;
    type Timer = MockTimer;
    type Sink = MockSink;
    type Pwm = MockPwm;
    type Bus = MockBus;
    type Delay = MockDelay;
}

pub fn realtime(log: &Log) -> SharedRealTime<MockBoard> {
    SharedRealTime::with_realtime(RealTime::new(
        MockTick {
            log: log.clone(),
            suspended: false,
        },
        MockTimer {
            log: log.clone(),
            running: false,
        },
        MockSink { log: log.clone() },
        MockPwm {
            log: log.clone(),
            dma_running: false,
        },
        MockBus {
            log: log.clone(),
            bitbang: false,
        },
        MockDelay { log: log.clone() },
    ))
}

// =============================================================================
// Radio backends
// =============================================================================

/// FIFO model: the chip drains a fixed number of bytes between polls
#[derive(Debug, Default)]
pub struct MockFifo {
    pub capacity: usize,
    pub drain_per_poll: usize,
    pub queued: usize,
    pub written: Vec<u8>,
    pub packet_len: Option<usize>,
    pub state: Option<ChipState>,
    pub requests: Vec<ChipState>,
    /// Raise the underflow flag once this many bytes have been written
    pub underflow_after: Option<usize>,
    /// Latch the underflow flag on this `fifo_space` call (1-based)
    pub underflow_on_space_poll: Option<usize>,
    pub space_polls: usize,
    pub underflow_latched: bool,
    /// Stay in TX after the packet is sent
    pub hang_in_tx: bool,
    pub writes_after_underflow: usize,
}

impl MockFifo {
    pub fn new(capacity: usize, drain_per_poll: usize) -> Self {
        Self {
            capacity,
            drain_per_poll,
            ..Self::default()
        }
    }

    fn underflowed(&self) -> bool {
        self.underflow_latched
            || self
                .underflow_after
                .is_some_and(|limit| self.written.len() >= limit)
    }
}

impl FifoRadio for MockFifo {
    fn fifo_write(&mut self, data: &[u8]) -> Result<(), BackendError> {
        if self.underflowed() {
            self.writes_after_underflow += 1;
        }
        assert!(self.queued + data.len() <= self.capacity, "FIFO overrun");
        self.written.extend_from_slice(data);
        self.queued += data.len();
        Ok(())
    }

    fn fifo_space(&mut self) -> Result<usize, BackendError> {
        self.space_polls += 1;
        if self.underflow_on_space_poll == Some(self.space_polls) {
            self.underflow_latched = true;
        }
        if self.packet_len.is_some() {
            self.queued = self.queued.saturating_sub(self.drain_per_poll);
        }
        Ok(self.capacity - self.queued)
    }

    fn fifo_underflow(&mut self) -> Result<bool, BackendError> {
        Ok(self.underflowed())
    }

    fn start_fifo_tx(&mut self, len: usize) -> Result<(), BackendError> {
        self.packet_len = Some(len);
        self.state = Some(ChipState::Tx);
        Ok(())
    }

    fn request_state(&mut self, state: ChipState) -> Result<(), BackendError> {
        self.requests.push(state);
        self.state = Some(state);
        Ok(())
    }

    fn read_state(&mut self) -> Result<ChipState, BackendError> {
        let sent = self.packet_len == Some(self.written.len());
        if sent && !self.hang_in_tx && self.state == Some(ChipState::Tx) {
            self.state = Some(ChipState::Ready);
        }
        Ok(self.state.unwrap_or(ChipState::Ready))
    }
}

/// Transmitter that records its commands
pub struct MockRadio {
    kind: BackendKind,
    log: Log,
    pub fail_enable: bool,
    pub fail_frequency: bool,
    pub enabled: bool,
    pub fifo: Option<MockFifo>,
}

impl MockRadio {
    pub fn new(kind: BackendKind, log: &Log) -> Self {
        Self {
            kind,
            log: log.clone(),
            fail_enable: false,
            fail_frequency: false,
            enabled: false,
            fifo: None,
        }
    }

    pub fn with_fifo(mut self, fifo: MockFifo) -> Self {
        self.fifo = Some(fifo);
        self
    }

    fn record(&self, command: Command) {
        self.log.borrow_mut().push(Event::Radio(self.kind, command));
    }
}

impl RadioBackend for MockRadio {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn set_frequency(&mut self, frequency: Frequency) -> Result<(), BackendError> {
        self.record(Command::Frequency(frequency.as_centihz()));
        if self.fail_frequency {
            return Err(BackendError::InvalidFrequency);
        }
        Ok(())
    }

    fn set_power(&mut self, power: PowerLevel) -> Result<(), BackendError> {
        self.record(Command::Power(power.as_percent()));
        Ok(())
    }

    fn set_modulation(&mut self, modulation: Modulation) -> Result<(), BackendError> {
        self.record(Command::Modulation(modulation));
        Ok(())
    }

    fn enable_tx(&mut self) -> Result<(), BackendError> {
        self.record(Command::Enable);
        if self.fail_enable {
            return Err(BackendError::Bus);
        }
        self.enabled = true;
        Ok(())
    }

    fn disable_tx(&mut self) -> Result<(), BackendError> {
        self.record(Command::Disable);
        self.enabled = false;
        Ok(())
    }

    fn fifo(&mut self) -> Option<&mut dyn FifoRadio> {
        self.fifo.as_mut().map(|f| f as &mut dyn FifoRadio)
    }
}

pub type MockBackends = Backends<MockRadio, MockRadio, MockRadio>;

/// All three transmitters fitted
pub fn all_backends(log: &Log) -> MockBackends {
    Backends::new()
        .with_si4032(MockRadio::new(BackendKind::Si4032, log))
        .with_si4063(MockRadio::new(BackendKind::Si4063, log))
        .with_si5351(MockRadio::new(BackendKind::Si5351, log))
}

// =============================================================================
// Telemetry
// =============================================================================

#[derive(Debug, Default)]
pub struct MockTelemetry {
    pub time_of_week_ms: Option<u32>,
    pub snapshots: u32,
}

impl TelemetrySource for MockTelemetry {
    fn snapshot(&mut self) -> TelemetrySnapshot {
        self.snapshots += 1;
        TelemetrySnapshot {
            sequence: self.snapshots as u16,
            ..TelemetrySnapshot::default()
        }
    }

    fn time_of_week_ms(&self) -> Option<u32> {
        self.time_of_week_ms
    }
}

/// Producer that always fails
pub fn failing_producer(
    _snapshot: &TelemetrySnapshot,
    _template: &str,
    _out: &mut Payload,
) -> Result<(), PayloadError> {
    Err(PayloadError::MissingTelemetry)
}

/// Producer that sends the template bytes
pub fn template_bytes(
    _snapshot: &TelemetrySnapshot,
    template: &str,
    out: &mut Payload,
) -> Result<(), PayloadError> {
    out.extend_from_slice(template.as_bytes())
        .map_err(|()| PayloadError::TooLong)
}

pub fn freq(hz: u32) -> Frequency {
    Frequency::from_hz(hz).expect("frequency in range")
}

// =============================================================================
// Simulated interrupts
// =============================================================================

/// Main loop plus the interrupts a real board would raise
///
/// Each step polls the scheduler, fires the symbol timer or DMA interrupt
/// if one is armed, then ticks the system tick unless it is suspended.
pub struct Harness<'a> {
    pub signals: &'a TxSignals,
    pub realtime: &'a SharedRealTime<MockBoard>,
    dma_half: bool,
    pub tick_while_suspended: u32,
}

impl<'a> Harness<'a> {
    pub fn new(signals: &'a TxSignals, realtime: &'a SharedRealTime<MockBoard>) -> Self {
        Self {
            signals,
            realtime,
            dma_half: true,
            tick_while_suspended: 0,
        }
    }

    pub fn interrupts(&mut self) {
        let (timer, dma) = self
            .realtime
            .with(|rt| (rt.timer().running, rt.pwm().dma_running))
            .unwrap_or((false, false));
        if timer {
            self.realtime.on_symbol_timer(self.signals);
        }
        if dma {
            if self.dma_half {
                self.realtime.on_dma_half_transfer(self.signals);
            } else {
                self.realtime.on_dma_transfer_complete(self.signals);
            }
            self.dma_half = !self.dma_half;
        }
        let suspended = self
            .realtime
            .with(|rt| rt.tick().is_suspended())
            .unwrap_or(false);
        if suspended {
            self.tick_while_suspended += 1;
        } else {
            self.signals.on_system_tick();
        }
    }

    /// Step until `done` holds, panicking after `limit` steps
    pub fn run_until<'s, R, T>(
        &mut self,
        scheduler: &mut Scheduler<'s, MockBoard, R, T>,
        limit: u32,
        mut done: impl FnMut(&Scheduler<'s, MockBoard, R, T>) -> bool,
    ) where
        R: beacon_firmware::radio::backend::BackendSet,
        T: TelemetrySource,
    {
        for _ in 0..limit {
            scheduler.poll();
            if done(scheduler) {
                return;
            }
            self.interrupts();
        }
        panic!("condition not reached in {limit} steps, state {:?}", scheduler.state());
    }

    /// Step until `n` transmissions have been reported
    pub fn run_reports<R, T>(
        &mut self,
        scheduler: &mut Scheduler<'_, MockBoard, R, T>,
        n: u32,
        limit: u32,
    ) -> Vec<beacon_firmware::radio::scheduler::TxReport>
    where
        R: beacon_firmware::radio::backend::BackendSet,
        T: TelemetrySource,
    {
        let mut reports = Vec::new();
        let mut seen = 0;
        for _ in 0..limit {
            scheduler.poll();
            let c = scheduler.counters();
            let total = c.completed + c.aborted;
            if total > seen {
                seen = total;
                reports.extend(scheduler.last_report().copied());
                if seen >= n {
                    return reports;
                }
            }
            self.interrupts();
        }
        panic!("{n} reports not reached in {limit} steps, got {}", reports.len());
    }
}

/// Commands sent to one transmitter, in order
pub fn radio_commands(log: &Log, kind: BackendKind) -> Vec<Command> {
    log.borrow()
        .iter()
        .filter_map(|e| match e {
            Event::Radio(k, c) if *k == kind => Some(c.clone()),
            _ => None,
        })
        .collect()
}

/// Events other than transmitter commands, in order
pub fn board_events(log: &Log) -> Vec<Event> {
    log.borrow()
        .iter()
        .filter(|e| !matches!(e, Event::Radio(..)))
        .cloned()
        .collect()
}

/// A `'static` template of arbitrary bytes
pub fn leak_template(bytes: Vec<u8>) -> &'static str {
    let text = String::from_utf8(bytes).expect("ASCII template");
    Box::leak(text.into_boxed_str())
}
