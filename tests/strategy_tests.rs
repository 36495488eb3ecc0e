//! Real-time Strategy Tests
//!
//! Each strategy is driven end to end through the scheduler with mocked
//! peripherals and simulated interrupts.
//! Run with: cargo test --test strategy_tests

mod common;

use beacon_firmware::config::{calibration, DMA_BUFFER_LEN, PWM_TIMER_CLOCK_HZ, SYSTEM_CLOCK_HZ};
use beacon_firmware::dsp::waveform::{tone_period, WaveformSynth};
use beacon_firmware::encoder::{AfskConfig, EncoderConfig, JtMode, MfskConfig, ToneEncoder};
use beacon_firmware::radio::backend::{Backends, ChipState, Modulation};
use beacon_firmware::radio::peripheral::Symbol;
use beacon_firmware::radio::schedule::ScheduleEntry;
use beacon_firmware::radio::scheduler::{AbortReason, Scheduler, TxOutcome, TxState};
use beacon_firmware::radio::session::Strategy;
use beacon_firmware::radio::signals::TxSignals;
use beacon_firmware::radio::strategy::dma;
use beacon_firmware::types::{BackendKind, DataMode};

use common::*;

fn entry(
    backend: BackendKind,
    mode: DataMode,
    encoder: EncoderConfig,
    template: &'static str,
) -> ScheduleEntry<'static> {
    ScheduleEntry::new(backend, mode, freq(432_500_000), encoder, &template_bytes, template)
        .with_post_tx_delay_ms(0)
}

// =============================================================================
// Strategy selection
// =============================================================================

#[test]
fn strategy_table() {
    use BackendKind::{Si4032, Si4063, Si5351};
    use DataMode::*;

    let cases = [
        (Si4032, Cw, Some(Strategy::InterruptToggle)),
        (Si4032, Horus, Some(Strategy::InterruptToggle)),
        (Si4032, Aprs, Some(Strategy::DmaWaveform)),
        (Si4032, Cats, None),
        (Si4032, Wspr, None),
        (Si4063, Cw, Some(Strategy::InterruptToggle)),
        (Si4063, Horus, Some(Strategy::InterruptToggle)),
        (Si4063, Aprs, Some(Strategy::BusyWait)),
        (Si4063, Cats, Some(Strategy::FifoStream)),
        (Si4063, Ft8, None),
        (Si5351, Cw, Some(Strategy::TickStepped)),
        (Si5351, Horus, Some(Strategy::TickStepped)),
        (Si5351, Wspr, Some(Strategy::TickStepped)),
        (Si5351, Ft8, Some(Strategy::TickStepped)),
        (Si5351, Jt65, Some(Strategy::TickStepped)),
        (Si5351, Jt9, Some(Strategy::TickStepped)),
        (Si5351, Jt4, Some(Strategy::TickStepped)),
        (Si5351, Aprs, None),
        (Si5351, Cats, None),
    ];
    for (backend, mode, expected) in cases {
        assert_eq!(Strategy::select(backend, mode), expected, "{mode:?} on {backend:?}");
    }
}

#[test]
fn strategy_resource_claims() {
    assert!(Strategy::InterruptToggle.suspends_tick());
    assert!(Strategy::BusyWait.suspends_tick());
    assert!(!Strategy::DmaWaveform.suspends_tick());
    assert!(!Strategy::FifoStream.uses_bitbang());
    assert!(!Strategy::TickStepped.uses_bitbang());
    assert!(Strategy::DmaWaveform.uses_bitbang());
    assert_eq!(Strategy::InterruptToggle.modulation(true), Modulation::Ook);
    assert_eq!(Strategy::InterruptToggle.modulation(false), Modulation::Fsk);
    assert_eq!(Strategy::BusyWait.modulation(false), Modulation::RawGpio);
}

// =============================================================================
// Interrupt toggle
// =============================================================================

#[test]
fn interrupt_toggle_writes_offsets_with_tick_suspended() {
    let log = new_log();
    let signals = TxSignals::new();
    let rt = realtime(&log);
    let entries = [entry(
        BackendKind::Si4032,
        DataMode::Horus,
        EncoderConfig::Mfsk(MfskConfig::HORUS),
        "AB",
    )];
    let mut scheduler =
        Scheduler::new(&entries, &signals, &rt, all_backends(&log), MockTelemetry::default()).unwrap();
    scheduler.start();
    let mut harness = Harness::new(&signals, &rt);

    harness.run_until(&mut scheduler, 10, |s| s.state() == TxState::TxActive);
    assert!(scheduler.session().unwrap().tick_suspended());
    let ticks_at_start = signals.ticks();

    let reports = harness.run_reports(&mut scheduler, 1, 100);
    assert_eq!(reports[0].outcome, TxOutcome::Completed);
    assert_eq!(reports[0].symbols_sent, 8);

    // A = 01 00 00 01, B = 01 00 00 10, 270 Hz apart
    let emitted: Vec<Symbol> = log
        .borrow()
        .iter()
        .filter_map(|e| match e {
            Event::Emit(s) => Some(*s),
            _ => None,
        })
        .collect();
    let expected: Vec<Symbol> = [1, 0, 0, 1, 1, 0, 0, 2]
        .iter()
        .map(|&t| Symbol::Offset(t * 27_000))
        .collect();
    assert_eq!(emitted, expected);

    // No system tick ran between the first and the last symbol
    assert!(harness.tick_while_suspended >= 8);
    assert!(signals.ticks() - ticks_at_start < 5);
    assert_eq!(count(&log, &Event::TimerStart(10_000)), 1);
    assert_eq!(count(&log, &Event::TickSuspend), 1);
    assert_eq!(count(&log, &Event::TickResume), 1);
    assert!(radio_commands(&log, BackendKind::Si4032).contains(&Command::Modulation(Modulation::Fsk)));
}

#[test]
fn interrupt_toggle_ignores_timer_after_end() {
    let log = new_log();
    let signals = TxSignals::new();
    let rt = realtime(&log);
    let entries = [entry(
        BackendKind::Si4063,
        DataMode::Cw,
        EncoderConfig::Morse { symbol_rate: 10 },
        "E",
    )];
    let mut scheduler =
        Scheduler::new(&entries, &signals, &rt, all_backends(&log), MockTelemetry::default()).unwrap();
    scheduler.start();
    let mut harness = Harness::new(&signals, &rt);

    harness.run_until(&mut scheduler, 10, |s| s.state() == TxState::TxActive);
    for _ in 0..5 {
        rt.on_symbol_timer(&signals);
    }
    assert_eq!(count(&log, &Event::Emit(Symbol::Key(true))), 1);
    assert_eq!(count(&log, &Event::TickResume), 1);

    let reports = harness.run_reports(&mut scheduler, 1, 100);
    assert_eq!(reports[0].outcome, TxOutcome::Completed);
}

// =============================================================================
// DMA waveform
// =============================================================================

#[test]
fn dma_waveform_runs_grace_transfers_then_stops() {
    let log = new_log();
    let signals = TxSignals::new();
    let rt = realtime(&log);
    let entries = [entry(
        BackendKind::Si4032,
        DataMode::Aprs,
        EncoderConfig::Afsk(AfskConfig::BELL_202.with_flag_count(0)),
        "A",
    )];
    let mut scheduler =
        Scheduler::new(&entries, &signals, &rt, all_backends(&log), MockTelemetry::default()).unwrap();
    scheduler.start();

    let reports = Harness::new(&signals, &rt).run_reports(&mut scheduler, 1, 100);
    assert_eq!(reports[0].outcome, TxOutcome::Completed);
    assert_eq!(reports[0].strategy, Some(Strategy::DmaWaveform));
    assert_eq!(reports[0].symbols_sent, 8);

    let board = board_events(&log);
    assert_eq!(board[0], Event::BusBitbang);
    assert_eq!(board[1], Event::DmaStart(DMA_BUFFER_LEN));
    assert_eq!(count(&log, &Event::TickSuspend), 0);
    let restore = position(&log, |e| *e == Event::BusRestore).unwrap();
    let first_stop = position(&log, |e| *e == Event::DmaStop).unwrap();
    let disable =
        position(&log, |e| *e == Event::Radio(BackendKind::Si4032, Command::Disable)).unwrap();
    assert!(first_stop < restore && restore < disable);
    assert!(radio_commands(&log, BackendKind::Si4032).contains(&Command::Modulation(Modulation::RawGpio)));
}

#[test]
fn dma_refills_long_payload_until_grace_expires() {
    let log = new_log();
    let signals = TxSignals::new();
    let rt = realtime(&log);
    let mut encoder = EncoderConfig::Afsk(AfskConfig::BELL_202.with_flag_count(40)).build();
    encoder.set_data(&[0x7E, b'A', b'B', 0x7E]).unwrap();
    let expected_symbols = (40 + 4) * 8;
    let synth = WaveformSynth::new(PWM_TIMER_CLOCK_HZ, encoder.symbol_rate());
    rt.with(|r| dma::start(r, encoder, synth)).unwrap();

    let mark = tone_period(PWM_TIMER_CLOCK_HZ, 120_000);
    let space = tone_period(PWM_TIMER_CLOCK_HZ, 220_000);
    assert!(rt
        .with(|r| r.dma_buffer().iter().all(|&p| p == mark || p == space))
        .unwrap());

    let mut transfers = 0;
    let mut half = true;
    while !signals.take_tx_finished() {
        if half {
            rt.on_dma_half_transfer(&signals);
        } else {
            rt.on_dma_transfer_complete(&signals);
        }
        half = !half;
        transfers += 1;
        assert!(transfers < 100, "stream never finished");
    }

    // Two to four timer updates per symbol, 64 updates per transfer
    assert!(transfers > expected_symbols / 64);
    assert!(rt.with(|r| r.dma_buffer().iter().all(|&p| p == 0)).unwrap());
    assert_eq!(count(&log, &Event::DmaStop), 1);
    assert_eq!(count(&log, &Event::PwmStop), 1);

    // Interrupts after the end change nothing
    rt.on_dma_half_transfer(&signals);
    assert!(!signals.take_tx_finished());
    assert_eq!(count(&log, &Event::DmaStop), 1);
}

#[test]
fn dma_symbols_last_one_baud_at_the_timer_counter_clock() {
    let log = new_log();
    let signals = TxSignals::new();
    let rt = realtime(&log);
    let mut encoder = EncoderConfig::Afsk(AfskConfig::BELL_202.with_flag_count(40)).build();
    encoder.set_data(&[0x7E, b'A', b'B', 0x7E]).unwrap();
    let symbols: u64 = (40 + 4) * 8;
    let synth = WaveformSynth::new(PWM_TIMER_CLOCK_HZ, encoder.symbol_rate());
    assert_eq!(synth.counter_clock_hz(), SYSTEM_CLOCK_HZ);
    rt.with(|r| dma::start(r, encoder, synth)).unwrap();

    // Every buffer entry is one toggle lasting `period` clocks of the 24 MHz counter
    let sum = |slots: &[u16]| slots.iter().map(|&p| u64::from(p)).sum::<u64>();
    let middle = DMA_BUFFER_LEN / 2;
    let mut clocks = rt.with(|r| sum(r.dma_buffer())).unwrap();
    let mut half = true;
    while !signals.take_tx_finished() {
        if half {
            rt.on_dma_half_transfer(&signals);
            clocks += rt.with(|r| sum(&r.dma_buffer()[..middle])).unwrap();
        } else {
            rt.on_dma_transfer_complete(&signals);
            clocks += rt.with(|r| sum(&r.dma_buffer()[middle..])).unwrap();
        }
        half = !half;
    }

    // 352 symbols at 1200 Bd
    let expected = symbols * u64::from(SYSTEM_CLOCK_HZ) / 1_200;
    let space_update = u64::from(tone_period(PWM_TIMER_CLOCK_HZ, 220_000));
    assert!(
        clocks.abs_diff(expected) <= space_update,
        "clocks {clocks}, expected {expected}"
    );
}

// =============================================================================
// Busy wait
// =============================================================================

#[test]
fn busy_wait_writes_periods_with_calibrated_delay() {
    let log = new_log();
    let signals = TxSignals::new();
    let rt = realtime(&log);
    let entries = [entry(
        BackendKind::Si4063,
        DataMode::Aprs,
        EncoderConfig::Afsk(AfskConfig::BELL_202.with_flag_count(0)),
        "A",
    )];
    let mut scheduler =
        Scheduler::new(&entries, &signals, &rt, all_backends(&log), MockTelemetry::default()).unwrap();
    scheduler.start();

    let reports = Harness::new(&signals, &rt).run_reports(&mut scheduler, 1, 100);
    assert_eq!(reports[0].outcome, TxOutcome::Completed);
    assert_eq!(reports[0].strategy, Some(Strategy::BusyWait));
    assert_eq!(reports[0].symbols_sent, 8);

    let delay = calibration::busy_wait_symbol_delay_us(1_200);
    let mark = tone_period(PWM_TIMER_CLOCK_HZ, 120_000);
    let space = tone_period(PWM_TIMER_CLOCK_HZ, 220_000);
    let board = board_events(&log);
    assert_eq!(&board[..3], &[Event::BusBitbang, Event::TickSuspend, Event::PwmPeriod(0)]);
    let symbols = &board[3..3 + 16];
    for pair in symbols.chunks(2) {
        assert!(matches!(pair[0], Event::PwmPeriod(p) if p == mark || p == space));
        assert_eq!(pair[1], Event::Delay(delay));
    }
    assert_eq!(
        &board[19..],
        &[
            Event::PwmPeriod(0),
            Event::PwmStop,
            Event::TickResume,
            Event::BusRestore,
        ]
    );
}

// =============================================================================
// FIFO streaming
// =============================================================================

fn fifo_backends(log: &Log, fifo: MockFifo) -> MockBackends {
    Backends::new().with_si4063(MockRadio::new(BackendKind::Si4063, log).with_fifo(fifo))
}

fn cats(template: &'static str) -> [ScheduleEntry<'static>; 1] {
    [entry(BackendKind::Si4063, DataMode::Cats, EncoderConfig::Raw, template)]
}

#[test]
fn fifo_streams_whole_packet() {
    let log = new_log();
    let signals = TxSignals::new();
    let rt = realtime(&log);
    let data: Vec<u8> = (0..200u8).map(|i| b'A' + i % 26).collect();
    let entries = cats(leak_template(data.clone()));
    let backends = fifo_backends(&log, MockFifo::new(64, 16));
    let mut scheduler =
        Scheduler::new(&entries, &signals, &rt, backends, MockTelemetry::default()).unwrap();
    scheduler.start();

    let reports = Harness::new(&signals, &rt).run_reports(&mut scheduler, 1, 1_000);
    assert_eq!(reports[0].outcome, TxOutcome::Completed);
    assert_eq!(reports[0].bytes_streamed, 200);

    let radio = scheduler.backends().si4063.as_ref().unwrap();
    let fifo = radio.fifo.as_ref().unwrap();
    assert_eq!(fifo.written, data);
    assert_eq!(fifo.packet_len, Some(200));

    // The packet start keys the chip; no separate enable
    let commands = radio_commands(&log, BackendKind::Si4063);
    assert!(!commands.contains(&Command::Enable));
    assert!(commands.contains(&Command::Modulation(Modulation::Fsk)));
    assert_eq!(board_events(&log), Vec::new());
}

#[test]
fn fifo_underflow_stops_writes_at_once() {
    let log = new_log();
    let signals = TxSignals::new();
    let rt = realtime(&log);
    let entries = cats(leak_template(vec![b'U'; 200]));
    let mut fifo = MockFifo::new(64, 16);
    fifo.underflow_after = Some(100);
    let mut scheduler = Scheduler::new(
        &entries,
        &signals,
        &rt,
        fifo_backends(&log, fifo),
        MockTelemetry::default(),
    )
    .unwrap();
    scheduler.start();

    let reports = Harness::new(&signals, &rt).run_reports(&mut scheduler, 1, 1_000);
    assert_eq!(reports[0].outcome, TxOutcome::Aborted(AbortReason::FifoUnderflow));
    let fifo = scheduler.backends().si4063.as_ref().unwrap().fifo.as_ref().unwrap();
    assert_eq!(fifo.writes_after_underflow, 0);
    assert!((100..200).contains(&fifo.written.len()));
    assert_eq!(reports[0].bytes_streamed, fifo.written.len());
    assert_eq!(count(&log, &Event::Radio(BackendKind::Si4063, Command::Disable)), 1);
}

#[test]
fn fifo_underflow_during_last_top_up_aborts() {
    let log = new_log();
    let signals = TxSignals::new();
    let rt = realtime(&log);
    let entries = cats(leak_template(vec![b'U'; 100]));
    // Prefill 64, then the chip runs dry while the last 36 bytes go in
    let mut fifo = MockFifo::new(64, 64);
    fifo.underflow_on_space_poll = Some(2);
    let mut scheduler = Scheduler::new(
        &entries,
        &signals,
        &rt,
        fifo_backends(&log, fifo),
        MockTelemetry::default(),
    )
    .unwrap();
    scheduler.start();

    let reports = Harness::new(&signals, &rt).run_reports(&mut scheduler, 1, 1_000);
    assert_eq!(reports[0].outcome, TxOutcome::Aborted(AbortReason::FifoUnderflow));
    assert_eq!(reports[0].bytes_streamed, 100);
    let fifo = scheduler.backends().si4063.as_ref().unwrap().fifo.as_ref().unwrap();
    assert!(fifo.underflow_latched);
    assert_eq!(fifo.written.len(), 100);
    assert_eq!(count(&log, &Event::Radio(BackendKind::Si4063, Command::Disable)), 1);
}

#[test]
fn fifo_forces_ready_when_chip_stays_in_tx() {
    let log = new_log();
    let signals = TxSignals::new();
    let rt = realtime(&log);
    let entries = cats("short packet");
    let mut fifo = MockFifo::new(64, 16);
    fifo.hang_in_tx = true;
    let mut scheduler = Scheduler::new(
        &entries,
        &signals,
        &rt,
        fifo_backends(&log, fifo),
        MockTelemetry::default(),
    )
    .unwrap();
    scheduler.start();

    let reports = Harness::new(&signals, &rt).run_reports(&mut scheduler, 1, 20_000);
    assert_eq!(reports[0].outcome, TxOutcome::Aborted(AbortReason::Timeout));
    let fifo = scheduler.backends().si4063.as_ref().unwrap().fifo.as_ref().unwrap();
    assert_eq!(fifo.requests, [ChipState::Ready]);
    assert_eq!(fifo.written.len(), 12);
    // One second of drain time at 10 kHz
    assert!(reports[0].elapsed_ticks >= 10_000);
}

#[test]
fn fifo_stream_times_out_when_chip_stops_draining() {
    let log = new_log();
    let signals = TxSignals::new();
    let rt = realtime(&log);
    let entries = cats(leak_template(vec![b'S'; 200]));
    let mut scheduler = Scheduler::new(
        &entries,
        &signals,
        &rt,
        fifo_backends(&log, MockFifo::new(64, 0)),
        MockTelemetry::default(),
    )
    .unwrap();
    scheduler.start();

    let reports = Harness::new(&signals, &rt).run_reports(&mut scheduler, 1, 50_000);
    assert_eq!(reports[0].outcome, TxOutcome::Aborted(AbortReason::Timeout));
    let fifo = scheduler.backends().si4063.as_ref().unwrap().fifo.as_ref().unwrap();
    assert_eq!(fifo.written.len(), 64);
    assert_eq!(fifo.requests, [ChipState::Ready]);
}

// =============================================================================
// Tick stepped
// =============================================================================

#[test]
fn tick_stepped_retunes_per_symbol() {
    let log = new_log();
    let signals = TxSignals::new();
    let rt = realtime(&log);
    let carrier = freq(14_097_000);
    let entries = [ScheduleEntry::new(
        BackendKind::Si5351,
        DataMode::Horus,
        carrier,
        EncoderConfig::Mfsk(MfskConfig::HORUS),
        &template_bytes,
        "AB",
    )
    .with_post_tx_delay_ms(0)];
    let mut scheduler =
        Scheduler::new(&entries, &signals, &rt, all_backends(&log), MockTelemetry::default()).unwrap();
    scheduler.start();

    let reports = Harness::new(&signals, &rt).run_reports(&mut scheduler, 1, 10_000);
    assert_eq!(reports[0].outcome, TxOutcome::Completed);

    let base = carrier.as_centihz();
    let mut expected = vec![
        Command::Frequency(base),
        Command::Power(100),
        Command::Modulation(Modulation::None),
        Command::Enable,
    ];
    expected.extend(
        [1u64, 0, 0, 1, 1, 0, 0, 2]
            .iter()
            .map(|t| Command::Frequency(base + t * 27_000)),
    );
    expected.extend([Command::Disable, Command::Modulation(Modulation::None)]);
    assert_eq!(radio_commands(&log, BackendKind::Si5351), expected);
    assert!(board_events(&log).is_empty());
}

#[test]
fn tick_stepped_keys_morse() {
    let log = new_log();
    let signals = TxSignals::new();
    let rt = realtime(&log);
    let entries = [ScheduleEntry::new(
        BackendKind::Si5351,
        DataMode::Cw,
        freq(7_040_000),
        EncoderConfig::Morse { symbol_rate: 10 },
        &template_bytes,
        "I",
    )
    .with_post_tx_delay_ms(0)];
    let mut scheduler =
        Scheduler::new(&entries, &signals, &rt, all_backends(&log), MockTelemetry::default()).unwrap();
    scheduler.start();

    Harness::new(&signals, &rt).run_reports(&mut scheduler, 1, 10_000);
    let commands = radio_commands(&log, BackendKind::Si5351);
    assert_eq!(
        &commands[2..],
        &[
            // no Enable before the first element
            Command::Modulation(Modulation::None),
            // dot, gap, dot
            Command::Enable,
            Command::Disable,
            Command::Enable,
            // release
            Command::Disable,
            Command::Modulation(Modulation::None),
        ]
    );
}

#[test]
fn tick_stepped_symbol_table_holds_nominal_length() {
    let log = new_log();
    let signals = TxSignals::new();
    let rt = realtime(&log);
    let symbols: Vec<u8> = (0..79u8).map(|i| i % 8).collect();
    let entries = [ScheduleEntry::new(
        BackendKind::Si5351,
        DataMode::Ft8,
        freq(14_074_000),
        EncoderConfig::SymbolTable(JtMode::Ft8),
        &template_bytes,
        leak_template(symbols),
    )
    .with_post_tx_delay_ms(0)];
    let mut scheduler =
        Scheduler::new(&entries, &signals, &rt, all_backends(&log), MockTelemetry::default()).unwrap();
    scheduler.start();

    let reports = Harness::new(&signals, &rt).run_reports(&mut scheduler, 1, 200_000);
    assert_eq!(reports[0].symbols_sent, 79);
    // 79 symbols of 160 ms at 10 kHz
    let elapsed = reports[0].elapsed_ticks;
    assert!((126_400..126_410).contains(&elapsed), "elapsed {elapsed}");
}
