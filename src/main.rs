//! Beacon Firmware Main Application
//!
//! Entry point for the STM32F100-based radiosonde beacon. Brings up the
//! transmitter bus, hands the real-time peripherals to the transmission
//! engine and runs the scheduler from the main loop.

#![no_std]
#![no_main]

use cortex_m::peripheral::NVIC;
use cortex_m_rt::exception;
use defmt::{info, warn};
use embassy_executor::Spawner;
use embassy_stm32::gpio::{Level, Output, Speed};
use embassy_stm32::i2c::I2c;
use embassy_stm32::interrupt;
use embassy_stm32::mode::Blocking;
use embassy_stm32::pac::Interrupt;
use embassy_stm32::spi::{self, Spi};
use embassy_stm32::time::Hertz;
use embassy_time::{Duration, Timer};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use beacon_firmware::drivers::{Si4032, Si4063, Si5351};
use beacon_firmware::encoder::afsk::AfskConfig;
use beacon_firmware::encoder::morse::MorseEncoder;
use beacon_firmware::hal::delay::CycleDelay;
use beacon_firmware::hal::gpio::{BitBangSpi, BusPins, StatusLed};
use beacon_firmware::hal::pwm::{DmaEvent, WaveformPwm15};
use beacon_firmware::hal::spi::RadioSpi;
use beacon_firmware::hal::timer::{SymbolTimer7, SysTickTimer};
use beacon_firmware::hal::Rs41Board;
use beacon_firmware::prelude::*;
use beacon_firmware::radio::realtime::{RealTime, SharedRealTime};
use beacon_firmware::telemetry::ax25::AprsFrame;
use beacon_firmware::telemetry::StaticMessage;

type Radio = RadioSpi<'static>;
type Transmitters = Backends<Si4032<Radio>, Si4063<Radio>, Si5351<I2c<'static, Blocking>>>;

static SIGNALS: TxSignals = TxSignals::new();
static REALTIME: SharedRealTime<Rs41Board> = SharedRealTime::new();
static SCHEDULE: StaticCell<[ScheduleEntry<'static>; 2]> = StaticCell::new();

/// Identification and position report, alternating
fn schedule() -> Option<[ScheduleEntry<'static>; 2]> {
    let frequency = default_frequency()?;
    Some([
        ScheduleEntry::new(
            BackendKind::Si4032,
            DataMode::Cw,
            frequency,
            EncoderConfig::Morse {
                symbol_rate: MorseEncoder::rate_for_wpm(CW_SPEED_WPM),
            },
            &StaticMessage,
            "N0CALL BEACON",
        )
        .with_post_tx_delay_ms(DEFAULT_POST_TX_DELAY_MS),
        ScheduleEntry::new(
            BackendKind::Si4032,
            DataMode::Aprs,
            frequency,
            EncoderConfig::Afsk(AfskConfig::BELL_202),
            &AprsFrame,
            "N0CALL-11>APZ41N,WIDE2-1:>beacon",
        )
        .with_post_tx_delay_ms(DEFAULT_POST_TX_DELAY_MS),
    ])
}

/// Telemetry without sensors: only the sequence number moves
#[derive(Default)]
struct BoardTelemetry {
    sequence: u16,
}

impl TelemetrySource for BoardTelemetry {
    fn snapshot(&mut self) -> TelemetrySnapshot {
        self.sequence = self.sequence.wrapping_add(1);
        TelemetrySnapshot {
            sequence: self.sequence,
            ..TelemetrySnapshot::default()
        }
    }

    fn time_of_week_ms(&self) -> Option<u32> {
        None
    }
}

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Beacon Firmware v{}", env!("CARGO_PKG_VERSION"));

    let p = embassy_stm32::init(embassy_stm32::Config::default());
    let Some(core) = cortex_m::Peripherals::take() else {
        warn!("Core peripherals already taken");
        return;
    };

    let led = StatusLed::new(Output::new(p.PB7, Level::High, Speed::Low));

    // SPI2 to the Si4032: PB13 SCK, PB14 MISO, PB15 MOSI, PC13 NSEL
    let mut spi_config = spi::Config::default();
    spi_config.frequency = Hertz(SPI_FREQUENCY_HZ);
    let spi = Spi::new_blocking(p.SPI2, p.PB13, p.PB15, p.PB14, spi_config);
    let nsel = Output::new(p.PC13, Level::High, Speed::VeryHigh);
    let mut si4032 = Si4032::new(RadioSpi::new(spi, nsel));
    if let Err(e) = si4032.disable_tx() {
        warn!("Si4032 not responding: {:?}", e);
    }

    let backends: Transmitters = Backends::new().with_si4032(si4032);

    REALTIME.install(RealTime::new(
        SysTickTimer::new(core.SYST),
        SymbolTimer7::new(),
        BitBangSpi::new(),
        WaveformPwm15::new(),
        BusPins::new(),
        CycleDelay,
    ));
    // SAFETY: both handlers only touch state behind a critical section
    unsafe {
        NVIC::unmask(Interrupt::TIM7);
        NVIC::unmask(Interrupt::DMA1_CHANNEL5);
    }

    let Some(entries) = schedule() else {
        warn!("Carrier frequency out of range");
        return;
    };
    let entries = SCHEDULE.init(entries);
    let mut scheduler = match Scheduler::new(
        entries,
        &SIGNALS,
        &REALTIME,
        backends,
        BoardTelemetry::default(),
    ) {
        Ok(scheduler) => scheduler,
        Err(e) => {
            warn!("No schedule: {:?}", e);
            return;
        }
    };

    if spawner.spawn(heartbeat_task(led)).is_err() {
        warn!("Heartbeat task not started");
    }

    info!("Starting schedule of {} entries", entries.len());
    scheduler.start();
    loop {
        scheduler.poll();
        embassy_futures::yield_now().await;
    }
}

/// Heartbeat task - blinks LED to show system is running
#[embassy_executor::task]
async fn heartbeat_task(mut led: StatusLed<'static>) {
    loop {
        led.on();
        Timer::after(Duration::from_millis(50)).await;
        led.off();
        Timer::after(Duration::from_millis(1950)).await;
    }
}

#[exception]
fn SysTick() {
    SIGNALS.on_system_tick();
}

#[interrupt]
fn TIM7() {
    SymbolTimer7::clear_interrupt();
    REALTIME.on_symbol_timer(&SIGNALS);
}

#[interrupt]
fn DMA1_CHANNEL5() {
    match WaveformPwm15::take_dma_event() {
        Some(DmaEvent::HalfTransfer) => REALTIME.on_dma_half_transfer(&SIGNALS),
        Some(DmaEvent::TransferComplete) => REALTIME.on_dma_transfer_complete(&SIGNALS),
        None => {}
    }
}
