//! System configuration and hardware constants
//!
//! This module defines compile-time constants for the beacon hardware and
//! the transmission engine. Pin mappings, clock frequencies, buffer sizes,
//! timeouts and calibration values are centralized here.

use crate::types::{Frequency, PowerLevel};

/// System clock frequency (STM32F100 @ 24MHz)
pub const SYSTEM_CLOCK_HZ: u32 = 24_000_000;

/// System tick rate driving the schedule countdowns
pub const SYSTEM_TICK_HZ: u32 = 10_000;

/// Tone clock of the waveform PWM
///
/// The output toggles on every timer update, so one tone cycle spans two
/// reloads of the 24 MHz timer.
pub const PWM_TIMER_CLOCK_HZ: u32 = 12_000_000;

/// Clock feeding the symbol timer
pub const SYMBOL_TIMER_CLOCK_HZ: u32 = 24_000_000;

/// Capacity of every payload buffer and encoder input
pub const MAX_PAYLOAD_LEN: usize = 256;

/// Delay between the end of one transmission and the next entry
pub const DEFAULT_POST_TX_DELAY_MS: u32 = 1_000;

/// Circular DMA buffer length in PWM periods (two halves)
pub const DMA_BUFFER_LEN: usize = 128;

/// Completed DMA transfers to wait after the encoder ends
///
/// One transfer drains the half holding the last symbols, the next one the
/// half that was already queued behind it.
pub const DMA_GRACE_TRANSFERS: u8 = 2;

/// Time-sync window tolerance after the configured offset
pub const TIME_SYNC_TOLERANCE_S: u32 = 1;

/// `Si4032` reference crystal frequency
pub const SI4032_XTAL_HZ: u32 = 26_000_000;

/// `Si4063` reference TCXO frequency
pub const SI4063_XTAL_HZ: u32 = 26_000_000;

/// `Si5351A` crystal frequency (25 MHz standard)
pub const SI5351_XTAL_FREQ: u32 = 25_000_000;

/// `Si5351A` I2C address
pub const SI5351_I2C_ADDR: u8 = 0x60;

/// I2C bus frequency for `Si5351A`
pub const I2C_FREQUENCY_HZ: u32 = 100_000;

/// SPI bus frequency for the UHF transmitters
pub const SPI_FREQUENCY_HZ: u32 = 1_000_000;

/// `Si4063` TX FIFO size in bytes
pub const SI4063_FIFO_SIZE: usize = 64;

/// Polls of the `Si4063` clear-to-send flag before giving up
pub const SI4063_CTS_RETRIES: u32 = 2_500;

/// Polls of the `Si5351A` init flag before giving up
pub const SI5351_READY_RETRIES: u32 = 100;

/// Maximum time spent topping up the radio FIFO
pub const FIFO_STREAM_TIMEOUT_MS: u32 = 3_000;

/// Maximum time spent waiting for the radio to leave TX after the last byte
pub const FIFO_COMPLETION_TIMEOUT_MS: u32 = 1_000;

/// HDLC flags sent in the APRS preamble after the first one
pub const APRS_PREAMBLE_FLAGS: u16 = 45;

/// Horus binary symbol rate
pub const HORUS_SYMBOL_RATE: u32 = 100;

/// Horus binary tone spacing in centihertz
pub const HORUS_TONE_SPACING_CENTIHZ: u32 = 27_000;

/// Morse speed in words per minute
pub const CW_SPEED_WPM: u32 = 20;

/// Default startup frequency (70 cm band)
pub const DEFAULT_FREQUENCY_HZ: u32 = 432_500_000;

/// Default transmit power
pub const DEFAULT_POWER: PowerLevel = PowerLevel::MAX;

/// Convert milliseconds to system ticks
#[must_use]
pub const fn ms_to_ticks(ms: u32) -> u32 {
    ms * (SYSTEM_TICK_HZ / 1_000)
}

/// Build the default startup frequency
#[must_use]
pub const fn default_frequency() -> Option<Frequency> {
    Frequency::from_hz(DEFAULT_FREQUENCY_HZ)
}

/// Busy-wait calibration
pub mod calibration {
    //! Loop timings measured on hardware.
    //!
    //! The busy-wait strategy cannot be clocked by a timer, so the delay
    //! per symbol is the nominal symbol period minus what one loop pass
    //! costs (encoder step plus PWM period write).

    /// `Si4063` Bell 202 at 1200 Bd: nominal 833 us per symbol
    pub const SI4063_BELL202_1200_SYMBOL_DELAY_US: u32 = 821;

    /// Loop overhead assumed for rates without a measured value
    pub const BUSY_WAIT_LOOP_OVERHEAD_US: u32 = 12;

    /// Delay per symbol for a busy-wait loop at `symbol_rate`
    #[must_use]
    pub const fn busy_wait_symbol_delay_us(symbol_rate: u32) -> u32 {
        if symbol_rate == 1_200 {
            return SI4063_BELL202_1200_SYMBOL_DELAY_US;
        }
        if symbol_rate == 0 {
            return 0;
        }
        (1_000_000 / symbol_rate).saturating_sub(BUSY_WAIT_LOOP_OVERHEAD_US)
    }
}

/// Pin assignments for GPIO
pub mod pins {
    //! GPIO pin assignments matching the RS41 board

    /// Green status LED (active low)
    pub const LED_GREEN: &str = "PB7";

    /// Red status LED (active low)
    pub const LED_RED: &str = "PB8";

    /// SPI2 SCK (`Si4032` / `Si4063`)
    pub const SPI2_SCK: &str = "PB13";

    /// SPI2 MISO
    pub const SPI2_MISO: &str = "PB14";

    /// SPI2 MOSI, doubles as the direct-mode data input when bit-banged
    pub const SPI2_MOSI: &str = "PB15";

    /// Transmitter chip select
    pub const RADIO_NSEL: &str = "PC13";

    /// I2C2 SCL on the expansion header (`Si5351A`)
    pub const I2C2_SCL: &str = "PB10";

    /// I2C2 SDA on the expansion header (`Si5351A`)
    pub const I2C2_SDA: &str = "PB11";

    /// Waveform PWM output (TIM15 CH2)
    pub const WAVEFORM_PWM: &str = "PB15";
}

/// DMA channel assignments
pub mod dma {
    //! DMA channel assignments

    /// TIM15 update request feeding the waveform PWM period register
    pub const WAVEFORM_PWM: u8 = 5;
}

/// Timer assignments
pub mod timers {
    //! Hardware timer assignments

    /// Symbol timer for the interrupt toggle strategy (basic timer)
    pub const SYMBOL: u8 = 7;

    /// Waveform PWM timer
    pub const WAVEFORM_PWM: u8 = 15;
}
