//! Configuration and Constants Tests
//!
//! Tests to verify configuration values are valid and consistent.
//! Run with: cargo test --test config_tests

use beacon_firmware::config::*;
use beacon_firmware::types::{Frequency, SymbolTiming};

// =============================================================================
// Clock Tests
// =============================================================================

#[test]
fn system_clock_valid() {
    // STM32F100 tops out at 24 MHz
    assert_eq!(SYSTEM_CLOCK_HZ, 24_000_000);
}

#[test]
fn system_tick_divides_clock() {
    assert_eq!(SYSTEM_CLOCK_HZ % SYSTEM_TICK_HZ, 0);
    assert_eq!(SYSTEM_TICK_HZ % 1_000, 0);
}

#[test]
fn ms_to_ticks_scales() {
    assert_eq!(ms_to_ticks(1), 10);
    assert_eq!(ms_to_ticks(FIFO_STREAM_TIMEOUT_MS), 30_000);
    assert_eq!(ms_to_ticks(FIFO_COMPLETION_TIMEOUT_MS), 10_000);
}

#[test]
fn pwm_clock_fits_audio_tones() {
    // Lowest AFSK tone must fit a 16-bit period
    assert!(PWM_TIMER_CLOCK_HZ / 1_200 <= u32::from(u16::MAX));
    assert!(PWM_TIMER_CLOCK_HZ <= SYSTEM_CLOCK_HZ);
}

// =============================================================================
// Buffer Tests
// =============================================================================

#[test]
fn dma_buffer_splits_in_halves() {
    assert_eq!(DMA_BUFFER_LEN % 2, 0);
    assert!(DMA_GRACE_TRANSFERS >= 2);
}

#[test]
fn payload_fits_fifo_streams() {
    assert!(MAX_PAYLOAD_LEN > SI4063_FIFO_SIZE);
}

// =============================================================================
// Bus Configuration Tests
// =============================================================================

#[test]
fn i2c_frequency_valid() {
    assert!(I2C_FREQUENCY_HZ == 100_000 || I2C_FREQUENCY_HZ == 400_000);
}

#[test]
fn si5351_address_valid() {
    // Si5351A default address is 0x60 or 0x61
    assert!(SI5351_I2C_ADDR == 0x60 || SI5351_I2C_ADDR == 0x61);
}

#[test]
fn si5351_crystal_frequency() {
    assert!(SI5351_XTAL_FREQ == 25_000_000 || SI5351_XTAL_FREQ == 27_000_000);
}

#[test]
fn radio_crystals_match_rs41() {
    assert_eq!(SI4032_XTAL_HZ, 26_000_000);
    assert_eq!(SI4063_XTAL_HZ, 26_000_000);
}

// =============================================================================
// Mode Defaults Tests
// =============================================================================

#[test]
fn default_frequency_in_range() {
    let freq = default_frequency().unwrap();
    assert_eq!(freq.as_hz(), DEFAULT_FREQUENCY_HZ);
    assert!(freq.as_hz() <= Frequency::MAX_HZ);
}

#[test]
fn horus_defaults() {
    assert_eq!(SymbolTiming::Rate(HORUS_SYMBOL_RATE).period_us(), 10_000);
    assert_eq!(HORUS_TONE_SPACING_CENTIHZ, 27_000);
}

#[test]
fn aprs_preamble_nonzero() {
    assert!(APRS_PREAMBLE_FLAGS > 0);
}

// =============================================================================
// Calibration Tests
// =============================================================================

#[test]
fn busy_wait_bell202_uses_measured_delay() {
    assert_eq!(calibration::busy_wait_symbol_delay_us(1_200), 821);
}

#[test]
fn busy_wait_other_rates_subtract_overhead() {
    assert_eq!(
        calibration::busy_wait_symbol_delay_us(300),
        3_333 - calibration::BUSY_WAIT_LOOP_OVERHEAD_US
    );
    assert_eq!(calibration::busy_wait_symbol_delay_us(0), 0);
}

#[test]
fn busy_wait_delay_below_symbol_period() {
    for rate in [300, 600, 1_200, 2_400] {
        let delay = calibration::busy_wait_symbol_delay_us(rate);
        assert!(delay < SymbolTiming::Rate(rate).period_us(), "rate {rate}");
    }
}
