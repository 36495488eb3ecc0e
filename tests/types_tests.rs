//! Types Module Tests
//!
//! Tests for domain types (Frequency, PowerLevel, SymbolTiming, DataMode)
//! Run with: cargo test --test types_tests

use beacon_firmware::types::{
    BackendKind, DataMode, Frequency, PowerLevel, SymbolTiming, CENTIHZ_PER_HZ,
};

// =============================================================================
// Frequency Tests
// =============================================================================

#[test]
fn test_frequency_from_hz_valid() {
    assert!(Frequency::from_hz(432_500_000).is_some()); // 70 cm beacon
    assert!(Frequency::from_hz(14_097_000).is_some()); // WSPR on 20m
    assert!(Frequency::from_hz(Frequency::MIN_HZ).is_some());
    assert!(Frequency::from_hz(Frequency::MAX_HZ).is_some());
}

#[test]
fn test_frequency_from_hz_invalid() {
    assert!(Frequency::from_hz(0).is_none());
    assert!(Frequency::from_hz(Frequency::MIN_HZ - 1).is_none());
    assert!(Frequency::from_hz(Frequency::MAX_HZ + 1).is_none());
}

#[test]
fn test_frequency_from_khz() {
    let freq = Frequency::from_khz(7_040).unwrap();
    assert_eq!(freq.as_hz(), 7_040_000);
    assert_eq!(freq.as_khz(), 7_040);
    assert!(Frequency::from_khz(u32::MAX).is_none());
}

#[test]
fn test_frequency_centihz_resolution() {
    let freq = Frequency::from_hz(14_097_100).unwrap();
    assert_eq!(freq.as_centihz(), 14_097_100 * CENTIHZ_PER_HZ);

    let aligned = freq.with_offset_centihz(46).unwrap();
    assert_eq!(aligned.as_hz(), 14_097_100);
    assert_eq!(aligned.sub_hz_centihz(), 46);
    assert!(freq.with_offset_centihz(100).is_none());
}

#[test]
fn test_frequency_shifted_by_tone() {
    // WSPR tone 3 is 4.39 Hz above the carrier
    let carrier = Frequency::from_hz(14_097_100).unwrap();
    let tone = carrier.shifted(439);
    assert_eq!(tone.as_centihz() - carrier.as_centihz(), 439);
    assert_eq!(tone.as_hz(), 14_097_104);
    assert_eq!(tone.sub_hz_centihz(), 39);
}

#[test]
fn test_frequency_debug_shows_sub_hz() {
    let freq = Frequency::from_hz(7_040_000).unwrap().with_offset_centihz(5).unwrap();
    assert_eq!(format!("{freq:?}"), "Frequency(7040000.05 Hz)");
}

#[test]
fn test_frequency_ordering() {
    let low = Frequency::from_hz(7_000_000).unwrap();
    let high = Frequency::from_hz(432_500_000).unwrap();
    assert!(low < high);
    assert!(low.shifted(1) > low);
}

// =============================================================================
// PowerLevel Tests
// =============================================================================

#[test]
fn test_power_level_clamps() {
    assert_eq!(PowerLevel::from_percent(150).as_percent(), 100);
    assert_eq!(PowerLevel::from_percent(42).as_percent(), 42);
    assert_eq!(PowerLevel::default(), PowerLevel::MAX);
}

#[test]
fn test_power_level_scaled() {
    assert_eq!(PowerLevel::MAX.scaled(7), 7);
    assert_eq!(PowerLevel::MIN.scaled(7), 0);
    assert_eq!(PowerLevel::from_percent(50).scaled(7), 3);
    assert_eq!(PowerLevel::from_percent(50).scaled(127), 63);
}

// =============================================================================
// SymbolTiming Tests
// =============================================================================

#[test]
fn test_symbol_timing_rate_period() {
    assert_eq!(SymbolTiming::Rate(100).period_us(), 10_000);
    assert_eq!(SymbolTiming::Rate(1_200).period_us(), 833);
    assert_eq!(SymbolTiming::Rate(50).period_us(), 20_000);
}

#[test]
fn test_symbol_timing_delay_period() {
    // FT8: 160 ms per symbol
    assert_eq!(SymbolTiming::Delay(16_000).period_us(), 160_000);
    // WSPR: 682.67 ms per symbol
    assert_eq!(SymbolTiming::Delay(68_267).period_us(), 682_670);
}

#[test]
fn test_symbol_timing_zero_is_zero() {
    assert_eq!(SymbolTiming::Rate(0).period_us(), 0);
    assert_eq!(SymbolTiming::Delay(0).period_us(), 0);
}

#[test]
fn test_symbol_timing_exact_fraction() {
    assert_eq!(SymbolTiming::Rate(1_200).period_fraction(), (1, 1_200));
    assert_eq!(SymbolTiming::Delay(16_000).period_fraction(), (16_000, 100_000));
}

// =============================================================================
// DataMode Tests
// =============================================================================

#[test]
fn test_data_mode_symbol_table() {
    for mode in [DataMode::Wspr, DataMode::Ft8, DataMode::Jt65, DataMode::Jt9, DataMode::Jt4] {
        assert!(mode.is_symbol_table(), "{mode:?}");
    }
    for mode in [DataMode::Cw, DataMode::Aprs, DataMode::Horus, DataMode::Cats] {
        assert!(!mode.is_symbol_table(), "{mode:?}");
    }
}

#[test]
fn test_backend_kind_distinct() {
    assert_ne!(BackendKind::Si4032, BackendKind::Si4063);
    assert_ne!(BackendKind::Si4063, BackendKind::Si5351);
}
