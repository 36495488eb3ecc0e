//! Symbol period in system ticks
//!
//! Symbol periods are rarely a whole number of ticks (1200 Bd at 10 kHz is
//! 8.33 ticks). The fractional part is carried from one symbol to the next
//! so the transmission length matches the nominal rate.

use crate::types::SymbolTiming;

/// Rational tick countdown generator
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SymbolClock {
    /// Ticks per symbol, numerator
    numerator: u64,
    /// Ticks per symbol, denominator
    denominator: u64,
    remainder: u64,
}

impl SymbolClock {
    /// Clock for `timing` at `tick_hz`, `None` for a zero rate or delay
    #[must_use]
    pub const fn new(timing: SymbolTiming, tick_hz: u32) -> Option<Self> {
        let (seconds_num, seconds_den) = timing.period_fraction();
        if seconds_num == 0 || seconds_den == 0 {
            return None;
        }
        Some(Self {
            numerator: seconds_num * tick_hz as u64,
            denominator: seconds_den,
            remainder: 0,
        })
    }

    /// Ticks until the next symbol boundary
    pub fn next_ticks(&mut self) -> u32 {
        let total = self.numerator + self.remainder;
        self.remainder = total % self.denominator;
        u32::try_from(total / self.denominator).unwrap_or(u32::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_periods() {
        let mut clock = SymbolClock::new(SymbolTiming::Rate(100), 10_000).unwrap();
        assert_eq!(clock.next_ticks(), 100);
        assert_eq!(clock.next_ticks(), 100);
    }

    #[test]
    fn fractional_periods_do_not_drift() {
        let mut clock = SymbolClock::new(SymbolTiming::Rate(1_200), 10_000).unwrap();
        let total: u32 = (0..1_200).map(|_| clock.next_ticks()).sum();
        assert_eq!(total, 10_000);
    }

    #[test]
    fn delay_timing() {
        // WSPR: 682.67 ms per symbol
        let mut clock = SymbolClock::new(SymbolTiming::Delay(68_267), 10_000).unwrap();
        let total: u32 = (0..162).map(|_| clock.next_ticks()).sum();
        // 162 * 6826.7 = 1 105 925.4 ticks
        assert_eq!(total, 1_105_925);
    }

    #[test]
    fn zero_timing_has_no_clock() {
        assert!(SymbolClock::new(SymbolTiming::Rate(0), 10_000).is_none());
        assert!(SymbolClock::new(SymbolTiming::Delay(0), 10_000).is_none());
    }
}
