//! PWM tone synthesis
//!
//! AFSK audio is produced as a square wave on a PWM pin running in toggle
//! mode. Each timer update flips the pin, so one tone cycle is two updates
//! of `period` counter clocks and the counter runs at twice the tone clock.
//! Each symbol lasts a whole number of updates. Because tone and symbol
//! rates are not integer multiples (2 × 2200 Hz / 1200 Bd = 3.67 updates),
//! the leftover time of every symbol is carried into the next one so the
//! average symbol length is exact.

/// Timer period for a tone, in tone clocks per cycle
///
/// Returns 0 (output off) for a zero tone. Saturates at the 16-bit
/// auto-reload limit.
#[must_use]
pub fn tone_period(timer_clock_hz: u32, tone_centihz: u32) -> u16 {
    if tone_centihz == 0 {
        return 0;
    }
    let period = (u64::from(timer_clock_hz) * 100 + u64::from(tone_centihz) / 2) / u64::from(tone_centihz);
    u16::try_from(period).unwrap_or(u16::MAX)
}

/// One symbol of square wave
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SymbolWave {
    /// Timer period of the tone
    pub period: u16,
    /// Timer updates (half cycles) making up the symbol
    pub updates: u32,
}

impl SymbolWave {
    /// Length of the symbol in counter clocks
    #[must_use]
    pub const fn counter_clocks(&self) -> u64 {
        self.period as u64 * self.updates as u64
    }
}

/// Converts tone indices into PWM periods and update counts
#[derive(Clone, Copy, Debug)]
pub struct WaveformSynth {
    timer_clock_hz: u32,
    symbol_rate: u32,
    /// Time owed to the output, in counter clocks scaled by the symbol rate
    debt: i64,
}

impl WaveformSynth {
    /// Create a synthesizer for a PWM tone clock and a symbol rate
    #[must_use]
    pub const fn new(timer_clock_hz: u32, symbol_rate: u32) -> Self {
        Self {
            timer_clock_hz,
            symbol_rate,
            debt: 0,
        }
    }

    /// Clock the timer counter runs at, twice the tone clock
    #[must_use]
    pub const fn counter_clock_hz(&self) -> u32 {
        self.timer_clock_hz * 2
    }

    /// Period for a tone at this synthesizer's timer clock
    #[must_use]
    pub fn period(&self, tone_centihz: u32) -> u16 {
        tone_period(self.timer_clock_hz, tone_centihz)
    }

    /// Square wave for the next symbol of a tone
    ///
    /// A symbol lasts `counter_clock / symbol_rate` counter clocks; scaling
    /// everything by `symbol_rate` keeps the bookkeeping in integers.
    pub fn symbol(&mut self, tone_centihz: u32) -> SymbolWave {
        let period = self.period(tone_centihz);
        if period == 0 || self.symbol_rate == 0 {
            return SymbolWave { period, updates: 0 };
        }
        let update = i64::from(period) * i64::from(self.symbol_rate);
        self.debt += i64::from(self.counter_clock_hz());

        // Round to the nearest whole update; the error carries forward
        let updates = (self.debt + update / 2) / update;
        let updates = updates.max(0);
        self.debt -= updates * update;
        SymbolWave {
            period,
            updates: u32::try_from(updates).unwrap_or(0),
        }
    }

    /// Clear the carried time
    pub fn reset(&mut self) {
        self.debt = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bell202_periods() {
        // 12 MHz / 1200 Hz = 10000, / 2200 Hz = 5454.5
        assert_eq!(tone_period(12_000_000, 120_000), 10_000);
        assert_eq!(tone_period(12_000_000, 220_000), 5_455);
    }

    #[test]
    fn zero_tone_is_silence() {
        assert_eq!(tone_period(12_000_000, 0), 0);
        let mut synth = WaveformSynth::new(12_000_000, 1_200);
        assert_eq!(synth.symbol(0).updates, 0);
    }

    #[test]
    fn mark_is_two_updates_per_symbol() {
        let mut synth = WaveformSynth::new(12_000_000, 1_200);
        for _ in 0..10 {
            let wave = synth.symbol(120_000);
            assert_eq!(wave.updates, 2);
            assert_eq!(wave.counter_clocks(), 20_000);
        }
    }

    #[test]
    fn space_updates_average_out() {
        // 2 × 2200 / 1200 = 3.667 updates per symbol
        let mut synth = WaveformSynth::new(12_000_000, 1_200);
        let total: u32 = (0..1200).map(|_| synth.symbol(220_000).updates).sum();
        assert!((4399..=4401).contains(&total), "total {total}");
    }

    #[test]
    fn elapsed_time_tracks_symbol_clock() {
        let mut synth = WaveformSynth::new(12_000_000, 1_200);
        let clocks: u64 = (0..600u32)
            .map(|i| {
                let tone = if i % 3 == 0 { 120_000 } else { 220_000 };
                synth.symbol(tone).counter_clocks()
            })
            .sum();
        // 600 symbols at 1200 Bd is 0.5 s = 12 000 000 counter clocks at 24 MHz
        assert!(clocks.abs_diff(12_000_000) < 6_000, "clocks {clocks}");
    }
}
