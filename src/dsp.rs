//! Waveform and synthesizer arithmetic
//!
//! Pure integer calculations shared by the real-time strategies and the
//! drivers, testable on the host:
//! - PWM periods and per-symbol cycle counts for tone synthesis
//! - Si5351 fractional-N frequency plans with sub-hertz resolution

pub mod waveform;
pub mod si5351_calc;
