//! Cycle-counted delay for the busy-wait strategy

use embedded_hal::delay::DelayNs;

use crate::config::SYSTEM_CLOCK_HZ;

/// Busy delay counted in core clock cycles
///
/// Does not depend on any interrupt, so it keeps time with the system
/// tick suspended.
#[derive(Clone, Copy, Debug, Default)]
pub struct CycleDelay;

impl DelayNs for CycleDelay {
    fn delay_ns(&mut self, ns: u32) {
        let cycles = u64::from(ns) * u64::from(SYSTEM_CLOCK_HZ) / 1_000_000_000;
        cortex_m::asm::delay(u32::try_from(cycles).unwrap_or(u32::MAX));
    }

    fn delay_us(&mut self, us: u32) {
        cortex_m::asm::delay(us.saturating_mul(SYSTEM_CLOCK_HZ / 1_000_000));
    }
}
