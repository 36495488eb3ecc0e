//! Timer Abstractions
//!
//! SysTick is the system tick that drives the schedule countdowns; TIM7, a
//! basic timer, paces the interrupt toggle strategy. The embassy time
//! driver runs on its own timer and is unaffected by either.

use cortex_m::peripheral::syst::SystClkSource;
use cortex_m::peripheral::SYST;
use embassy_stm32::pac;

use crate::config::{SYMBOL_TIMER_CLOCK_HZ, SYSTEM_CLOCK_HZ, SYSTEM_TICK_HZ};
use crate::radio::peripheral::{SymbolTimer, SystemTick};

/// SysTick at [`SYSTEM_TICK_HZ`]
pub struct SysTickTimer {
    syst: SYST,
    suspended: bool,
}

impl SysTickTimer {
    /// Start SysTick with its interrupt enabled
    #[must_use]
    pub fn new(mut syst: SYST) -> Self {
        syst.set_clock_source(SystClkSource::Core);
        syst.set_reload(SYSTEM_CLOCK_HZ / SYSTEM_TICK_HZ - 1);
        syst.clear_current();
        syst.enable_counter();
        syst.enable_interrupt();
        Self {
            syst,
            suspended: false,
        }
    }
}

impl SystemTick for SysTickTimer {
    fn suspend(&mut self) {
        self.syst.disable_interrupt();
        self.suspended = true;
    }

    fn resume(&mut self) {
        self.syst.enable_interrupt();
        self.suspended = false;
    }

    fn is_suspended(&self) -> bool {
        self.suspended
    }
}

/// Prescaler and auto-reload for a period in microseconds
///
/// The prescaler is the smallest one that keeps the reload within 16 bits.
#[must_use]
pub const fn prescale(clock_hz: u32, period_us: u32) -> (u16, u16) {
    let ticks = clock_hz as u64 / 1_000_000 * period_us as u64;
    let psc = ticks / 0x1_0000;
    let arr = ticks / (psc + 1);
    let arr = if arr == 0 { 0 } else { arr - 1 };
    (psc as u16, arr as u16)
}

/// TIM7 update interrupt as the symbol clock
pub struct SymbolTimer7 {
    _private: (),
}

impl SymbolTimer7 {
    /// Configure TIM7, stopped
    #[must_use]
    pub fn new() -> Self {
        pac::RCC.apb1enr().modify(|w| w.set_tim7en(true));
        pac::TIM7.cr1().modify(|w| w.set_cen(false));
        pac::TIM7.dier().modify(|w| w.set_uie(true));
        Self { _private: () }
    }

    /// Acknowledge the update interrupt (call first in the handler)
    pub fn clear_interrupt() {
        pac::TIM7.sr().modify(|w| w.set_uif(false));
    }
}

impl SymbolTimer for SymbolTimer7 {
    fn start(&mut self, period_us: u32) {
        let (psc, arr) = prescale(SYMBOL_TIMER_CLOCK_HZ, period_us);
        pac::TIM7.psc().write_value(psc);
        pac::TIM7.arr().write(|w| w.set_arr(arr));
        // Load the prescaler without firing an update interrupt
        pac::TIM7.cr1().modify(|w| w.set_urs(pac::timer::vals::Urs::COUNTER_ONLY));
        pac::TIM7.egr().write(|w| w.set_ug(true));
        pac::TIM7.sr().modify(|w| w.set_uif(false));
        pac::TIM7.cr1().modify(|w| w.set_cen(true));
    }

    fn stop(&mut self) {
        pac::TIM7.cr1().modify(|w| w.set_cen(false));
        pac::TIM7.sr().modify(|w| w.set_uif(false));
    }
}
