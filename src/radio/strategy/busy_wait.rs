//! Busy-wait strategy
//!
//! Used where no spare timer/DMA pairing exists for the transmitter's data
//! pin. The main loop writes each tone's PWM period and then spins for a
//! calibrated delay, with the system tick suspended so that nothing but
//! this loop runs for the length of the transmission.

use embedded_hal::delay::DelayNs;

use crate::config::PWM_TIMER_CLOCK_HZ;
use crate::dsp::waveform::tone_period;
use crate::encoder::{Encoder, ToneEncoder};
use crate::radio::peripheral::{Board, BusHandoff, SystemTick, WaveformPwm};
use crate::radio::realtime::{RealTime, SharedRealTime};

/// Claim the bus and suspend the tick
pub fn start<B: Board>(rt: &mut RealTime<B>) {
    rt.bus.to_bitbang();
    rt.tick.suspend();
    rt.pwm.set_period(0);
}

/// Send every symbol of `encoder`, then silence the output and resume the tick
///
/// Each symbol holds the critical section for its own write and delay, so
/// interrupts are only serviced between symbols. Returns the number of
/// symbols sent.
pub fn run<B: Board>(shared: &SharedRealTime<B>, encoder: &mut Encoder, symbol_delay_us: u32) -> u32 {
    let mut sent = 0;
    while let Some(tone) = encoder.next_tone() {
        let tone_centihz = encoder
            .tone_catalog()
            .get(usize::from(tone))
            .copied()
            .unwrap_or(0);
        let period = tone_period(PWM_TIMER_CLOCK_HZ, tone_centihz);
        shared.with(|rt| {
            rt.pwm.set_period(period);
            rt.delay.delay_us(symbol_delay_us);
        });
        sent += 1;
    }
    shared.with(|rt| {
        rt.pwm.set_period(0);
        rt.pwm.stop();
        rt.tick.resume();
    });
    sent
}
