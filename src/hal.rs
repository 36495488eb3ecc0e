//! Hardware Abstraction Layer
//!
//! Safe wrappers over the STM32F100 peripherals the transmission engine
//! owns. Only the bus helpers build on the host; everything touching
//! registers needs the `embedded` feature.

pub mod i2c;

#[cfg(feature = "embedded")]
pub mod delay;
#[cfg(feature = "embedded")]
pub mod gpio;
#[cfg(feature = "embedded")]
pub mod pwm;
#[cfg(feature = "embedded")]
pub mod spi;
#[cfg(feature = "embedded")]
pub mod timer;

/// The RS41 board's real-time peripherals
#[cfg(feature = "embedded")]
pub struct Rs41Board;

#[cfg(feature = "embedded")]
impl crate::radio::peripheral::Board for Rs41Board {
    type Tick = timer::SysTickTimer;
    type Timer = timer::SymbolTimer7;
    type Sink = gpio::BitBangSpi;
    type Pwm = pwm::WaveformPwm15;
    type Bus = gpio::BusPins;
    type Delay = delay::CycleDelay;
}
