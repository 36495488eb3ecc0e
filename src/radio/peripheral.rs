//! Hardware timer, PWM/DMA and bus contracts
//!
//! The real-time strategies only reach hardware through these traits.
//! The target implementations live in `hal`; host tests use mocks.

use crate::types::BackendKind;
use embedded_hal::delay::DelayNs;

/// Periodic system tick
pub trait SystemTick {
    /// Stop tick interrupts
    fn suspend(&mut self);

    /// Restart tick interrupts
    fn resume(&mut self);

    /// Check if tick interrupts are stopped
    fn is_suspended(&self) -> bool;
}

/// Dedicated symbol timer with an update interrupt
pub trait SymbolTimer {
    /// Fire every `period_us` microseconds
    fn start(&mut self, period_us: u32);

    /// Stop firing
    fn stop(&mut self);
}

/// One symbol written to the transmitter from interrupt context
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Symbol {
    /// Carrier on or off
    Key(bool),
    /// Carrier offset from the tuned frequency, in centihertz
    Offset(u32),
}

#[cfg(feature = "embedded")]
impl defmt::Format for Symbol {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Key(down) => defmt::write!(f, "key {}", down),
            Self::Offset(centihz) => defmt::write!(f, "+{} cHz", centihz),
        }
    }
}

/// Fast symbol output path used from the symbol timer interrupt
///
/// Writes go over the bit-banged bus, so they are only valid while the
/// bus is handed over.
pub trait SymbolSink {
    /// Select the transmitter the next symbols go to
    fn bind(&mut self, backend: BackendKind);

    /// Output one symbol
    fn emit(&mut self, symbol: Symbol);
}

/// PWM waveform output with a circular DMA feeding its period register
pub trait WaveformPwm {
    /// Set the output period (0 silences the output)
    fn set_period(&mut self, period: u16);

    /// Start circular DMA over `buffer`
    ///
    /// Half-transfer and transfer-complete interrupts call back into
    /// [`crate::radio::realtime`].
    fn start_dma(&mut self, buffer: &[u16]);

    /// Stop the DMA stream
    fn stop_dma(&mut self);

    /// Stop PWM output
    fn stop(&mut self);
}

/// Ownership switch of the transmitter SPI bus
pub trait BusHandoff {
    /// Reconfigure the SPI pins as bit-banged GPIO
    fn to_bitbang(&mut self);

    /// Give the pins back to the SPI peripheral
    fn restore(&mut self);

    /// Check if the pins are currently bit-banged
    fn is_bitbang(&self) -> bool;
}

/// Bundle of real-time peripherals owned by the transmission engine
pub trait Board {
    /// System tick
    type Tick: SystemTick;
    /// Symbol timer
    type Timer: SymbolTimer;
    /// Symbol output path
    type Sink: SymbolSink;
    /// Waveform PWM with DMA
    type Pwm: WaveformPwm;
    /// SPI bus handoff
    type Bus: BusHandoff;
    /// Calibrated delay for the busy-wait loop
    type Delay: DelayNs;
}
