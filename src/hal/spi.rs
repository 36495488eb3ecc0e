//! SPI2 device for the radio chip
//!
//! The transmitter is the only device on SPI2, so the device wrapper is
//! just the bus plus its chip select.

use embassy_stm32::gpio::Output;
use embassy_stm32::mode::Blocking;
use embassy_stm32::spi::{Error, Spi};
use embedded_hal::spi::{ErrorType, Operation, SpiBus, SpiDevice};

/// SPI2 with the radio chip select on PC13
pub struct RadioSpi<'d> {
    bus: Spi<'d, Blocking>,
    nsel: Output<'d>,
}

impl<'d> RadioSpi<'d> {
    /// Wrap the bus and a chip select pin (driven high here)
    #[must_use]
    pub fn new(bus: Spi<'d, Blocking>, mut nsel: Output<'d>) -> Self {
        nsel.set_high();
        Self { bus, nsel }
    }

    fn run(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Error> {
        for op in operations {
            match op {
                Operation::Read(buf) => SpiBus::read(&mut self.bus, buf)?,
                Operation::Write(buf) => SpiBus::write(&mut self.bus, buf)?,
                Operation::Transfer(read, write) => SpiBus::transfer(&mut self.bus, read, write)?,
                Operation::TransferInPlace(buf) => SpiBus::transfer_in_place(&mut self.bus, buf)?,
                Operation::DelayNs(ns) => {
                    cortex_m::asm::delay(ns.saturating_mul(crate::config::SYSTEM_CLOCK_HZ / 1_000_000) / 1_000 + 1);
                }
            }
        }
        SpiBus::flush(&mut self.bus)
    }
}

impl ErrorType for RadioSpi<'_> {
    type Error = Error;
}

impl SpiDevice for RadioSpi<'_> {
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Self::Error> {
        self.nsel.set_low();
        let result = self.run(operations);
        self.nsel.set_high();
        result
    }
}
