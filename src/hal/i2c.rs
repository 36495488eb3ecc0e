//! I2C Bus Abstractions
//!
//! Register access helpers for I2C peripherals such as the `Si5351A`.
//! Generic over any `embedded_hal` 1.0 I2C bus, so drivers built on it
//! run against mocks on the host.

use embedded_hal::i2c::I2c;

/// I2C device address wrapper
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct I2cAddress(u8);

impl I2cAddress {
    /// `Si5351A` clock synthesizer address
    pub const SI5351: Self = Self(crate::config::SI5351_I2C_ADDR);

    /// Create from 7-bit address
    #[must_use]
    pub const fn new(addr: u8) -> Self {
        Self(addr & 0x7F)
    }

    /// Get the 7-bit address
    #[must_use]
    pub const fn addr(self) -> u8 {
        self.0
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for I2cAddress {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "0x{:02X}", self.0);
    }
}

/// Register-oriented wrapper around an I2C bus
pub struct I2cBus<I> {
    i2c: I,
}

impl<I: I2c> I2cBus<I> {
    /// Create a new I2C bus wrapper
    #[must_use]
    pub const fn new(i2c: I) -> Self {
        Self { i2c }
    }

    /// Give the bus back
    pub fn release(self) -> I {
        self.i2c
    }

    /// Underlying bus
    pub const fn inner(&self) -> &I {
        &self.i2c
    }

    /// Write a single register
    ///
    /// # Errors
    ///
    /// Returns the bus error on failure.
    pub fn write_reg(&mut self, addr: I2cAddress, reg: u8, value: u8) -> Result<(), I::Error> {
        self.i2c.write(addr.addr(), &[reg, value])
    }

    /// Read a single register
    ///
    /// # Errors
    ///
    /// Returns the bus error on failure.
    pub fn read_reg(&mut self, addr: I2cAddress, reg: u8) -> Result<u8, I::Error> {
        let mut buf = [0u8];
        self.i2c.write_read(addr.addr(), &[reg], &mut buf)?;
        Ok(buf[0])
    }

    /// Write consecutive registers starting at `base_reg`
    ///
    /// # Errors
    ///
    /// Returns the bus error on failure.
    pub fn write_regs(&mut self, addr: I2cAddress, base_reg: u8, values: &[u8]) -> Result<(), I::Error> {
        // Small bursts go out as one transfer with the register prefix
        if values.len() <= 16 {
            let mut buf = [0u8; 17];
            buf[0] = base_reg;
            buf[1..=values.len()].copy_from_slice(values);
            self.i2c.write(addr.addr(), &buf[..=values.len()])
        } else {
            for (reg, &value) in (base_reg..).zip(values) {
                self.write_reg(addr, reg, value)?;
            }
            Ok(())
        }
    }
}
