//! `Si4032` UHF Transmitter Driver
//!
//! Register-mapped transmitter on SPI2. Each access is a two byte frame:
//! address (bit 7 set for writes) then data.
//!
//! The synthesizer runs in steps of `xtal / 3`; above `16 × xtal` the
//! high-band bit doubles the output. The fractional part has a fixed
//! denominator of 64000.

use embedded_hal::spi::{Operation, SpiDevice};

use crate::config::SI4032_XTAL_HZ;
use crate::radio::backend::{BackendError, Modulation, RadioBackend};
use crate::types::{BackendKind, Frequency, PowerLevel, CENTIHZ_PER_HZ};

/// `Si4032` register addresses
pub mod reg {
    /// Operating and function control 1
    pub const OP_CONTROL: u8 = 0x07;
    /// TX power
    pub const TX_POWER: u8 = 0x6D;
    /// Modulation mode control 2
    pub const MODULATION_CONTROL: u8 = 0x71;
    /// Frequency offset 1 (low bits)
    pub const FREQ_OFFSET_1: u8 = 0x73;
    /// Frequency offset 2 (high bits)
    pub const FREQ_OFFSET_2: u8 = 0x74;
    /// Frequency band select
    pub const BAND_SELECT: u8 = 0x75;
    /// Nominal carrier frequency 1
    pub const CARRIER_1: u8 = 0x76;
    /// Nominal carrier frequency 0
    pub const CARRIER_0: u8 = 0x77;
}

/// Address bit marking a register write
pub const WRITE_FLAG: u8 = 0x80;

/// `xton`: crystal on, ready
pub const OP_READY: u8 = 0x01;
/// `txon | xton`
pub const OP_TX: u8 = 0x09;

/// `sbsel`: side band select, always set
const BAND_SIDEBAND: u8 = 0x40;
const BAND_HIGH: u8 = 0x20;

const FRACTION_DENOMINATOR: u64 = 64_000;

/// Register values of a carrier frequency
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CarrierRegisters {
    /// Band select register
    pub band: u8,
    /// Fractional carrier, high byte
    pub carrier_hi: u8,
    /// Fractional carrier, low byte
    pub carrier_lo: u8,
}

impl CarrierRegisters {
    /// Check if the high band is selected
    #[must_use]
    pub const fn is_high_band(&self) -> bool {
        self.band & BAND_HIGH != 0
    }
}

/// Compute the carrier registers for `frequency` with a `xtal_hz` reference
///
/// Returns `None` outside the synthesizer range.
#[must_use]
pub fn carrier_registers(xtal_hz: u32, frequency: Frequency) -> Option<CarrierRegisters> {
    let xtal = u64::from(xtal_hz);
    let centihz = frequency.as_centihz();
    let high_band = centihz >= 16 * xtal * CENTIHZ_PER_HZ;
    let bands = if high_band { 2 } else { 1 };

    // N = f / (xtal / 3 × (hbsel + 1)), scaled by the fraction denominator
    let step = xtal * CENTIHZ_PER_HZ * bands;
    let scaled = (u128::from(centihz) * 3 * u128::from(FRACTION_DENOMINATOR) + u128::from(step) / 2)
        / u128::from(step);
    let scaled = u64::try_from(scaled).ok()?;
    let integer = scaled / FRACTION_DENOMINATOR;
    let fraction = scaled % FRACTION_DENOMINATOR;

    let fb = integer.checked_sub(24).filter(|fb| *fb <= 23)?;
    let band = BAND_SIDEBAND | if high_band { BAND_HIGH } else { 0 } | fb as u8;
    Some(CarrierRegisters {
        band,
        carrier_hi: (fraction >> 8) as u8,
        carrier_lo: (fraction & 0xFF) as u8,
    })
}

/// Frequency offset register values for a tone offset
///
/// One offset step is 156.25 Hz at a 30 MHz reference, scaled by the
/// reference and doubled in the high band. The 10-bit result saturates.
#[must_use]
pub fn offset_registers(xtal_hz: u32, high_band: bool, offset_centihz: u32) -> [u8; 2] {
    // 15 625 cHz × xtal / 30 MHz × (hbsel + 1)
    let bands: u64 = if high_band { 2 } else { 1 };
    let step_num = 15_625 * u64::from(xtal_hz) * bands;
    let step_den = 30_000_000u64;
    let steps = (u64::from(offset_centihz) * step_den + step_num / 2) / step_num;
    let steps = steps.min(0x1FF) as u16;
    [(steps & 0xFF) as u8, ((steps >> 8) & 0x03) as u8]
}

/// `Si4032` transmitter backend
pub struct Si4032<S> {
    spi: S,
    xtal_hz: u32,
    high_band: bool,
}

impl<S: SpiDevice> Si4032<S> {
    /// Create a driver on an SPI device
    #[must_use]
    pub const fn new(spi: S) -> Self {
        Self {
            spi,
            xtal_hz: SI4032_XTAL_HZ,
            high_band: true,
        }
    }

    /// Underlying SPI device
    pub const fn spi(&self) -> &S {
        &self.spi
    }

    /// Check if the last tuned carrier is in the high band
    #[must_use]
    pub const fn is_high_band(&self) -> bool {
        self.high_band
    }

    /// Write one register
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Bus`] on bus failure.
    pub fn write_reg(&mut self, register: u8, value: u8) -> Result<(), BackendError> {
        self.spi
            .write(&[register | WRITE_FLAG, value])
            .map_err(|_| BackendError::Bus)
    }

    /// Read one register
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Bus`] on bus failure.
    pub fn read_reg(&mut self, register: u8) -> Result<u8, BackendError> {
        let mut value = [0u8];
        self.spi
            .transaction(&mut [
                Operation::Write(&[register & !WRITE_FLAG]),
                Operation::Read(&mut value),
            ])
            .map_err(|_| BackendError::Bus)?;
        Ok(value[0])
    }

    /// Shift the carrier by a tone offset
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Bus`] on bus failure.
    pub fn set_offset(&mut self, offset_centihz: u32) -> Result<(), BackendError> {
        let [low, high] = offset_registers(self.xtal_hz, self.high_band, offset_centihz);
        self.write_reg(reg::FREQ_OFFSET_1, low)?;
        self.write_reg(reg::FREQ_OFFSET_2, high)
    }
}

impl<S: SpiDevice> RadioBackend for Si4032<S> {
    fn kind(&self) -> BackendKind {
        BackendKind::Si4032
    }

    fn set_frequency(&mut self, frequency: Frequency) -> Result<(), BackendError> {
        let regs = carrier_registers(self.xtal_hz, frequency).ok_or(BackendError::InvalidFrequency)?;
        self.write_reg(reg::BAND_SELECT, regs.band)?;
        self.write_reg(reg::CARRIER_1, regs.carrier_hi)?;
        self.write_reg(reg::CARRIER_0, regs.carrier_lo)?;
        self.high_band = regs.is_high_band();
        Ok(())
    }

    fn set_power(&mut self, power: PowerLevel) -> Result<(), BackendError> {
        self.write_reg(reg::TX_POWER, power.scaled(7))
    }

    fn set_modulation(&mut self, modulation: Modulation) -> Result<(), BackendError> {
        let value = match modulation {
            Modulation::None => 0x00,
            Modulation::Ook => 0x01,
            Modulation::Fsk => 0x02,
            // FSK, data from SDI (the bit-banged MOSI pin)
            Modulation::RawGpio => 0x12,
        };
        self.write_reg(reg::MODULATION_CONTROL, value)
    }

    fn enable_tx(&mut self) -> Result<(), BackendError> {
        self.write_reg(reg::OP_CONTROL, OP_TX)
    }

    fn disable_tx(&mut self) -> Result<(), BackendError> {
        self.write_reg(reg::OP_CONTROL, OP_READY)
    }
}
