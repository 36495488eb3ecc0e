//! `Si5351A` Clock Synthesizer Driver
//!
//! Used as an HF transmitter: one clock output drives the PA directly.
//! Tones are produced by retuning the output per symbol, so the PLL
//! fraction carries all fine tuning and the multisynth divider stays put
//! between adjacent tones. A PLL reset (which glitches the output) is only
//! issued when the divider actually changes.

use embedded_hal::i2c::I2c;

use crate::config::{SI5351_READY_RETRIES, SI5351_XTAL_FREQ};
use crate::dsp::si5351_calc::{calculate_frequency, MsParams, PllParams};
use crate::hal::i2c::{I2cAddress, I2cBus};
use crate::radio::backend::{BackendError, Modulation, RadioBackend};
use crate::types::{BackendKind, Frequency, PowerLevel};

/// `Si5351A` register addresses
mod reg {
    pub const DEVICE_STATUS: u8 = 0;
    pub const OUTPUT_ENABLE: u8 = 3;
    pub const CLK0_CONTROL: u8 = 16;
    pub const CLK1_CONTROL: u8 = 17;
    pub const CLK2_CONTROL: u8 = 18;
    pub const PLLA_PARAMS: u8 = 26;
    pub const MS0_PARAMS: u8 = 42;
    pub const MS1_PARAMS: u8 = 50;
    pub const MS2_PARAMS: u8 = 58;
    pub const PLL_RESET: u8 = 177;
    pub const CRYSTAL_LOAD: u8 = 183;
}

/// `SYS_INIT` bit of the device status register
const SYS_INIT: u8 = 0x80;

/// Clock control: integer multisynth, PLL A, multisynth source
const CLK_CONTROL_BASE: u8 = 0x4C;

/// Clock control: output powered down
const CLK_POWER_DOWN: u8 = 0x80;

/// PLL reset register value for PLL A
const PLLA_RESET: u8 = 0x20;

/// Clock output identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ClockOutput {
    /// CLK0 output
    #[default]
    Clk0,
    /// CLK1 output
    Clk1,
    /// CLK2 output
    Clk2,
}

impl ClockOutput {
    /// Get the control register for this output
    const fn control_reg(self) -> u8 {
        match self {
            Self::Clk0 => reg::CLK0_CONTROL,
            Self::Clk1 => reg::CLK1_CONTROL,
            Self::Clk2 => reg::CLK2_CONTROL,
        }
    }

    /// Get the multisynth parameter base register
    const fn ms_reg(self) -> u8 {
        match self {
            Self::Clk0 => reg::MS0_PARAMS,
            Self::Clk1 => reg::MS1_PARAMS,
            Self::Clk2 => reg::MS2_PARAMS,
        }
    }

    /// Get the output enable bit
    const fn enable_bit(self) -> u8 {
        match self {
            Self::Clk0 => 0,
            Self::Clk1 => 1,
            Self::Clk2 => 2,
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for ClockOutput {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Clk0 => defmt::write!(f, "CLK0"),
            Self::Clk1 => defmt::write!(f, "CLK1"),
            Self::Clk2 => defmt::write!(f, "CLK2"),
        }
    }
}

/// Drive strength setting
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DriveStrength {
    /// 2mA drive
    Drive2mA,
    /// 4mA drive
    Drive4mA,
    /// 6mA drive
    Drive6mA,
    /// 8mA drive (maximum)
    #[default]
    Drive8mA,
}

impl DriveStrength {
    /// Closest drive strength for a power level
    #[must_use]
    pub const fn from_power(power: PowerLevel) -> Self {
        match power.as_percent() {
            0..=24 => Self::Drive2mA,
            25..=49 => Self::Drive4mA,
            50..=74 => Self::Drive6mA,
            _ => Self::Drive8mA,
        }
    }

    /// Get register value
    const fn as_reg(self) -> u8 {
        match self {
            Self::Drive2mA => 0,
            Self::Drive4mA => 1,
            Self::Drive6mA => 2,
            Self::Drive8mA => 3,
        }
    }
}

/// Crystal load capacitance
#[derive(Clone, Copy, Debug, Default)]
pub enum CrystalLoad {
    /// 6 pF load
    Load6pF,
    /// 8 pF load
    Load8pF,
    /// 10 pF load
    #[default]
    Load10pF,
}

impl CrystalLoad {
    const fn as_reg(self) -> u8 {
        match self {
            Self::Load6pF => 0b0100_0000,
            Self::Load8pF => 0b1000_0000,
            Self::Load10pF => 0b1100_0000,
        }
    }
}

/// `Si5351A` transmitter backend
pub struct Si5351<I> {
    bus: I2cBus<I>,
    xtal_hz: u32,
    output: ClockOutput,
    drive: DriveStrength,
    /// Output enable register shadow (bit set = output off)
    output_enable: u8,
    /// Multisynth setting currently programmed
    multisynth: Option<MsParams>,
    pll: Option<PllParams>,
}

impl<I: I2c> Si5351<I> {
    /// Create a driver transmitting on `output`
    #[must_use]
    pub const fn new(i2c: I, output: ClockOutput) -> Self {
        Self {
            bus: I2cBus::new(i2c),
            xtal_hz: SI5351_XTAL_FREQ,
            output,
            drive: DriveStrength::Drive8mA,
            output_enable: 0xFF,
            multisynth: None,
            pll: None,
        }
    }

    /// Use a calibrated crystal frequency
    #[must_use]
    pub const fn with_xtal(mut self, xtal_hz: u32) -> Self {
        self.xtal_hz = xtal_hz;
        self
    }

    /// Underlying bus
    pub const fn bus(&self) -> &I {
        self.bus.inner()
    }

    /// Multisynth setting currently programmed
    #[must_use]
    pub const fn multisynth(&self) -> Option<MsParams> {
        self.multisynth
    }

    /// Bring the chip to a known state with every output off
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Bus`] on bus failure.
    pub fn init(&mut self, load: CrystalLoad) -> Result<(), BackendError> {
        self.wait_ready()?;
        self.write(reg::OUTPUT_ENABLE, 0xFF)?;
        self.write(reg::CRYSTAL_LOAD, load.as_reg())?;
        for clk in [ClockOutput::Clk0, ClockOutput::Clk1, ClockOutput::Clk2] {
            self.write(clk.control_reg(), CLK_POWER_DOWN)?;
        }
        self.output_enable = 0xFF;
        self.multisynth = None;
        self.pll = None;
        Ok(())
    }

    /// Wait for `SYS_INIT` to clear
    fn wait_ready(&mut self) -> Result<(), BackendError> {
        for _ in 0..SI5351_READY_RETRIES {
            let status = self
                .bus
                .read_reg(I2cAddress::SI5351, reg::DEVICE_STATUS)
                .map_err(|_| BackendError::Bus)?;
            if status & SYS_INIT == 0 {
                return Ok(());
            }
        }
        // Timeout, but continue anyway
        warn!("Si5351 still initialising, continuing");
        Ok(())
    }

    fn write(&mut self, register: u8, value: u8) -> Result<(), BackendError> {
        self.bus
            .write_reg(I2cAddress::SI5351, register, value)
            .map_err(|_| BackendError::Bus)
    }

    fn control(&self) -> u8 {
        CLK_CONTROL_BASE | self.drive.as_reg()
    }

    fn program_pll(&mut self, params: &PllParams) -> Result<(), BackendError> {
        let (p1, p2, p3) = params.to_registers();
        let regs = [
            ((p3 >> 8) & 0xFF) as u8,
            (p3 & 0xFF) as u8,
            ((p1 >> 16) & 0x03) as u8,
            ((p1 >> 8) & 0xFF) as u8,
            (p1 & 0xFF) as u8,
            (((p3 >> 12) & 0xF0) | ((p2 >> 16) & 0x0F)) as u8,
            ((p2 >> 8) & 0xFF) as u8,
            (p2 & 0xFF) as u8,
        ];
        self.bus
            .write_regs(I2cAddress::SI5351, reg::PLLA_PARAMS, &regs)
            .map_err(|_| BackendError::Bus)
    }

    fn program_multisynth(&mut self, params: &MsParams) -> Result<(), BackendError> {
        let (p1, p2, p3) = params.to_registers();
        let regs = [
            ((p3 >> 8) & 0xFF) as u8,
            (p3 & 0xFF) as u8,
            (params.r_div << 4) | ((p1 >> 16) as u8 & 0x03),
            ((p1 >> 8) & 0xFF) as u8,
            (p1 & 0xFF) as u8,
            (((p3 >> 12) & 0xF0) | ((p2 >> 16) & 0x0F)) as u8,
            ((p2 >> 8) & 0xFF) as u8,
            (p2 & 0xFF) as u8,
        ];
        self.bus
            .write_regs(I2cAddress::SI5351, self.output.ms_reg(), &regs)
            .map_err(|_| BackendError::Bus)
    }
}

impl<I: I2c> RadioBackend for Si5351<I> {
    fn kind(&self) -> BackendKind {
        BackendKind::Si5351
    }

    fn set_frequency(&mut self, frequency: Frequency) -> Result<(), BackendError> {
        let plan = calculate_frequency(u64::from(self.xtal_hz), frequency.as_centihz())
            .ok_or(BackendError::InvalidFrequency)?;
        if self.pll != Some(plan.pll) {
            self.program_pll(&plan.pll)?;
            self.pll = Some(plan.pll);
        }
        if self.multisynth != Some(plan.ms) {
            self.program_multisynth(&plan.ms)?;
            let control = self.control();
            self.write(self.output.control_reg(), control)?;
            self.write(reg::PLL_RESET, PLLA_RESET)?;
            self.multisynth = Some(plan.ms);
        }
        trace!("Si5351 {} cHz (error {})", plan.actual_centihz, plan.error_centihz);
        Ok(())
    }

    fn set_power(&mut self, power: PowerLevel) -> Result<(), BackendError> {
        self.drive = DriveStrength::from_power(power);
        if self.multisynth.is_some() {
            let control = self.control();
            self.write(self.output.control_reg(), control)?;
        }
        Ok(())
    }

    fn set_modulation(&mut self, modulation: Modulation) -> Result<(), BackendError> {
        match modulation {
            Modulation::None | Modulation::Ook => Ok(()),
            Modulation::Fsk | Modulation::RawGpio => Err(BackendError::Unsupported),
        }
    }

    fn enable_tx(&mut self) -> Result<(), BackendError> {
        self.output_enable &= !(1 << self.output.enable_bit());
        self.write(reg::OUTPUT_ENABLE, self.output_enable)
    }

    fn disable_tx(&mut self) -> Result<(), BackendError> {
        self.output_enable |= 1 << self.output.enable_bit();
        self.write(reg::OUTPUT_ENABLE, self.output_enable)
    }
}
