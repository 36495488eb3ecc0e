//! `Si4063` UHF Transceiver Driver
//!
//! Command/response device on SPI2. Every command waits for the
//! clear-to-send byte first. A missing CTS is logged and the command is
//! sent anyway; only commands that need a reply fail on a timeout.
//!
//! The hardware TX FIFO makes this the only backend for FIFO streaming.

use embedded_hal::spi::{Operation, SpiDevice};

use crate::config::{SI4063_CTS_RETRIES, SI4063_XTAL_HZ};
use crate::radio::backend::{BackendError, ChipState, FifoRadio, Modulation, RadioBackend};
use crate::types::{BackendKind, Frequency, PowerLevel, CENTIHZ_PER_HZ};

/// Command bytes
pub mod cmd {
    /// Set properties
    pub const SET_PROPERTY: u8 = 0x11;
    /// TX FIFO space and RX FIFO count
    pub const FIFO_INFO: u8 = 0x15;
    /// Read and clear interrupt flags
    pub const GET_INT_STATUS: u8 = 0x20;
    /// Start transmitting
    pub const START_TX: u8 = 0x31;
    /// Current operating state
    pub const REQUEST_DEVICE_STATE: u8 = 0x33;
    /// Change operating state
    pub const CHANGE_STATE: u8 = 0x34;
    /// Clear-to-send poll / response buffer read
    pub const READ_CMD_BUFF: u8 = 0x44;
    /// Append to the TX FIFO
    pub const WRITE_TX_FIFO: u8 = 0x66;
}

/// Property groups and indices as `(group, index)`
pub mod prop {
    /// Modulation type and source
    pub const MODEM_MOD_TYPE: (u8, u8) = (0x20, 0x00);
    /// Frequency offset
    pub const MODEM_FREQ_OFFSET: (u8, u8) = (0x20, 0x0D);
    /// Synthesizer band
    pub const MODEM_CLKGEN_BAND: (u8, u8) = (0x20, 0x51);
    /// PA power level
    pub const PA_PWR_LVL: (u8, u8) = (0x22, 0x01);
    /// Synthesizer integer and fraction
    pub const FREQ_CONTROL_INTE: (u8, u8) = (0x40, 0x00);
}

const CTS_READY: u8 = 0xFF;

/// Longest reply read back
const MAX_REPLY: usize = 8;

/// High-performance synthesizer select in `MODEM_CLKGEN_BAND`
const CLKGEN_SY_SEL: u8 = 0x08;

/// `CHIP_PEND` bit of FIFO underflow/overflow
const CHIP_FIFO_ERROR: u8 = 0x20;

/// `START_TX` condition: return to READY once the packet is sent
const TXCOMPLETE_READY: u8 = 0x30;

/// State codes of `CHANGE_STATE` and `REQUEST_DEVICE_STATE`
pub mod state {
    pub const SLEEP: u8 = 1;
    pub const READY: u8 = 3;
    pub const TX: u8 = 7;
}

/// Synthesizer output divider and band code for a carrier
#[must_use]
pub const fn band_for(hz: u32) -> (u32, u8) {
    if hz < 177_000_000 {
        (24, 5)
    } else if hz < 239_000_000 {
        (16, 4)
    } else if hz < 353_000_000 {
        (12, 3)
    } else if hz < 525_000_000 {
        (8, 2)
    } else if hz < 705_000_000 {
        (6, 1)
    } else {
        (4, 0)
    }
}

/// Synthesizer integer and 19-bit fraction
///
/// `f = 2 × xtal / outdiv × (inte + frac / 2^19)` with `frac` kept in
/// `2^19..2^20`.
#[must_use]
pub fn synth_words(xtal_hz: u32, outdiv: u32, frequency: Frequency) -> (u8, u32) {
    let den = 2 * u128::from(xtal_hz) * u128::from(CENTIHZ_PER_HZ);
    let scaled = u128::from(frequency.as_centihz()) * u128::from(outdiv) * (1 << 19) / den;
    let inte = (scaled >> 19).saturating_sub(1);
    let frac = scaled - (inte << 19);
    (inte as u8, frac as u32)
}

/// `SET_PROPERTY` command moving the carrier by `offset_centihz`
///
/// One offset unit is `2 × xtal / (outdiv × 2^19)`.
#[must_use]
pub fn offset_command(xtal_hz: u32, outdiv: u32, offset_centihz: u32) -> [u8; 6] {
    let unit_den = 2 * u64::from(xtal_hz) * CENTIHZ_PER_HZ;
    let steps = (u64::from(offset_centihz) * u64::from(outdiv) * (1 << 19) + unit_den / 2) / unit_den;
    let steps = steps.min(0x7FFF) as u16;
    let (group, index) = prop::MODEM_FREQ_OFFSET;
    let [hi, lo] = steps.to_be_bytes();
    [cmd::SET_PROPERTY, group, 2, index, hi, lo]
}

/// `Si4063` transceiver backend
pub struct Si4063<S> {
    spi: S,
    xtal_hz: u32,
    outdiv: u32,
}

impl<S: SpiDevice> Si4063<S> {
    /// Create a driver on an SPI device
    #[must_use]
    pub const fn new(spi: S) -> Self {
        Self {
            spi,
            xtal_hz: SI4063_XTAL_HZ,
            outdiv: 8,
        }
    }

    /// Underlying SPI device
    pub const fn spi(&self) -> &S {
        &self.spi
    }

    /// Output divider of the last tuned carrier
    #[must_use]
    pub const fn outdiv(&self) -> u32 {
        self.outdiv
    }

    /// Poll for clear-to-send; `false` if the chip never answered
    fn wait_cts(&mut self) -> Result<bool, BackendError> {
        for _ in 0..SI4063_CTS_RETRIES {
            let mut cts = [0u8];
            self.spi
                .transaction(&mut [
                    Operation::Write(&[cmd::READ_CMD_BUFF]),
                    Operation::Read(&mut cts),
                ])
                .map_err(|_| BackendError::Bus)?;
            if cts[0] == CTS_READY {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Send a command
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Bus`] on bus failure.
    pub fn command(&mut self, command: &[u8]) -> Result<(), BackendError> {
        if !self.wait_cts()? {
            warn!("Si4063 CTS timeout before command {:#x}", command.first().copied().unwrap_or(0));
        }
        self.spi.write(command).map_err(|_| BackendError::Bus)
    }

    /// Send a command and read its reply
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::AckTimeout`] if no reply arrives.
    pub fn query(&mut self, command: &[u8], reply: &mut [u8]) -> Result<(), BackendError> {
        self.command(command)?;
        let len = reply.len().min(MAX_REPLY);
        for _ in 0..SI4063_CTS_RETRIES {
            let mut buf = [0u8; MAX_REPLY + 1];
            self.spi
                .transaction(&mut [
                    Operation::Write(&[cmd::READ_CMD_BUFF]),
                    Operation::Read(&mut buf[..=len]),
                ])
                .map_err(|_| BackendError::Bus)?;
            if buf[0] == CTS_READY {
                reply[..len].copy_from_slice(&buf[1..=len]);
                return Ok(());
            }
        }
        warn!("Si4063 no reply to command {:#x}", command.first().copied().unwrap_or(0));
        Err(BackendError::AckTimeout)
    }

    /// Write consecutive properties of one group
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Bus`] on bus failure.
    pub fn set_property(&mut self, (group, index): (u8, u8), values: &[u8]) -> Result<(), BackendError> {
        let mut frame = [0u8; 16];
        let len = values.len().min(frame.len() - 4);
        frame[..4].copy_from_slice(&[cmd::SET_PROPERTY, group, len as u8, index]);
        frame[4..4 + len].copy_from_slice(&values[..len]);
        self.command(&frame[..4 + len])
    }

    fn change_state(&mut self, code: u8) -> Result<(), BackendError> {
        self.command(&[cmd::CHANGE_STATE, code])
    }
}

impl<S: SpiDevice> RadioBackend for Si4063<S> {
    fn kind(&self) -> BackendKind {
        BackendKind::Si4063
    }

    fn set_frequency(&mut self, frequency: Frequency) -> Result<(), BackendError> {
        let hz = frequency.as_hz();
        if !(142_000_000..=1_050_000_000).contains(&hz) {
            return Err(BackendError::InvalidFrequency);
        }
        let (outdiv, band) = band_for(hz);
        let (inte, frac) = synth_words(self.xtal_hz, outdiv, frequency);
        self.set_property(prop::MODEM_CLKGEN_BAND, &[CLKGEN_SY_SEL | band])?;
        let [_, f2, f1, f0] = frac.to_be_bytes();
        self.set_property(prop::FREQ_CONTROL_INTE, &[inte, f2, f1, f0])?;
        self.outdiv = outdiv;
        Ok(())
    }

    fn set_power(&mut self, power: PowerLevel) -> Result<(), BackendError> {
        self.set_property(prop::PA_PWR_LVL, &[power.scaled(127)])
    }

    fn set_modulation(&mut self, modulation: Modulation) -> Result<(), BackendError> {
        let value = match modulation {
            Modulation::None => 0x00,
            Modulation::Ook => 0x01,
            // 2-FSK from the packet handler (FIFO)
            Modulation::Fsk => 0x02,
            // 2-FSK, asynchronous direct mode from GPIO
            Modulation::RawGpio => 0x8A,
        };
        self.set_property(prop::MODEM_MOD_TYPE, &[value])
    }

    fn enable_tx(&mut self) -> Result<(), BackendError> {
        self.command(&[cmd::START_TX, 0, 0, 0, 0])
    }

    fn disable_tx(&mut self) -> Result<(), BackendError> {
        self.change_state(state::READY)
    }

    fn fifo(&mut self) -> Option<&mut dyn FifoRadio> {
        Some(self)
    }
}

impl<S: SpiDevice> FifoRadio for Si4063<S> {
    fn fifo_write(&mut self, data: &[u8]) -> Result<(), BackendError> {
        self.spi
            .transaction(&mut [Operation::Write(&[cmd::WRITE_TX_FIFO]), Operation::Write(data)])
            .map_err(|_| BackendError::Bus)
    }

    fn fifo_space(&mut self) -> Result<usize, BackendError> {
        let mut reply = [0u8; 2];
        self.query(&[cmd::FIFO_INFO, 0x00], &mut reply)?;
        Ok(usize::from(reply[1]))
    }

    fn fifo_underflow(&mut self) -> Result<bool, BackendError> {
        let mut reply = [0u8; 8];
        // Clear only the FIFO error bit of CHIP_PEND
        self.query(&[cmd::GET_INT_STATUS, 0xFF, 0xFF, !CHIP_FIFO_ERROR], &mut reply)?;
        Ok(reply[6] & CHIP_FIFO_ERROR != 0)
    }

    fn start_fifo_tx(&mut self, len: usize) -> Result<(), BackendError> {
        let [hi, lo] = u16::try_from(len).unwrap_or(u16::MAX).to_be_bytes();
        self.command(&[cmd::START_TX, 0, TXCOMPLETE_READY, hi, lo, 0, 0])
    }

    fn request_state(&mut self, target: ChipState) -> Result<(), BackendError> {
        let code = match target {
            ChipState::Sleep => state::SLEEP,
            ChipState::Ready => state::READY,
            ChipState::Tx => state::TX,
            ChipState::Other(code) => code,
        };
        self.change_state(code)
    }

    fn read_state(&mut self) -> Result<ChipState, BackendError> {
        let mut reply = [0u8; 2];
        self.query(&[cmd::REQUEST_DEVICE_STATE], &mut reply)?;
        Ok(match reply[0] & 0x0F {
            state::SLEEP => ChipState::Sleep,
            state::READY => ChipState::Ready,
            state::TX => ChipState::Tx,
            other => ChipState::Other(other),
        })
    }
}
