//! GPIO Abstractions
//!
//! Status LEDs plus the bit-banged SPI used while a real-time strategy
//! owns the transmitter. PB13 (SCK) and PB15 (MOSI) are switched between
//! the SPI2 alternate function and plain push-pull outputs; PC13 is the
//! radio chip select and always a GPIO.

use embassy_stm32::gpio::Output;
use embassy_stm32::pac;
use embassy_stm32::pac::gpio::vals::{CnfOut, Mode};

use crate::config::{DEFAULT_FREQUENCY_HZ, SI4032_XTAL_HZ, SI4063_XTAL_HZ};
use crate::drivers::{si4032, si4063};
use crate::radio::peripheral::{BusHandoff, Symbol, SymbolSink};
use crate::types::BackendKind;

/// Status LED state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LedState {
    /// LED is off
    #[default]
    Off,
    /// LED is on
    On,
}

impl defmt::Format for LedState {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Off => defmt::write!(f, "OFF"),
            Self::On => defmt::write!(f, "ON"),
        }
    }
}

/// Status LED driver (active low on the RS41)
pub struct StatusLed<'d> {
    pin: Output<'d>,
    state: LedState,
}

impl<'d> StatusLed<'d> {
    /// Create a new status LED (initially off)
    #[must_use]
    pub fn new(mut pin: Output<'d>) -> Self {
        pin.set_high();
        Self {
            pin,
            state: LedState::Off,
        }
    }

    /// Turn LED on
    pub fn on(&mut self) {
        self.pin.set_low();
        self.state = LedState::On;
    }

    /// Turn LED off
    pub fn off(&mut self) {
        self.pin.set_high();
        self.state = LedState::Off;
    }

    /// Toggle LED state
    pub fn toggle(&mut self) {
        match self.state {
            LedState::Off => self.on(),
            LedState::On => self.off(),
        }
    }

    /// Get current state
    #[must_use]
    pub const fn state(&self) -> LedState {
        self.state
    }
}

const SCK: usize = 13;
const MOSI: usize = 15;
const NSEL: usize = 13;

/// Configure a pin of the high control register (pins 8 to 15)
fn configure_high(port: pac::gpio::Gpio, pin: usize, cnf: CnfOut) {
    port.cr(1).modify(|w| {
        w.set_mode(pin - 8, Mode::OUTPUT50MHZ);
        w.set_cnf_out(pin - 8, cnf);
    });
}

fn set_pin(port: pac::gpio::Gpio, pin: usize, high: bool) {
    port.bsrr().write(|w| {
        if high {
            w.set_bs(pin, true);
        } else {
            w.set_br(pin, true);
        }
    });
}

/// Switch of SCK/MOSI between SPI2 and GPIO
pub struct BusPins {
    bitbang: bool,
}

impl BusPins {
    /// Pins start owned by SPI2
    #[must_use]
    pub const fn new() -> Self {
        Self { bitbang: false }
    }
}

impl BusHandoff for BusPins {
    fn to_bitbang(&mut self) {
        pac::SPI2.cr1().modify(|w| w.set_spe(false));
        set_pin(pac::GPIOB, SCK, false);
        configure_high(pac::GPIOB, SCK, CnfOut::PUSHPULL);
        configure_high(pac::GPIOB, MOSI, CnfOut::PUSHPULL);
        self.bitbang = true;
    }

    fn restore(&mut self) {
        set_pin(pac::GPIOC, NSEL, true);
        configure_high(pac::GPIOB, SCK, CnfOut::ALTPUSHPULL);
        configure_high(pac::GPIOB, MOSI, CnfOut::ALTPUSHPULL);
        pac::SPI2.cr1().modify(|w| w.set_spe(true));
        self.bitbang = false;
    }

    fn is_bitbang(&self) -> bool {
        self.bitbang
    }
}

/// Mode 0 SPI writes on the bit-banged pins
///
/// Used from the symbol timer interrupt, so every write is a short frame
/// with no status polling.
pub struct BitBangSpi {
    backend: Option<BackendKind>,
    si4063_outdiv: u32,
}

impl BitBangSpi {
    /// Unbound sink
    #[must_use]
    pub const fn new() -> Self {
        Self {
            backend: None,
            si4063_outdiv: si4063::band_for(DEFAULT_FREQUENCY_HZ).0,
        }
    }

    /// Clock out one frame with chip select held low
    pub fn write(&mut self, frame: &[u8]) {
        set_pin(pac::GPIOC, NSEL, false);
        for &byte in frame {
            for bit in (0..8).rev() {
                set_pin(pac::GPIOB, MOSI, byte & (1 << bit) != 0);
                set_pin(pac::GPIOB, SCK, true);
                set_pin(pac::GPIOB, SCK, false);
            }
        }
        set_pin(pac::GPIOC, NSEL, true);
    }

    fn write_si4032(&mut self, register: u8, value: u8) {
        self.write(&[register | si4032::WRITE_FLAG, value]);
    }
}

impl SymbolSink for BitBangSpi {
    fn bind(&mut self, backend: BackendKind) {
        self.backend = Some(backend);
    }

    fn emit(&mut self, symbol: Symbol) {
        match (self.backend, symbol) {
            (Some(BackendKind::Si4032), Symbol::Key(down)) => {
                let op = if down { si4032::OP_TX } else { si4032::OP_READY };
                self.write_si4032(si4032::reg::OP_CONTROL, op);
            }
            (Some(BackendKind::Si4032), Symbol::Offset(centihz)) => {
                let [low, high] = si4032::offset_registers(SI4032_XTAL_HZ, true, centihz);
                self.write_si4032(si4032::reg::FREQ_OFFSET_1, low);
                self.write_si4032(si4032::reg::FREQ_OFFSET_2, high);
            }
            (Some(BackendKind::Si4063), Symbol::Key(true)) => {
                self.write(&[si4063::cmd::START_TX, 0, 0, 0, 0]);
            }
            (Some(BackendKind::Si4063), Symbol::Key(false)) => {
                self.write(&[si4063::cmd::CHANGE_STATE, si4063::state::READY]);
            }
            (Some(BackendKind::Si4063), Symbol::Offset(centihz)) => {
                let command = si4063::offset_command(SI4063_XTAL_HZ, self.si4063_outdiv, centihz);
                self.write(&command);
            }
            // Si5351 is on I2C and never bit-banged
            (Some(BackendKind::Si5351) | None, _) => {}
        }
    }
}
