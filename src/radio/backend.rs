//! Radio backend contracts
//!
//! Every transmitter chip exposes the same small command set to the
//! scheduler. FIFO-capable chips additionally expose [`FifoRadio`].

use crate::types::{BackendKind, Frequency, PowerLevel};

/// Error reported by a radio backend
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendError {
    /// Bus transfer failed
    Bus,
    /// Chip did not reach the requested state in time
    Timeout,
    /// Chip did not acknowledge a command in time
    AckTimeout,
    /// Command or setting not supported by this chip
    Unsupported,
    /// Frequency outside the chip's synthesizer range
    InvalidFrequency,
}

#[cfg(feature = "embedded")]
impl defmt::Format for BackendError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Bus => defmt::write!(f, "bus error"),
            Self::Timeout => defmt::write!(f, "timeout"),
            Self::AckTimeout => defmt::write!(f, "ack timeout"),
            Self::Unsupported => defmt::write!(f, "unsupported"),
            Self::InvalidFrequency => defmt::write!(f, "invalid frequency"),
        }
    }
}

/// Modulation source configured on the chip
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Modulation {
    /// Unmodulated carrier (tones set by frequency or offset writes)
    #[default]
    None,
    /// On/off keying from the data pin
    Ook,
    /// FSK from the chip's own FIFO or offset register
    Fsk,
    /// Direct modulation from a GPIO waveform
    RawGpio,
}

#[cfg(feature = "embedded")]
impl defmt::Format for Modulation {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::None => defmt::write!(f, "none"),
            Self::Ook => defmt::write!(f, "OOK"),
            Self::Fsk => defmt::write!(f, "FSK"),
            Self::RawGpio => defmt::write!(f, "raw GPIO"),
        }
    }
}

/// Operating state of a FIFO-capable chip
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChipState {
    /// Lowest power state
    Sleep,
    /// Crystal running, ready to transmit
    Ready,
    /// Transmitting
    Tx,
    /// Any other state code reported by the chip
    Other(u8),
}

#[cfg(feature = "embedded")]
impl defmt::Format for ChipState {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Sleep => defmt::write!(f, "SLEEP"),
            Self::Ready => defmt::write!(f, "READY"),
            Self::Tx => defmt::write!(f, "TX"),
            Self::Other(code) => defmt::write!(f, "state {}", code),
        }
    }
}

/// Command set shared by all transmitters
pub trait RadioBackend {
    /// Which chip this is
    fn kind(&self) -> BackendKind;

    /// Tune the carrier
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] if the chip cannot be tuned there.
    fn set_frequency(&mut self, frequency: Frequency) -> Result<(), BackendError>;

    /// Set output power
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] on bus failure.
    fn set_power(&mut self, power: PowerLevel) -> Result<(), BackendError>;

    /// Select the modulation source
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Unsupported`] if the chip lacks the source.
    fn set_modulation(&mut self, modulation: Modulation) -> Result<(), BackendError>;

    /// Turn the transmitter on
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] on bus failure.
    fn enable_tx(&mut self) -> Result<(), BackendError>;

    /// Turn the transmitter off
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] on bus failure.
    fn disable_tx(&mut self) -> Result<(), BackendError>;

    /// FIFO command set, if the chip has one
    fn fifo(&mut self) -> Option<&mut dyn FifoRadio> {
        None
    }
}

/// Command set of chips with a hardware TX FIFO
pub trait FifoRadio {
    /// Append bytes to the TX FIFO
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] on bus failure.
    fn fifo_write(&mut self, data: &[u8]) -> Result<(), BackendError>;

    /// Free space in the TX FIFO
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] on bus failure.
    fn fifo_space(&mut self) -> Result<usize, BackendError>;

    /// Check (and clear) the FIFO underflow flag
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] on bus failure.
    fn fifo_underflow(&mut self) -> Result<bool, BackendError>;

    /// Start transmitting a packet of `len` bytes from the FIFO
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] on bus failure.
    fn start_fifo_tx(&mut self, len: usize) -> Result<(), BackendError>;

    /// Request an operating state
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] on bus failure.
    fn request_state(&mut self, state: ChipState) -> Result<(), BackendError>;

    /// Read the current operating state
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] on bus failure.
    fn read_state(&mut self) -> Result<ChipState, BackendError>;
}

/// Lookup of fitted backends by kind
pub trait BackendSet {
    /// Backend of `kind`, or `None` if it is not fitted
    fn backend(&mut self, kind: BackendKind) -> Option<&mut dyn RadioBackend>;
}

/// One optional slot per supported chip
#[derive(Debug, Default)]
pub struct Backends<A, B, C> {
    /// `Si4032`, if fitted
    pub si4032: Option<A>,
    /// `Si4063`, if fitted
    pub si4063: Option<B>,
    /// `Si5351`, if fitted
    pub si5351: Option<C>,
}

impl<A, B, C> Backends<A, B, C> {
    /// No backend fitted
    #[must_use]
    pub const fn new() -> Self {
        Self {
            si4032: None,
            si4063: None,
            si5351: None,
        }
    }

    /// Fit an `Si4032`
    #[must_use]
    pub fn with_si4032(mut self, backend: A) -> Self {
        self.si4032 = Some(backend);
        self
    }

    /// Fit an `Si4063`
    #[must_use]
    pub fn with_si4063(mut self, backend: B) -> Self {
        self.si4063 = Some(backend);
        self
    }

    /// Fit an `Si5351`
    #[must_use]
    pub fn with_si5351(mut self, backend: C) -> Self {
        self.si5351 = Some(backend);
        self
    }
}

impl<A, B, C> BackendSet for Backends<A, B, C>
where
    A: RadioBackend,
    B: RadioBackend,
    C: RadioBackend,
{
    fn backend(&mut self, kind: BackendKind) -> Option<&mut dyn RadioBackend> {
        match kind {
            BackendKind::Si4032 => self.si4032.as_mut().map(|b| b as &mut dyn RadioBackend),
            BackendKind::Si4063 => self.si4063.as_mut().map(|b| b as &mut dyn RadioBackend),
            BackendKind::Si5351 => self.si5351.as_mut().map(|b| b as &mut dyn RadioBackend),
        }
    }
}
