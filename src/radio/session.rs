//! Strategy selection and the active radio session

use super::backend::Modulation;
use crate::types::{BackendKind, DataMode};

/// How symbols of a transmission reach the transmitter
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    /// Main loop steps the encoder on a tick countdown and retunes the chip
    TickStepped,
    /// Symbol timer interrupt writes each symbol over the bit-banged bus
    InterruptToggle,
    /// PWM waveform fed by circular DMA, refilled from DMA interrupts
    DmaWaveform,
    /// Calibrated busy loop writing PWM periods with the tick suspended
    BusyWait,
    /// Bytes streamed into the radio's TX FIFO
    FifoStream,
}

impl Strategy {
    /// Strategy for a mode on a backend, `None` if unsupported
    #[must_use]
    pub const fn select(backend: BackendKind, mode: DataMode) -> Option<Self> {
        match (backend, mode) {
            (BackendKind::Si4032 | BackendKind::Si4063, DataMode::Cw | DataMode::Horus) => {
                Some(Self::InterruptToggle)
            }
            (BackendKind::Si4032, DataMode::Aprs) => Some(Self::DmaWaveform),
            (BackendKind::Si4063, DataMode::Aprs) => Some(Self::BusyWait),
            (BackendKind::Si4063, DataMode::Cats) => Some(Self::FifoStream),
            (
                BackendKind::Si5351,
                DataMode::Cw
                | DataMode::Horus
                | DataMode::Wspr
                | DataMode::Ft8
                | DataMode::Jt65
                | DataMode::Jt9
                | DataMode::Jt4,
            ) => Some(Self::TickStepped),
            _ => None,
        }
    }

    /// Chip modulation source the strategy drives
    #[must_use]
    pub const fn modulation(self, keyed: bool) -> Modulation {
        match self {
            Self::InterruptToggle if keyed => Modulation::Ook,
            Self::InterruptToggle | Self::FifoStream => Modulation::Fsk,
            Self::DmaWaveform | Self::BusyWait => Modulation::RawGpio,
            Self::TickStepped => Modulation::None,
        }
    }

    /// Check if the strategy needs the SPI pins as GPIO
    #[must_use]
    pub const fn uses_bitbang(self) -> bool {
        matches!(self, Self::InterruptToggle | Self::DmaWaveform | Self::BusyWait)
    }

    /// Check if the system tick is stopped while the strategy runs
    #[must_use]
    pub const fn suspends_tick(self) -> bool {
        matches!(self, Self::InterruptToggle | Self::BusyWait)
    }

    /// Check if symbols are produced from interrupt context
    #[must_use]
    pub const fn runs_in_isr(self) -> bool {
        matches!(self, Self::InterruptToggle | Self::DmaWaveform)
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for Strategy {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::TickStepped => defmt::write!(f, "tick-stepped"),
            Self::InterruptToggle => defmt::write!(f, "interrupt"),
            Self::DmaWaveform => defmt::write!(f, "DMA"),
            Self::BusyWait => defmt::write!(f, "busy-wait"),
            Self::FifoStream => defmt::write!(f, "FIFO"),
        }
    }
}

/// Resources claimed by the transmission in progress
///
/// The scheduler holds at most one session. The flags record which
/// shared resources must be given back when it ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RadioBackendSession {
    backend: BackendKind,
    mode: DataMode,
    strategy: Strategy,
    tick_suspended: bool,
    bus_bitbang: bool,
    started_tick: u32,
}

impl RadioBackendSession {
    /// Open a session with no shared resources claimed yet
    #[must_use]
    pub const fn new(
        backend: BackendKind,
        mode: DataMode,
        strategy: Strategy,
        started_tick: u32,
    ) -> Self {
        Self {
            backend,
            mode,
            strategy,
            tick_suspended: false,
            bus_bitbang: false,
            started_tick,
        }
    }

    /// Active backend
    #[must_use]
    pub const fn backend(&self) -> BackendKind {
        self.backend
    }

    /// Data mode
    #[must_use]
    pub const fn mode(&self) -> DataMode {
        self.mode
    }

    /// Strategy in use
    #[must_use]
    pub const fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Check if the system tick was suspended for this session
    #[must_use]
    pub const fn tick_suspended(&self) -> bool {
        self.tick_suspended
    }

    /// Check if the SPI bus was handed to GPIO for this session
    #[must_use]
    pub const fn bus_bitbang(&self) -> bool {
        self.bus_bitbang
    }

    /// Tick at which the session opened
    #[must_use]
    pub const fn started_tick(&self) -> u32 {
        self.started_tick
    }

    pub(crate) fn mark_tick_suspended(&mut self) {
        self.tick_suspended = true;
    }

    pub(crate) fn mark_bus_bitbang(&mut self) {
        self.bus_bitbang = true;
    }
}
