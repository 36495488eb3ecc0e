//! Transmission schedule
//!
//! A schedule is a fixed, non-empty slice of [`ScheduleEntry`] built at
//! startup. The [`ScheduleCursor`] walks it round-robin.

use core::fmt;

use crate::config::{DEFAULT_POST_TX_DELAY_MS, TIME_SYNC_TOLERANCE_S};
use crate::encoder::EncoderConfig;
use crate::telemetry::PayloadProducer;
use crate::types::{BackendKind, DataMode, Frequency, PowerLevel};

/// Schedule construction error
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScheduleError {
    /// The schedule has no entries
    Empty,
}

#[cfg(feature = "embedded")]
impl defmt::Format for ScheduleError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Empty => defmt::write!(f, "empty schedule"),
        }
    }
}

/// Transmission start window aligned to GPS time
///
/// With `period_s > 0` an entry may only start within
/// [`TIME_SYNC_TOLERANCE_S`] after `offset_s` into each period, counted
/// from the start of the GPS week.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TimeSyncWindow {
    /// Window period in seconds (0 = no synchronisation)
    pub period_s: u32,
    /// Window start within the period in seconds
    pub offset_s: u32,
}

impl TimeSyncWindow {
    /// No synchronisation
    pub const NONE: Self = Self {
        period_s: 0,
        offset_s: 0,
    };

    /// Window every `period_s` seconds at `offset_s`
    #[must_use]
    pub const fn new(period_s: u32, offset_s: u32) -> Self {
        Self { period_s, offset_s }
    }

    /// Check if synchronisation is configured
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.period_s > 0
    }

    /// Check if a transmission may start at GPS time of week `tow_ms`
    #[must_use]
    pub const fn is_open(&self, tow_ms: u32) -> bool {
        if self.period_s == 0 {
            return true;
        }
        let phase = (tow_ms / 1_000) % self.period_s;
        let offset = self.offset_s % self.period_s;
        let since_offset = (phase + self.period_s - offset) % self.period_s;
        since_offset <= TIME_SYNC_TOLERANCE_S
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for TimeSyncWindow {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{}s+{}s", self.period_s, self.offset_s);
    }
}

/// One scheduled transmission
#[derive(Clone, Copy)]
pub struct ScheduleEntry<'a> {
    /// Transmitter to use
    pub backend: BackendKind,
    /// Data mode
    pub mode: DataMode,
    /// Carrier frequency, including any sub-hertz offset
    pub frequency: Frequency,
    /// Output power
    pub power: PowerLevel,
    /// Encoder variant and timing
    pub encoder: EncoderConfig,
    /// Back-to-back transmissions before the cursor moves on
    pub repeat: u8,
    /// Delay before this entry starts, in milliseconds
    pub post_tx_delay_ms: u32,
    /// GPS time alignment
    pub time_sync: TimeSyncWindow,
    /// Builds the payload from telemetry
    pub producer: &'a dyn PayloadProducer,
    /// Message template passed to the producer
    pub template: &'a str,
}

impl<'a> ScheduleEntry<'a> {
    /// Entry with default power, one repeat, the default delay and no sync
    #[must_use]
    pub fn new(
        backend: BackendKind,
        mode: DataMode,
        frequency: Frequency,
        encoder: EncoderConfig,
        producer: &'a dyn PayloadProducer,
        template: &'a str,
    ) -> Self {
        Self {
            backend,
            mode,
            frequency,
            power: PowerLevel::default(),
            encoder,
            repeat: 1,
            post_tx_delay_ms: DEFAULT_POST_TX_DELAY_MS,
            time_sync: TimeSyncWindow::NONE,
            producer,
            template,
        }
    }

    /// Set the output power
    #[must_use]
    pub const fn with_power(mut self, power: PowerLevel) -> Self {
        self.power = power;
        self
    }

    /// Set the repeat count (at least one transmission)
    #[must_use]
    pub const fn with_repeat(mut self, repeat: u8) -> Self {
        self.repeat = if repeat == 0 { 1 } else { repeat };
        self
    }

    /// Set the delay before this entry
    #[must_use]
    pub const fn with_post_tx_delay_ms(mut self, ms: u32) -> Self {
        self.post_tx_delay_ms = ms;
        self
    }

    /// Align starts to GPS time
    #[must_use]
    pub const fn with_time_sync(mut self, window: TimeSyncWindow) -> Self {
        self.time_sync = window;
        self
    }
}

impl fmt::Debug for ScheduleEntry<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduleEntry")
            .field("backend", &self.backend)
            .field("mode", &self.mode)
            .field("frequency", &self.frequency)
            .field("power", &self.power)
            .field("encoder", &self.encoder)
            .field("repeat", &self.repeat)
            .field("post_tx_delay_ms", &self.post_tx_delay_ms)
            .field("time_sync", &self.time_sync)
            .field("template", &self.template)
            .finish_non_exhaustive()
    }
}

/// Position in the schedule
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScheduleCursor {
    index: usize,
    len: usize,
    /// Transmissions of the current entry so far
    sent: u8,
}

impl ScheduleCursor {
    /// Cursor at the first of `len` entries
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::Empty`] if `len` is zero.
    pub const fn new(len: usize) -> Result<Self, ScheduleError> {
        if len == 0 {
            return Err(ScheduleError::Empty);
        }
        Ok(Self {
            index: 0,
            len,
            sent: 0,
        })
    }

    /// Index of the current entry
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Record one transmission of the current entry
    ///
    /// Moves to the next entry (wrapping) once it has been sent `repeat`
    /// times and returns `true` in that case.
    pub fn complete(&mut self, repeat: u8) -> bool {
        self.sent = self.sent.saturating_add(1);
        if self.sent < repeat.max(1) {
            return false;
        }
        self.sent = 0;
        self.index = (self.index + 1) % self.len;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsynchronised_window_is_always_open() {
        for tow in [0, 999, 123_456_789] {
            assert!(TimeSyncWindow::NONE.is_open(tow));
        }
    }

    #[test]
    fn window_opens_at_offset() {
        // Every two minutes, one second in (WSPR)
        let window = TimeSyncWindow::new(120, 1);
        assert!(!window.is_open(0));
        assert!(window.is_open(1_000));
        assert!(window.is_open(2_999));
        assert!(!window.is_open(3_000));
        assert!(window.is_open(121_500));
    }

    #[test]
    fn window_wraps_around_period() {
        let window = TimeSyncWindow::new(15, 14);
        assert!(window.is_open(14_000));
        assert!(window.is_open(15_000));
        assert!(!window.is_open(16_000));
    }

    #[test]
    fn cursor_wraps() {
        let mut cursor = ScheduleCursor::new(2).unwrap();
        assert!(cursor.complete(1));
        assert_eq!(cursor.index(), 1);
        assert!(cursor.complete(1));
        assert_eq!(cursor.index(), 0);
    }

    #[test]
    fn cursor_holds_for_repeats() {
        let mut cursor = ScheduleCursor::new(3).unwrap();
        assert!(!cursor.complete(3));
        assert!(!cursor.complete(3));
        assert_eq!(cursor.index(), 0);
        assert!(cursor.complete(3));
        assert_eq!(cursor.index(), 1);
    }

    #[test]
    fn empty_schedule_rejected() {
        assert_eq!(ScheduleCursor::new(0), Err(ScheduleError::Empty));
    }
}
