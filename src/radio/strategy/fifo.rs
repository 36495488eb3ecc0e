//! FIFO streaming strategy
//!
//! The payload is streamed into the transmitter's hardware TX FIFO: a
//! prefill up to the free space, packet start, then top-ups on every main
//! loop pass. An underflow means the chip has already sent garbage, so the
//! stream is abandoned at once and nothing more is written, even after the
//! last byte is queued. Once all bytes
//! are queued, the chip gets a bounded time to return from TX on its own
//! before it is forced to READY.

use crate::config::{ms_to_ticks, FIFO_COMPLETION_TIMEOUT_MS, FIFO_STREAM_TIMEOUT_MS};
use crate::radio::backend::{BackendError, ChipState, FifoRadio};

/// How a FIFO transmission ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FifoOutcome {
    /// The chip sent the whole packet and left TX
    Completed {
        /// Bytes streamed
        bytes: usize,
    },
    /// The FIFO ran dry mid-packet
    Underflow {
        /// Bytes written before the underflow was seen
        bytes_written: usize,
    },
    /// Streaming or completion took too long
    Timeout {
        /// Bytes written before the timeout
        bytes: usize,
    },
    /// A FIFO command failed
    Error(BackendError),
}

#[cfg(feature = "embedded")]
impl defmt::Format for FifoOutcome {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Completed { bytes } => defmt::write!(f, "completed ({} bytes)", bytes),
            Self::Underflow { bytes_written } => {
                defmt::write!(f, "underflow after {} bytes", bytes_written);
            }
            Self::Timeout { bytes } => defmt::write!(f, "timeout after {} bytes", bytes),
            Self::Error(e) => defmt::write!(f, "error: {}", e),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Streaming,
    Draining { since: u32 },
    Done(FifoOutcome),
}

/// FIFO stream in progress
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FifoStream {
    written: usize,
    started: u32,
    phase: Phase,
}

impl FifoStream {
    /// Prefill the FIFO and start the packet
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] if a FIFO command fails.
    pub fn start(radio: &mut dyn FifoRadio, data: &[u8], now: u32) -> Result<Self, BackendError> {
        let space = radio.fifo_space()?;
        let prefill = space.min(data.len());
        radio.fifo_write(&data[..prefill])?;
        radio.start_fifo_tx(data.len())?;
        debug!("FIFO prefilled {} of {} bytes", prefill, data.len());
        let phase = if prefill == data.len() {
            Phase::Draining { since: now }
        } else {
            Phase::Streaming
        };
        Ok(Self {
            written: prefill,
            started: now,
            phase,
        })
    }

    /// Bytes written to the FIFO so far
    #[must_use]
    pub const fn bytes_written(&self) -> usize {
        self.written
    }

    /// One main-loop step; returns the outcome once the stream has ended
    pub fn poll(&mut self, radio: &mut dyn FifoRadio, data: &[u8], now: u32) -> Option<FifoOutcome> {
        if let Phase::Done(outcome) = self.phase {
            return Some(outcome);
        }
        let outcome = match self.step(radio, data, now) {
            Ok(outcome) => outcome?,
            Err(e) => FifoOutcome::Error(e),
        };
        self.phase = Phase::Done(outcome);
        Some(outcome)
    }

    fn step(
        &mut self,
        radio: &mut dyn FifoRadio,
        data: &[u8],
        now: u32,
    ) -> Result<Option<FifoOutcome>, BackendError> {
        match self.phase {
            Phase::Streaming => {
                if radio.fifo_underflow()? {
                    warn!("FIFO underflow after {} bytes", self.written);
                    return Ok(Some(FifoOutcome::Underflow {
                        bytes_written: self.written,
                    }));
                }
                if now.wrapping_sub(self.started) > ms_to_ticks(FIFO_STREAM_TIMEOUT_MS) {
                    warn!("FIFO stream timeout after {} bytes", self.written);
                    radio.request_state(ChipState::Ready)?;
                    return Ok(Some(FifoOutcome::Timeout {
                        bytes: self.written,
                    }));
                }
                let space = radio.fifo_space()?;
                let end = (self.written + space).min(data.len());
                if end > self.written {
                    radio.fifo_write(&data[self.written..end])?;
                    self.written = end;
                }
                if self.written == data.len() {
                    self.phase = Phase::Draining { since: now };
                }
                Ok(None)
            }
            Phase::Draining { since } => {
                // The last top-up can race the chip's transmitter
                if radio.fifo_underflow()? {
                    warn!("FIFO underflow after all {} bytes queued", self.written);
                    return Ok(Some(FifoOutcome::Underflow {
                        bytes_written: self.written,
                    }));
                }
                if radio.read_state()? != ChipState::Tx {
                    return Ok(Some(FifoOutcome::Completed {
                        bytes: self.written,
                    }));
                }
                if now.wrapping_sub(since) > ms_to_ticks(FIFO_COMPLETION_TIMEOUT_MS) {
                    warn!("radio still in TX, forcing READY");
                    radio.request_state(ChipState::Ready)?;
                    return Ok(Some(FifoOutcome::Timeout {
                        bytes: self.written,
                    }));
                }
                Ok(None)
            }
            Phase::Done(outcome) => Ok(Some(outcome)),
        }
    }
}
