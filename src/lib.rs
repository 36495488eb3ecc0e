//! Beacon Transmission Engine Library
//!
//! This library provides the transmission engine for a battery-powered
//! airborne beacon built around an STM32F100 and one or more on-board
//! transmitters (Si4032, Si4063, Si5351). Telemetry is turned into tones by
//! a family of encoders and keyed out on a fixed round-robin schedule with
//! symbol timing tight enough for third-party decoders.
//!
//! # Architecture
//!
//! The firmware is organized in layers:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    SCHEDULER LAYER                           │
//! │  Round-robin schedule  │  TX state machine  │  Reports       │
//! ├─────────────────────────────────────────────────────────────┤
//! │                 REAL-TIME STRATEGIES                         │
//! │  Tick-stepped │ Timer ISR │ PWM+DMA │ Busy-wait │ FIFO       │
//! ├─────────────────────────────────────────────────────────────┤
//! │                     ENCODER LAYER                            │
//! │  AFSK/HDLC  │  M-FSK  │  Morse  │  Raw  │  Symbol tables     │
//! ├─────────────────────────────────────────────────────────────┤
//! │                   HAL / DRIVER LAYER                         │
//! │  Si4032  │  Si4063  │  Si5351  │  SysTick │ TIM │ DMA │ GPIO │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Design Principles
//!
//! - **Type-driven design**: Custom types enforce invariants at compile time
//! - **No unsafe in application code**: All unsafe isolated in HAL layers
//! - **Ownership as protocol**: the encoder is moved into the interrupt
//!   context for ISR-driven strategies, so the main loop cannot touch it
//! - **Explicit error handling**: All fallible operations return `Result`

#![cfg_attr(feature = "embedded", no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// This must go first so the logging macros are visible to every module
mod fmt;

// Re-export dependencies needed by applications (only in embedded mode)
#[cfg(feature = "embedded")]
pub use embassy_executor;
#[cfg(feature = "embedded")]
pub use embassy_stm32;
#[cfg(feature = "embedded")]
pub use embassy_time;

/// Hardware Abstraction Layer
///
/// Register-bus helpers plus the STM32F100 implementations of the
/// real-time peripheral traits.
pub mod hal;

/// Peripheral Drivers
///
/// Drivers for the transmitter ICs (Si4032, Si4063, Si5351).
pub mod drivers;

/// Waveform and synthesizer arithmetic
pub mod dsp;

/// Tone encoders
///
/// Turn a byte payload into a finite sequence of tone indices.
pub mod encoder;

/// Radio Control Logic
///
/// Transmission scheduler, backend contracts and real-time strategies.
pub mod radio;

/// Telemetry snapshot and payload producer contracts
pub mod telemetry;

/// Shared types used across modules
pub mod types;

/// System configuration and constants
pub mod config;

/// Prelude module for common imports
pub mod prelude {
    //! Convenient re-exports for common types and traits.

    pub use crate::config::*;
    pub use crate::types::*;

    pub use crate::encoder::{Encoder, EncoderConfig, ToneEncoder};
    pub use crate::radio::backend::{BackendSet, Backends, RadioBackend};
    pub use crate::radio::schedule::{ScheduleEntry, TimeSyncWindow};
    pub use crate::radio::realtime::SharedRealTime;
    pub use crate::radio::scheduler::{Scheduler, TxOutcome, TxReport, TxState};
    pub use crate::radio::session::Strategy;
    pub use crate::radio::signals::TxSignals;
    pub use crate::telemetry::{PayloadProducer, TelemetrySnapshot, TelemetrySource};

    // Error handling
    pub use core::result::Result;
}
