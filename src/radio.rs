//! Radio Control Logic
//!
//! Transmission scheduling and the real-time machinery behind it.
//! The scheduler walks a fixed list of schedule entries, builds a payload
//! and an encoder for each, and hands symbol output to one of several
//! strategies depending on the transmitter and mode.

pub mod backend;
pub mod peripheral;
pub mod signals;
pub mod schedule;
pub mod session;
pub mod symbol_clock;
pub mod realtime;
pub mod strategy;
pub mod scheduler;
