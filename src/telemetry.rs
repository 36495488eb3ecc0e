//! Telemetry snapshot and payload producer contracts
//!
//! Sensor drivers and the GPS receiver live outside the transmission
//! engine. They hand over one [`TelemetrySnapshot`] per transmission through
//! a [`TelemetrySource`], and a [`PayloadProducer`] turns that snapshot into
//! the bytes an encoder consumes.

pub mod ax25;

use crate::encoder::Payload;

/// Battery voltage in millivolts
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatteryVoltage(u16);

impl BatteryVoltage {
    /// Create from millivolts
    #[must_use]
    pub const fn from_millivolts(mv: u16) -> Self {
        Self(mv)
    }

    /// Get voltage in millivolts
    #[must_use]
    pub const fn millivolts(self) -> u16 {
        self.0
    }

    /// Check if the two AA cells are near exhaustion
    #[must_use]
    pub const fn is_low(self) -> bool {
        self.0 < 2_000
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for BatteryVoltage {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{} mV", self.0);
    }
}

/// Temperature reading
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Temperature {
    /// Temperature in 0.1°C units
    raw_tenths: i16,
}

impl Temperature {
    /// Create from raw tenths of a degree
    #[must_use]
    pub const fn from_tenths(tenths: i16) -> Self {
        Self { raw_tenths: tenths }
    }

    /// Get temperature in tenths of a degree Celsius
    #[must_use]
    pub const fn tenths(self) -> i16 {
        self.raw_tenths
    }

    /// Get whole degrees Celsius (truncated toward zero)
    #[must_use]
    pub const fn celsius(self) -> i16 {
        self.raw_tenths / 10
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for Temperature {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{} dC", self.raw_tenths);
    }
}

/// GPS navigation solution
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GpsFix {
    /// GPS time of week in milliseconds
    pub time_of_week_ms: u32,
    /// GPS week number
    pub week: u16,
    /// Latitude in 1e-7 degrees
    pub latitude_e7: i32,
    /// Longitude in 1e-7 degrees
    pub longitude_e7: i32,
    /// Altitude above mean sea level in millimeters
    pub altitude_mm: i32,
    /// Ground speed in cm/s
    pub ground_speed_cm_s: u32,
    /// Heading in 1e-5 degrees
    pub heading_e5: i32,
    /// Vertical speed in cm/s, positive up
    pub climb_cm_s: i32,
    /// Satellites used in the solution
    pub satellites: u8,
    /// Solution is a valid 3D fix
    pub fix_ok: bool,
}

/// Fixed-shape telemetry record captured once per transmission
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TelemetrySnapshot {
    /// GPS solution
    pub gps: GpsFix,
    /// Battery voltage
    pub battery: BatteryVoltage,
    /// MCU temperature
    pub internal_temperature: Temperature,
    /// Sensor boom temperature
    pub external_temperature: Temperature,
    /// Pressure in 0.1 Pa
    pub pressure_decipascal: u32,
    /// Relative humidity in 0.1 %
    pub humidity_permille: u16,
    /// External pulse counter
    pub pulse_count: u16,
    /// Radiation counter, counts per minute
    pub radiation_cpm: u16,
    /// Maidenhead locator of the current position
    pub locator: heapless::String<8>,
    /// Transmissions since power-on
    pub sequence: u16,
}

/// Provider of telemetry snapshots
pub trait TelemetrySource {
    /// Capture the current telemetry
    fn snapshot(&mut self) -> TelemetrySnapshot;

    /// Current GPS time of week in milliseconds, `None` without GPS time
    fn time_of_week_ms(&self) -> Option<u32>;
}

/// Error raised by a payload producer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PayloadError {
    /// Encoded payload exceeds the buffer capacity
    TooLong,
    /// Message template could not be expanded
    Template,
    /// Telemetry needed by the format is missing (for example no GPS fix)
    MissingTelemetry,
}

#[cfg(feature = "embedded")]
impl defmt::Format for PayloadError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::TooLong => defmt::write!(f, "payload too long"),
            Self::Template => defmt::write!(f, "bad template"),
            Self::MissingTelemetry => defmt::write!(f, "missing telemetry"),
        }
    }
}

/// Turns a telemetry snapshot into encoder input
pub trait PayloadProducer {
    /// Write the payload for `snapshot` into `out`
    ///
    /// `out` is cleared before the call.
    ///
    /// # Errors
    ///
    /// Returns a [`PayloadError`] if no payload can be produced.
    fn encode(
        &self,
        snapshot: &TelemetrySnapshot,
        template: &str,
        out: &mut Payload,
    ) -> Result<(), PayloadError>;
}

impl<F> PayloadProducer for F
where
    F: Fn(&TelemetrySnapshot, &str, &mut Payload) -> Result<(), PayloadError>,
{
    fn encode(
        &self,
        snapshot: &TelemetrySnapshot,
        template: &str,
        out: &mut Payload,
    ) -> Result<(), PayloadError> {
        self(snapshot, template, out)
    }
}

/// Producer that sends the message template verbatim
///
/// Suits identification beacons in Morse that need no telemetry.
#[derive(Clone, Copy, Debug, Default)]
pub struct StaticMessage;

impl PayloadProducer for StaticMessage {
    fn encode(
        &self,
        _snapshot: &TelemetrySnapshot,
        template: &str,
        out: &mut Payload,
    ) -> Result<(), PayloadError> {
        if template.is_empty() {
            return Err(PayloadError::Template);
        }
        out.extend_from_slice(template.as_bytes())
            .map_err(|()| PayloadError::TooLong)
    }
}
