//! AX.25 UI Frame Producer
//!
//! Builds the buffer the AFSK encoder expects for APRS: opening flag,
//! address field, UI control and PID, information field, FCS and closing
//! flag. The message template uses the usual TNC2 notation,
//! `SOURCE>DEST[,PATH...]:information`.

use super::{PayloadError, PayloadProducer, TelemetrySnapshot};
use crate::encoder::afsk::HDLC_FLAG;
use crate::encoder::Payload;

/// Unnumbered information frame
pub const CONTROL_UI: u8 = 0x03;

/// No layer 3 protocol
pub const PID_NO_LAYER3: u8 = 0xF0;

/// Digipeater entries allowed after destination and source
pub const MAX_PATH_LEN: usize = 8;

const CALLSIGN_LEN: usize = 6;

/// Reserved SSID bits, always set
const SSID_RESERVED: u8 = 0x60;

/// Address extension bit marking the last address
const ADDRESS_LAST: u8 = 0x01;

/// Reflected CRC-16/CCITT polynomial
const CRC16_POLY: u16 = 0x8408;

/// Frame check sequence over `data` (CRC-16/X.25)
#[must_use]
pub fn crc16_ccitt(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for &byte in data {
        crc ^= u16::from(byte);
        for _ in 0..8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ CRC16_POLY
            } else {
                crc >> 1
            };
        }
    }
    crc ^ 0xFFFF
}

/// Station address, `CALL` or `CALL-SSID`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Address<'a> {
    callsign: &'a str,
    ssid: u8,
}

impl<'a> Address<'a> {
    /// Parse `CALL[-SSID]`
    ///
    /// The callsign is 1 to 6 upper-case letters or digits and the SSID
    /// 0 to 15.
    #[must_use]
    pub fn parse(text: &'a str) -> Option<Self> {
        let (callsign, ssid) = match text.split_once('-') {
            Some((call, ssid)) => (call, ssid.parse::<u8>().ok().filter(|s| *s <= 15)?),
            None => (text, 0),
        };
        let valid = (1..=CALLSIGN_LEN).contains(&callsign.len())
            && callsign
                .bytes()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit());
        valid.then_some(Self { callsign, ssid })
    }

    /// Callsign without SSID
    #[must_use]
    pub const fn callsign(&self) -> &'a str {
        self.callsign
    }

    /// Secondary station identifier
    #[must_use]
    pub const fn ssid(&self) -> u8 {
        self.ssid
    }

    /// The seven address bytes: shifted, space-padded callsign then SSID
    #[must_use]
    pub fn to_bytes(&self, last: bool) -> [u8; 7] {
        let mut bytes = [b' ' << 1; 7];
        for (slot, ch) in bytes.iter_mut().zip(self.callsign.bytes()) {
            *slot = ch << 1;
        }
        bytes[CALLSIGN_LEN] = SSID_RESERVED | (self.ssid << 1) | if last { ADDRESS_LAST } else { 0 };
        bytes
    }
}

/// Write a complete flagged UI frame into `out`
///
/// # Errors
///
/// Returns [`PayloadError::TooLong`] if the frame does not fit.
pub fn ui_frame(
    destination: Address<'_>,
    source: Address<'_>,
    path: &[Address<'_>],
    info: &[u8],
    out: &mut Payload,
) -> Result<(), PayloadError> {
    out.clear();
    out.push(HDLC_FLAG).map_err(|_| PayloadError::TooLong)?;
    let body_start = out.len();

    let mut push = |bytes: &[u8]| out.extend_from_slice(bytes).map_err(|()| PayloadError::TooLong);
    push(&destination.to_bytes(false))?;
    push(&source.to_bytes(path.is_empty()))?;
    for (i, hop) in path.iter().enumerate() {
        push(&hop.to_bytes(i + 1 == path.len()))?;
    }
    push(&[CONTROL_UI, PID_NO_LAYER3])?;
    push(info)?;

    let fcs = crc16_ccitt(&out[body_start..]);
    let [low, high] = fcs.to_le_bytes();
    out.extend_from_slice(&[low, high, HDLC_FLAG])
        .map_err(|()| PayloadError::TooLong)
}

/// Producer framing a TNC2-style template as an AX.25 UI frame
///
/// Telemetry is not substituted; the information field goes out as
/// written.
#[derive(Clone, Copy, Debug, Default)]
pub struct AprsFrame;

impl PayloadProducer for AprsFrame {
    fn encode(
        &self,
        _snapshot: &TelemetrySnapshot,
        template: &str,
        out: &mut Payload,
    ) -> Result<(), PayloadError> {
        let (header, info) = template.split_once(':').ok_or(PayloadError::Template)?;
        let (source, route) = header.split_once('>').ok_or(PayloadError::Template)?;
        let source = Address::parse(source).ok_or(PayloadError::Template)?;

        let mut hops = route.split(',');
        let destination = hops
            .next()
            .and_then(Address::parse)
            .ok_or(PayloadError::Template)?;
        let mut path: heapless::Vec<Address<'_>, MAX_PATH_LEN> = heapless::Vec::new();
        for hop in hops {
            let hop = Address::parse(hop).ok_or(PayloadError::Template)?;
            path.push(hop).map_err(|_| PayloadError::Template)?;
        }

        ui_frame(destination, source, &path, info.as_bytes(), out)
    }
}
