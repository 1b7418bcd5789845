// Venturi - a GDL90 traffic and navigation aggregator
// Copyright (C) 2026  Venturi Authors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! GDL90 message encoding per the FAA public ICD:
//! https://www.faa.gov/air_traffic/technology/adsb/archival/media/GDL90_Public_ICD_RevA.PDF
//!
//! Pure functions, no state. A message body is the one-byte message id
//! plus payload; framing appends the CRC, byte-stuffs 0x7D/0x7E and
//! wraps the result in flag bytes.

use std::error::Error;
use std::fmt;

const MSG_ID_HEARTBEAT: u8 = 0x00;
const MSG_ID_OWNSHIP_REPORT: u8 = 0x0A;
const MSG_ID_OWNSHIP_GEO_ALTITUDE: u8 = 0x0B;
const MSG_ID_TRAFFIC_REPORT: u8 = 0x14;

const FLAG: u8 = 0x7E;
const ESCAPE: u8 = 0x7D;

// CRC-16-CCITT, polynomial 0x1021, initial value 0 (ICD p. 7)
const CRC16_TABLE: [u16; 256] = [
    0x0000, 0x1021, 0x2042, 0x3063, 0x4084, 0x50A5, 0x60C6, 0x70E7, 0x8108, 0x9129, 0xA14A, 0xB16B,
    0xC18C, 0xD1AD, 0xE1CE, 0xF1EF, 0x1231, 0x0210, 0x3273, 0x2252, 0x52B5, 0x4294, 0x72F7, 0x62D6,
    0x9339, 0x8318, 0xB37B, 0xA35A, 0xD3BD, 0xC39C, 0xF3FF, 0xE3DE, 0x2462, 0x3443, 0x0420, 0x1401,
    0x64E6, 0x74C7, 0x44A4, 0x5485, 0xA56A, 0xB54B, 0x8528, 0x9509, 0xE5EE, 0xF5CF, 0xC5AC, 0xD58D,
    0x3653, 0x2672, 0x1611, 0x0630, 0x76D7, 0x66F6, 0x5695, 0x46B4, 0xB75B, 0xA77A, 0x9719, 0x8738,
    0xF7DF, 0xE7FE, 0xD79D, 0xC7BC, 0x48C4, 0x58E5, 0x6886, 0x78A7, 0x0840, 0x1861, 0x2802, 0x3823,
    0xC9CC, 0xD9ED, 0xE98E, 0xF9AF, 0x8948, 0x9969, 0xA90A, 0xB92B, 0x5AF5, 0x4AD4, 0x7AB7, 0x6A96,
    0x1A71, 0x0A50, 0x3A33, 0x2A12, 0xDBFD, 0xCBDC, 0xFBBF, 0xEB9E, 0x9B79, 0x8B58, 0xBB3B, 0xAB1A,
    0x6CA6, 0x7C87, 0x4CE4, 0x5CC5, 0x2C22, 0x3C03, 0x0C60, 0x1C41, 0xEDAE, 0xFD8F, 0xCDEC, 0xDDCD,
    0xAD2A, 0xBD0B, 0x8D68, 0x9D49, 0x7E97, 0x6EB6, 0x5ED5, 0x4EF4, 0x3E13, 0x2E32, 0x1E51, 0x0E70,
    0xFF9F, 0xEFBE, 0xDFDD, 0xCFFC, 0xBF1B, 0xAF3A, 0x9F59, 0x8F78, 0x9188, 0x81A9, 0xB1CA, 0xA1EB,
    0xD10C, 0xC12D, 0xF14E, 0xE16F, 0x1080, 0x00A1, 0x30C2, 0x20E3, 0x5004, 0x4025, 0x7046, 0x6067,
    0x83B9, 0x9398, 0xA3FB, 0xB3DA, 0xC33D, 0xD31C, 0xE37F, 0xF35E, 0x02B1, 0x1290, 0x22F3, 0x32D2,
    0x4235, 0x5214, 0x6277, 0x7256, 0xB5EA, 0xA5CB, 0x95A8, 0x8589, 0xF56E, 0xE54F, 0xD52C, 0xC50D,
    0x34E2, 0x24C3, 0x14A0, 0x0481, 0x7466, 0x6447, 0x5424, 0x4405, 0xA7DB, 0xB7FA, 0x8799, 0x97B8,
    0xE75F, 0xF77E, 0xC71D, 0xD73C, 0x26D3, 0x36F2, 0x0691, 0x16B0, 0x6657, 0x7676, 0x4615, 0x5634,
    0xD94C, 0xC96D, 0xF90E, 0xE92F, 0x99C8, 0x89E9, 0xB98A, 0xA9AB, 0x5844, 0x4865, 0x7806, 0x6827,
    0x18C0, 0x08E1, 0x3882, 0x28A3, 0xCB7D, 0xDB5C, 0xEB3F, 0xFB1E, 0x8BF9, 0x9BD8, 0xABBB, 0xBB9A,
    0x4A75, 0x5A54, 0x6A37, 0x7A16, 0x0AF1, 0x1AD0, 0x2AB3, 0x3A92, 0xFD2E, 0xED0F, 0xDD6C, 0xCD4D,
    0xBDAA, 0xAD8B, 0x9DE8, 0x8DC9, 0x7C26, 0x6C07, 0x5C64, 0x4C45, 0x3CA2, 0x2C83, 0x1CE0, 0x0CC1,
    0xEF1F, 0xFF3E, 0xCF5D, 0xDF7C, 0xAF9B, 0xBFBA, 0x8FD9, 0x9FF8, 0x6E17, 0x7E36, 0x4E55, 0x5E74,
    0x2E93, 0x3EB2, 0x0ED1, 0x1EF0,
];

#[derive(Debug, PartialEq)]
pub enum Gdl90Error {
    TrackOutOfRange(f64),
}

impl fmt::Display for Gdl90Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Gdl90Error::TrackOutOfRange(track) => write!(
                f,
                "track out of bounds, must be between 0 and 360 degrees, got {}",
                track
            ),
        }
    }
}

impl Error for Gdl90Error {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrafficAlertStatus {
    NoAlert = 0,
    TrafficAlert = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressType {
    AdsbIcao = 0,
    AdsbSelfAssigned = 1,
    TisbIcao = 2,
    TisbTrackFile = 3,
    SurfaceVehicle = 4,
    GroundStationBeacon = 5,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackIndicator {
    NotValid = 0x0,
    TrueTrackAngle = 0x1,
    HeadingMagnetic = 0x2,
    HeadingTrue = 0x3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportIndicator {
    Updated = 0x0,
    Extrapolated = 0x4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AirborneIndicator {
    OnGround = 0x0,
    Airborne = 0x8,
}

/// Emitter category per ICD table 11.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitterCategory {
    NoInfo = 0,
    Light = 1,
    Small = 2,
    Large = 3,
    HighVortexLarge = 4,
    Heavy = 5,
    HighlyManeuverable = 6,
    Rotorcraft = 7,
    Glider = 9,
    LighterThanAir = 10,
    SkyDiver = 11,
    Paraglider = 12,
    Unmanned = 14,
    Spaceship = 15,
    SurfaceVehicleEmergency = 17,
    SurfaceVehicleService = 18,
    PointObstacle = 19,
    ClusterObstacle = 20,
    LineObstacle = 21,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmergencyCode {
    NoEmergency = 0,
    General = 1,
    Medical = 2,
    MinimumFuel = 3,
    NoCommunication = 4,
    UnlawfulInterference = 5,
    DownedAircraft = 6,
}

/// Heartbeat message (id 0), sent once per second.
#[derive(Debug, Clone, PartialEq)]
pub struct HeartbeatMessage {
    pub pos_valid: bool,
    pub is_initialized: bool,
    pub is_low_battery: bool,
    /// Seconds since 0000Z.
    pub time: u32,
    /// 0 to 31.
    pub uplink_msg_count: u8,
    /// 0 to 1023.
    pub basic_and_long_msg_count: u16,
}

/// Traffic report (id 20). The ownship report (id 10) shares this exact
/// layout under a different message id.
#[derive(Debug, Clone, PartialEq)]
pub struct TrafficMessage {
    pub status: TrafficAlertStatus,
    pub addr_type: AddressType,
    /// 24-bit transponder address.
    pub address: u32,
    /// Degrees, positive north.
    pub latitude: f64,
    /// Degrees, positive east.
    pub longitude: f64,
    /// Feet referenced to 29.92 inHg, -1000 to 101350.
    pub altitude: i32,
    pub track_indicator: TrackIndicator,
    pub report_indicator: ReportIndicator,
    pub airborne_indicator: AirborneIndicator,
    /// 0 to 11, 11 is best.
    pub nav_integrity_cat: u8,
    /// 0 to 11, 11 is best.
    pub nav_accuracy_cat: u8,
    /// Knots.
    pub h_velocity: i32,
    /// Feet per minute; None encodes "no vertical rate available".
    pub v_velocity: Option<i32>,
    /// Degrees, 0 to 360.
    pub track: f64,
    pub emitter: EmitterCategory,
    /// Up to 8 ASCII characters.
    pub callsign: String,
    pub emergency: EmergencyCode,
}

impl Default for TrafficMessage {
    fn default() -> Self {
        TrafficMessage {
            status: TrafficAlertStatus::NoAlert,
            addr_type: AddressType::AdsbIcao,
            address: 0,
            latitude: 0.0,
            longitude: 0.0,
            altitude: 0,
            track_indicator: TrackIndicator::NotValid,
            report_indicator: ReportIndicator::Updated,
            airborne_indicator: AirborneIndicator::OnGround,
            nav_integrity_cat: 0,
            nav_accuracy_cat: 0,
            h_velocity: 0,
            v_velocity: Some(0),
            track: 0.0,
            emitter: EmitterCategory::NoInfo,
            callsign: String::new(),
            emergency: EmergencyCode::NoEmergency,
        }
    }
}

/// Ownship geometric altitude message (id 11).
#[derive(Debug, Clone, PartialEq)]
pub struct OwnshipGeoAltitudeMessage {
    /// Feet, 5 ft resolution.
    pub altitude: i32,
    /// Vertical figure of merit in meters; None encodes "unknown".
    pub merit: Option<u16>,
    pub is_warning: bool,
}

impl EmitterCategory {
    pub fn from_wire(v: u8) -> EmitterCategory {
        use EmitterCategory::*;
        match v {
            1 => Light,
            2 => Small,
            3 => Large,
            4 => HighVortexLarge,
            5 => Heavy,
            6 => HighlyManeuverable,
            7 => Rotorcraft,
            9 => Glider,
            10 => LighterThanAir,
            11 => SkyDiver,
            12 => Paraglider,
            14 => Unmanned,
            15 => Spaceship,
            17 => SurfaceVehicleEmergency,
            18 => SurfaceVehicleService,
            19 => PointObstacle,
            20 => ClusterObstacle,
            21 => LineObstacle,
            _ => NoInfo,
        }
    }
}

pub fn encode_heartbeat(msg: &HeartbeatMessage) -> Vec<u8> {
    let mut buf = [0u8; 7];
    buf[0] = MSG_ID_HEARTBEAT;

    if msg.pos_valid {
        buf[1] |= 0x80;
    }
    if msg.is_initialized {
        buf[1] |= 0x01;
    }
    if msg.is_low_battery {
        buf[1] |= 0x08;
    }

    let mut timestamp = msg.time;
    if timestamp & 0x1_0000 != 0 {
        timestamp &= 0xFFFF;
        buf[2] |= 0x80;
    }
    buf[3] = (timestamp & 0xFF) as u8;
    buf[4] = ((timestamp >> 8) & 0xFF) as u8;

    let count =
        ((msg.uplink_msg_count as u16 & 0x1F) << 11) | (msg.basic_and_long_msg_count & 0x3FF);
    buf[5] = (count >> 8) as u8;
    buf[6] = (count & 0xFF) as u8;

    frame(&buf)
}

pub fn encode_ownship(msg: &TrafficMessage) -> Result<Vec<u8>, Gdl90Error> {
    encode_report(MSG_ID_OWNSHIP_REPORT, msg)
}

pub fn encode_traffic(msg: &TrafficMessage) -> Result<Vec<u8>, Gdl90Error> {
    encode_report(MSG_ID_TRAFFIC_REPORT, msg)
}

pub fn encode_ownship_geo_altitude(msg: &OwnshipGeoAltitudeMessage) -> Vec<u8> {
    let mut buf = [0u8; 5];
    buf[0] = MSG_ID_OWNSHIP_GEO_ALTITUDE;

    let alt = ((msg.altitude / 5) & 0xFFFF) as u16;
    buf[1] = (alt >> 8) as u8;
    buf[2] = (alt & 0xFF) as u8;

    let word = encode_merit(msg.merit) | if msg.is_warning { 0x8000 } else { 0x0000 };
    buf[3] = (word >> 8) as u8;
    buf[4] = (word & 0xFF) as u8;

    frame(&buf)
}

// st aa aa aa ll ll ll nn nn nn dd dm ia hh hv vv tt ee cc cc cc cc cc cc cc cc px
fn encode_report(msg_id: u8, msg: &TrafficMessage) -> Result<Vec<u8>, Gdl90Error> {
    let mut buf = [0u8; 28];
    buf[0] = msg_id;
    buf[1] = ((msg.status as u8) << 4) | (msg.addr_type as u8);
    buf[2] = ((msg.address & 0xFF0000) >> 16) as u8;
    buf[3] = ((msg.address & 0x00FF00) >> 8) as u8;
    buf[4] = (msg.address & 0x0000FF) as u8;

    let lat = encode_latlon(msg.latitude);
    buf[5] = ((lat & 0xFF0000) >> 16) as u8;
    buf[6] = ((lat & 0x00FF00) >> 8) as u8;
    buf[7] = (lat & 0x0000FF) as u8;

    let lon = encode_latlon(msg.longitude);
    buf[8] = ((lon & 0xFF0000) >> 16) as u8;
    buf[9] = ((lon & 0x00FF00) >> 8) as u8;
    buf[10] = (lon & 0x0000FF) as u8;

    let alt = encode_altitude(msg.altitude);
    let misc =
        msg.track_indicator as u8 | msg.report_indicator as u8 | msg.airborne_indicator as u8;
    buf[11] = ((alt & 0xFF0) >> 4) as u8;
    buf[12] = (((alt & 0x00F) << 4) as u8) | misc;

    buf[13] = ((msg.nav_integrity_cat & 0xF) << 4) | (msg.nav_accuracy_cat & 0xF);

    let h_vel = encode_h_velocity(msg.h_velocity);
    let v_vel = encode_v_velocity(msg.v_velocity);
    buf[14] = ((h_vel & 0xFF0) >> 4) as u8;
    buf[15] = (((h_vel & 0x00F) << 4) | ((v_vel & 0xF00) >> 8)) as u8;
    buf[16] = (v_vel & 0x0FF) as u8;

    buf[17] = encode_track(msg.track)?;
    buf[18] = msg.emitter as u8;
    buf[19..27].copy_from_slice(&encode_callsign(&msg.callsign));
    buf[27] = (msg.emergency as u8) << 4;

    Ok(frame(&buf))
}

/// Signed 24-bit two's complement, 180/2^23 degrees resolution. The
/// scaled value truncates toward zero.
fn encode_latlon(degrees: f64) -> u32 {
    let scaled = (degrees * (0x7FFFFF as f64 / 180.0)) as i32;
    (scaled as u32) & 0xFFFFFF
}

/// 12-bit field, 25 ft resolution, -1000 ft offset.
fn encode_altitude(ft: i32) -> u16 {
    (((ft + 1000) / 25) & 0xFFF) as u16
}

fn encode_h_velocity(kt: i32) -> u16 {
    if kt < 0 {
        0
    } else if kt > 0xFFE {
        0xFFE
    } else {
        kt as u16
    }
}

/// 64 ft/min resolution, signed 12 bits; 0x800 means unavailable.
fn encode_v_velocity(fpm: Option<i32>) -> u16 {
    match fpm {
        None => 0x800,
        Some(v) if v > 32576 => 0x1FE,
        Some(v) if v < -32576 => 0xE02,
        Some(v) => ((v / 64) & 0xFFF) as u16,
    }
}

/// 360/256 degrees resolution; 360 wraps to 0, anything outside the
/// range is a caller error.
fn encode_track(track: f64) -> Result<u8, Gdl90Error> {
    if !(0.0..=360.0).contains(&track) {
        return Err(Gdl90Error::TrackOutOfRange(track));
    }
    let track = if track == 360.0 { 0.0 } else { track };
    Ok((track * 256.0 / 360.0).floor() as u8)
}

/// Left-justified, space padded, 8 bytes.
fn encode_callsign(callsign: &str) -> [u8; 8] {
    let mut out = [b' '; 8];
    for (i, b) in callsign.bytes().take(8).enumerate() {
        out[i] = b;
    }
    out
}

fn encode_merit(merit: Option<u16>) -> u16 {
    match merit {
        None => 0x7FFF,
        Some(m) if m >= 32766 => 0x7FFE,
        Some(m) => m,
    }
}

/// Append the CRC, byte-stuff and wrap in flag bytes. The CRC is
/// transmitted low byte first.
fn frame(body: &[u8]) -> Vec<u8> {
    let mut crc: u16 = 0;
    for b in body {
        crc = CRC16_TABLE[(crc >> 8) as usize] ^ (crc << 8) ^ (*b as u16);
    }
    let tail = [(crc & 0xFF) as u8, (crc >> 8) as u8];

    let mut out = Vec::with_capacity(body.len() + 4);
    out.push(FLAG);
    for b in body.iter().chain(tail.iter()) {
        if *b == FLAG || *b == ESCAPE {
            out.push(ESCAPE);
            out.push(*b ^ 0x20);
        } else {
            out.push(*b);
        }
    }
    out.push(FLAG);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Inverse of [`frame`]: unwrap, unstuff and verify the CRC.
    fn deframe(encoded: &[u8]) -> Vec<u8> {
        assert_eq!(encoded[0], FLAG);
        assert_eq!(*encoded.last().unwrap(), FLAG);
        let mut body = Vec::new();
        let mut escaped = false;
        for b in &encoded[1..encoded.len() - 1] {
            if escaped {
                body.push(b ^ 0x20);
                escaped = false;
            } else if *b == ESCAPE {
                escaped = true;
            } else {
                assert_ne!(*b, FLAG);
                body.push(*b);
            }
        }
        let (payload, crc_bytes) = body.split_at(body.len() - 2);
        let mut crc: u16 = 0;
        for b in payload {
            crc = CRC16_TABLE[(crc >> 8) as usize] ^ (crc << 8) ^ (*b as u16);
        }
        assert_eq!([(crc & 0xFF) as u8, (crc >> 8) as u8], crc_bytes);
        payload.to_vec()
    }

    #[test]
    fn test_encode_heartbeat() {
        let msg = HeartbeatMessage {
            pos_valid: true,
            is_initialized: true,
            is_low_battery: false,
            time: 54502,
            uplink_msg_count: 4,
            basic_and_long_msg_count: 567,
        };
        let expected = [
            0x7E, 0x00, 0x81, 0x00, 0xE6, 0xD4, 0x22, 0x37, 0x56, 0xB8, 0x7E,
        ];
        assert_eq!(encode_heartbeat(&msg), &expected);
    }

    #[test]
    fn test_encode_heartbeat_timestamp_high_bit() {
        let msg = HeartbeatMessage {
            pos_valid: false,
            is_initialized: false,
            is_low_battery: true,
            time: 0x1_0001,
            uplink_msg_count: 0,
            basic_and_long_msg_count: 0,
        };
        let body = deframe(&encode_heartbeat(&msg));
        assert_eq!(body[1], 0x08);
        assert_eq!(body[2], 0x80);
        assert_eq!(body[3], 0x01);
        assert_eq!(body[4], 0x00);
    }

    #[test]
    fn test_encode_traffic() {
        let msg = TrafficMessage {
            address: 0xAB4549,
            latitude: 44.90708,
            longitude: -122.99488,
            altitude: 5000,
            track_indicator: TrackIndicator::TrueTrackAngle,
            airborne_indicator: AirborneIndicator::Airborne,
            nav_integrity_cat: 10,
            nav_accuracy_cat: 9,
            h_velocity: 123,
            v_velocity: Some(64),
            track: 45.0,
            emitter: EmitterCategory::Light,
            callsign: "N825V".to_string(),
            ..Default::default()
        };
        let expected = [
            0x7E, 0x14, 0x00, 0xAB, 0x45, 0x49, 0x1F, 0xEF, 0x15, 0xA8, 0x89, 0x78, 0x0F, 0x09,
            0xA9, 0x07, 0xB0, 0x01, 0x20, 0x01, 0x4E, 0x38, 0x32, 0x35, 0x56, 0x20, 0x20, 0x20,
            0x00, 0x57, 0xD6, 0x7E,
        ];
        assert_eq!(encode_traffic(&msg).unwrap(), &expected);
    }

    #[test]
    fn test_encode_ownship() {
        let msg = TrafficMessage {
            address: 0,
            latitude: 49.99999999986941,
            longitude: 8.000522948457947,
            altitude: 3280,
            track_indicator: TrackIndicator::TrueTrackAngle,
            airborne_indicator: AirborneIndicator::Airborne,
            nav_integrity_cat: 8,
            nav_accuracy_cat: 9,
            h_velocity: 80,
            v_velocity: Some(0),
            track: 90.0,
            emitter: EmitterCategory::Light,
            callsign: "D-EZAA".to_string(),
            ..Default::default()
        };
        let expected = [
            0x7E, 0x0A, 0x00, 0x00, 0x00, 0x00, 0x23, 0x8E, 0x38, 0x05, 0xB0, 0x73, 0x0A, 0xB9,
            0x89, 0x05, 0x00, 0x00, 0x40, 0x01, 0x44, 0x2D, 0x45, 0x5A, 0x41, 0x41, 0x20, 0x20,
            0x00, 0x37, 0x22, 0x7E,
        ];
        assert_eq!(encode_ownship(&msg).unwrap(), &expected);
    }

    #[test]
    fn test_encode_ownship_geo_altitude() {
        let msg = OwnshipGeoAltitudeMessage {
            altitude: 3280,
            merit: Some(50),
            is_warning: false,
        };
        let expected = [0x7E, 0x0B, 0x02, 0x90, 0x00, 0x32, 0x18, 0x15, 0x7E];
        assert_eq!(encode_ownship_geo_altitude(&msg), &expected);
    }

    #[test]
    fn test_encode_merit_defaults() {
        let body = deframe(&encode_ownship_geo_altitude(&OwnshipGeoAltitudeMessage {
            altitude: 0,
            merit: None,
            is_warning: false,
        }));
        assert_eq!(&body[3..5], &[0x7F, 0xFF]);

        let body = deframe(&encode_ownship_geo_altitude(&OwnshipGeoAltitudeMessage {
            altitude: 0,
            merit: Some(40000),
            is_warning: true,
        }));
        assert_eq!(&body[3..5], &[0xFF, 0xFE]);
    }

    #[test]
    fn test_encode_altitude_boundaries() {
        assert_eq!(encode_altitude(-1000), 0x000);
        assert_eq!(encode_altitude(-975), 0x001);
        assert_eq!(encode_altitude(0), 0x028);
        assert_eq!(encode_altitude(101350), 0xFFE);
    }

    #[test]
    fn test_encode_track_boundaries() {
        assert_eq!(encode_track(0.0).unwrap(), 0x00);
        assert_eq!(encode_track(360.0).unwrap(), 0x00);
        assert_eq!(encode_track(45.0).unwrap(), 0x20);
        assert_eq!(encode_track(180.0).unwrap(), 0x80);
        assert_eq!(encode_track(359.9).unwrap(), 0xFF);
        assert!(encode_track(-0.1).is_err());
        assert!(encode_track(360.1).is_err());
    }

    #[test]
    fn test_encode_h_velocity_clamps() {
        assert_eq!(encode_h_velocity(-5), 0);
        assert_eq!(encode_h_velocity(123), 123);
        assert_eq!(encode_h_velocity(5000), 0xFFE);
    }

    #[test]
    fn test_encode_v_velocity() {
        assert_eq!(encode_v_velocity(None), 0x800);
        assert_eq!(encode_v_velocity(Some(0)), 0x000);
        assert_eq!(encode_v_velocity(Some(64)), 0x001);
        assert_eq!(encode_v_velocity(Some(-1000)), 0xFF1);
        assert_eq!(encode_v_velocity(Some(33000)), 0x1FE);
        assert_eq!(encode_v_velocity(Some(-33000)), 0xE02);
    }

    #[test]
    fn test_latlon_round_trip() {
        let resolution = 180.0 / 0x7FFFFF as f64;
        for &deg in &[0.0, 44.90708, -122.99488, 89.9, -89.9, 179.99, -179.99] {
            let encoded = encode_latlon(deg);
            // sign extend 24 to 32 bits
            let raw = ((encoded << 8) as i32) >> 8;
            let decoded = raw as f64 * resolution;
            assert!(
                (decoded - deg).abs() <= resolution,
                "{} decoded to {}",
                deg,
                decoded
            );
        }
    }

    #[test]
    fn test_byte_stuffing() {
        // an address of 0x7E7D7E puts both reserved bytes in the body
        let msg = TrafficMessage {
            address: 0x7E7D7E,
            ..Default::default()
        };
        let encoded = encode_traffic(&msg).unwrap();
        assert!(encoded[1..encoded.len() - 1]
            .windows(2)
            .any(|w| w == [0x7D, 0x5E]));
        assert!(encoded[1..encoded.len() - 1]
            .windows(2)
            .any(|w| w == [0x7D, 0x5D]));
        // no bare flag bytes inside the frame
        assert!(encoded[1..encoded.len() - 1].iter().all(|b| *b != FLAG));

        let body = deframe(&encoded);
        assert_eq!(&body[2..5], &[0x7E, 0x7D, 0x7E]);
    }

    #[test]
    fn test_frame_shape() {
        // id + payload + crc, stuffed and flag wrapped
        let body = deframe(&encode_heartbeat(&HeartbeatMessage {
            pos_valid: false,
            is_initialized: false,
            is_low_battery: false,
            time: 0,
            uplink_msg_count: 0,
            basic_and_long_msg_count: 0,
        }));
        assert_eq!(body.len(), 7);
        assert_eq!(body[0], MSG_ID_HEARTBEAT);
    }
}
