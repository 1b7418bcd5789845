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

//! SBS-1/BaseStation CSV line parsing. The field layout follows
//! http://woodair.net/sbs/article/barebones42_socket_data.htm; only
//! `MSG` transmission records are accepted, and every surveillance
//! field is optional because each transmission type fills a different
//! subset.

use super::ParseError;

/// One decoded SBS-1 record. A partial view of one aircraft, keyed by
/// the 24-bit ICAO transponder address.
#[derive(Debug, Clone, PartialEq)]
pub struct SbsMessage {
    pub transmission_type: u8,
    /// Transponder address as transported, e.g. "AB4549".
    pub hex_ident: String,
    /// Transponder address parsed from `hex_ident`.
    pub icao: u32,
    pub callsign: Option<String>,
    pub altitude: Option<i32>,
    pub ground_speed: Option<i32>,
    pub track: Option<i32>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub vertical_rate: Option<i32>,
    pub squawk: Option<u16>,
    pub alert: Option<bool>,
    pub emergency: Option<bool>,
    pub spi: Option<bool>,
    pub is_on_ground: Option<bool>,
}

impl SbsMessage {
    /// Parse one CSV line. The line is expected to be stripped of its
    /// terminator already.
    pub fn parse(line: &str) -> Result<SbsMessage, ParseError> {
        let fields: Vec<&str> = line.trim().split(',').collect();

        if fields[0] != "MSG" {
            return Err(ParseError::Malformed(format!(
                "unsupported message type \"{}\"",
                fields[0]
            )));
        }
        if fields.len() < 11 {
            return Err(ParseError::Malformed("record with too few fields".into()));
        }

        let hex_ident = field(&fields, 4)
            .ok_or(ParseError::MissingField("hexIdent"))?
            .to_uppercase();
        let icao = u32::from_str_radix(&hex_ident, 16)
            .map_err(|_| ParseError::BadField("hexIdent", hex_ident.clone()))?;

        Ok(SbsMessage {
            transmission_type: parse_num(&fields, 1, "transmissionType")?
                .ok_or(ParseError::MissingField("transmissionType"))?,
            hex_ident,
            icao,
            callsign: field(&fields, 10).map(|c| c.trim().to_string()),
            altitude: parse_rounded(&fields, 11, "altitude")?,
            ground_speed: parse_rounded(&fields, 12, "groundSpeed")?,
            track: parse_rounded(&fields, 13, "track")?,
            latitude: parse_num(&fields, 14, "latitude")?,
            longitude: parse_num(&fields, 15, "longitude")?,
            vertical_rate: parse_rounded(&fields, 16, "verticalRate")?,
            squawk: parse_num(&fields, 17, "squawk")?,
            alert: parse_flag(&fields, 18),
            emergency: parse_flag(&fields, 19),
            spi: parse_flag(&fields, 20),
            is_on_ground: parse_flag(&fields, 21),
        })
    }
}

fn field<'a>(fields: &[&'a str], idx: usize) -> Option<&'a str> {
    match fields.get(idx) {
        Some(raw) if !raw.is_empty() => Some(raw),
        _ => None,
    }
}

fn parse_num<T: std::str::FromStr>(
    fields: &[&str],
    idx: usize,
    name: &'static str,
) -> Result<Option<T>, ParseError> {
    match field(fields, idx) {
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| ParseError::BadField(name, raw.to_string())),
        None => Ok(None),
    }
}

/// Numeric fields that some feeds emit with a fraction ("288.6") but
/// that we track as integers.
fn parse_rounded(
    fields: &[&str],
    idx: usize,
    name: &'static str,
) -> Result<Option<i32>, ParseError> {
    Ok(parse_num::<f64>(fields, idx, name)?.map(|v| v.round() as i32))
}

/// Boolean flags come as "0"/"1" (dump1090) or "-1" for set.
fn parse_flag(fields: &[&str], idx: usize) -> Option<bool> {
    field(fields, idx).map(|raw| raw != "0")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_position_record() {
        let line = "MSG,3,111,11111,A04424,111111,2016/03/11,13:07:05.343,2016/03/11,\
                    13:07:05.288,,11025,,,37.17274,-122.03935,,,,,,0";
        let msg = SbsMessage::parse(line).unwrap();
        assert_eq!(msg.transmission_type, 3);
        assert_eq!(msg.hex_ident, "A04424");
        assert_eq!(msg.icao, 0xA04424);
        assert_eq!(msg.callsign, None);
        assert_eq!(msg.altitude, Some(11025));
        assert_eq!(msg.latitude, Some(37.17274));
        assert_eq!(msg.longitude, Some(-122.03935));
        assert_eq!(msg.ground_speed, None);
        assert_eq!(msg.is_on_ground, Some(false));
    }

    #[test]
    fn test_parse_velocity_record() {
        let line = "MSG,4,111,11111,AC1FCC,111111,2016/03/11,13:07:07.777,2016/03/11,\
                    13:07:07.713,,,316.4,106,,,1536,,,,,0";
        let msg = SbsMessage::parse(line).unwrap();
        assert_eq!(msg.ground_speed, Some(316));
        assert_eq!(msg.track, Some(106));
        assert_eq!(msg.vertical_rate, Some(1536));
        assert_eq!(msg.altitude, None);
    }

    #[test]
    fn test_parse_identification_record() {
        let line = "MSG,1,111,11111,AA2BC2,111111,2016/03/11,13:07:16.663,2016/03/11,\
                    13:07:16.626,UAL814  ,,,,,,,,,,,0";
        let msg = SbsMessage::parse(line).unwrap();
        assert_eq!(msg.callsign.as_deref(), Some("UAL814"));
    }

    #[test]
    fn test_parse_flags() {
        let line = "MSG,6,111,11111,AA2BC2,111111,2016/03/11,13:07:16.663,2016/03/11,\
                    13:07:16.626,,,,,,,,7700,-1,1,0,0";
        let msg = SbsMessage::parse(line).unwrap();
        assert_eq!(msg.squawk, Some(7700));
        assert_eq!(msg.alert, Some(true));
        assert_eq!(msg.emergency, Some(true));
        assert_eq!(msg.spi, Some(false));
        assert_eq!(msg.is_on_ground, Some(false));
    }

    #[test]
    fn test_reject_non_msg() {
        assert!(SbsMessage::parse("SEL,,496,2286,4CA4E5,27215,2010/02/19,18:06:07.710").is_err());
        assert!(SbsMessage::parse("").is_err());
    }

    #[test]
    fn test_reject_missing_hex_ident() {
        let line = "MSG,3,111,11111,,111111,2016/03/11,13:07:05.343,2016/03/11,13:07:05.288,,";
        assert_eq!(
            SbsMessage::parse(line),
            Err(ParseError::MissingField("hexIdent"))
        );
    }

    #[test]
    fn test_hex_ident_normalized() {
        let line = "MSG,3,111,11111,ab4549,111111,2016/03/11,13:07:05.343,2016/03/11,\
                    13:07:05.288,,5000,,,44.9,-122.9,,,,,,0";
        let msg = SbsMessage::parse(line).unwrap();
        assert_eq!(msg.hex_ident, "AB4549");
        assert_eq!(msg.icao, 0xAB4549);
    }
}
