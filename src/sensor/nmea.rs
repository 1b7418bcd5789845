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

//! NMEA 0183 sentence parsing for the four sentence kinds the nav
//! monitor consumes: GSV, GSA, VTG and GGA. Everything else is parsed
//! far enough to name it and handed back as [`Sentence::Other`].

use super::ParseError;
use chrono::NaiveTime;

/// One satellite block out of a GSV sentence.
#[derive(Debug, Clone, PartialEq)]
pub struct GsvSat {
    pub svid: u16,
    pub elevation: Option<i16>,
    pub azimuth: Option<u16>,
    pub cno: Option<u8>,
}

/// Satellites-in-view. One sentence out of a per-talker cycle of
/// `num_msgs` sentences carrying up to 4 satellites each.
#[derive(Debug, Clone, PartialEq)]
pub struct Gsv {
    pub talker: String,
    pub num_msgs: u8,
    pub msg_num: u8,
    pub num_sv: u16,
    pub sats: Vec<GsvSat>,
}

/// Used satellites and dilution of precision. The talker on the wire is
/// the combined tag; constellation attribution happens in the monitor.
#[derive(Debug, Clone, PartialEq)]
pub struct Gsa {
    pub talker: String,
    pub op_mode: String,
    pub nav_mode: u8,
    pub sv_ids: Vec<u16>,
    pub pdop: Option<f64>,
    pub hdop: Option<f64>,
    pub vdop: Option<f64>,
}

/// Course over ground and speed.
#[derive(Debug, Clone, PartialEq)]
pub struct Vtg {
    pub talker: String,
    pub true_track: Option<f64>,
    pub magnetic_track: Option<f64>,
    pub speed_knots: Option<f64>,
    pub speed_kph: Option<f64>,
}

/// Position and time. Latitude/longitude are unsigned decimal degrees,
/// the hemisphere characters carry the sign.
#[derive(Debug, Clone, PartialEq)]
pub struct Gga {
    pub talker: String,
    pub time: Option<NaiveTime>,
    pub latitude: Option<f64>,
    pub ns: Option<char>,
    pub longitude: Option<f64>,
    pub ew: Option<char>,
    pub altitude: Option<f64>,
    pub altitude_unit: Option<String>,
    pub separation: Option<f64>,
    pub separation_unit: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Sentence {
    Gsv(Gsv),
    Gsa(Gsa),
    Vtg(Vtg),
    Gga(Gga),
    Other { talker: String, msg_id: String },
}

/// Parse one NMEA sentence, checksum included.
pub fn parse(line: &str) -> Result<Sentence, ParseError> {
    let line = line.trim();

    let body = line
        .strip_prefix('$')
        .ok_or_else(|| ParseError::Malformed("sentence does not start with $".into()))?;

    let star = body
        .rfind('*')
        .ok_or_else(|| ParseError::Malformed("sentence has no checksum".into()))?;
    let (body, checksum) = (&body[..star], &body[star + 1..]);

    let actual = u8::from_str_radix(checksum, 16)
        .map_err(|_| ParseError::BadField("checksum", checksum.to_string()))?;
    let expected = body.bytes().fold(0u8, |acc, b| acc ^ b);
    if actual != expected {
        return Err(ParseError::BadChecksum {
            expected: format!("{:02X}", expected),
            actual: format!("{:02X}", actual),
        });
    }

    let fields: Vec<&str> = body.split(',').collect();
    let address = fields[0];
    if address.len() < 5 || address.starts_with('P') {
        // proprietary or short address field, nothing we consume
        return Ok(Sentence::Other {
            talker: address.to_string(),
            msg_id: String::new(),
        });
    }
    let talker = address[..2].to_string();
    let msg_id = address[2..].to_string();
    let fields = &fields[1..];

    match msg_id.as_str() {
        "GSV" => parse_gsv(talker, fields),
        "GSA" => parse_gsa(talker, fields),
        "VTG" => parse_vtg(talker, fields),
        "GGA" => parse_gga(talker, fields),
        _ => Ok(Sentence::Other { talker, msg_id }),
    }
}

fn parse_gsv(talker: String, fields: &[&str]) -> Result<Sentence, ParseError> {
    let num_msgs = req_num::<u8>(fields, 0, "numMsg")?;
    let msg_num = req_num::<u8>(fields, 1, "msgNum")?;
    let num_sv = req_num::<u16>(fields, 2, "numSV")?;

    let mut sats = Vec::with_capacity(4);
    // the header fields exist, so index 3 is at most one past the end;
    // a trailing NMEA 4.x signal id leaves a short chunk, skip it
    for block in fields[3..].chunks(4) {
        if block.len() < 4 || block[0].is_empty() {
            continue;
        }
        sats.push(GsvSat {
            svid: num(block[0], "svid")?,
            elevation: opt_num(block[1], "elv")?,
            azimuth: opt_num(block[2], "az")?,
            cno: opt_num(block[3], "cno")?,
        });
    }

    Ok(Sentence::Gsv(Gsv {
        talker,
        num_msgs,
        msg_num,
        num_sv,
        sats,
    }))
}

fn parse_gsa(talker: String, fields: &[&str]) -> Result<Sentence, ParseError> {
    if fields.len() < 17 {
        return Err(ParseError::Malformed("GSA with too few fields".into()));
    }
    let op_mode = fields[0].to_string();
    let nav_mode = req_num::<u8>(fields, 1, "navMode")?;

    let mut sv_ids = Vec::with_capacity(12);
    for (i, raw) in fields[2..14].iter().enumerate() {
        if let Some(id) = opt_num::<u16>(raw, sv_field_name(i))? {
            sv_ids.push(id);
        }
    }

    Ok(Sentence::Gsa(Gsa {
        talker,
        op_mode,
        nav_mode,
        sv_ids,
        pdop: opt_num(fields[14], "PDOP")?,
        hdop: opt_num(fields[15], "HDOP")?,
        vdop: opt_num(fields[16], "VDOP")?,
    }))
}

fn parse_vtg(talker: String, fields: &[&str]) -> Result<Sentence, ParseError> {
    Ok(Sentence::Vtg(Vtg {
        talker,
        true_track: opt_at(fields, 0, "cogt")?,
        magnetic_track: opt_at(fields, 2, "cogm")?,
        speed_knots: opt_at(fields, 4, "sogn")?,
        speed_kph: opt_at(fields, 6, "sogk")?,
    }))
}

fn parse_gga(talker: String, fields: &[&str]) -> Result<Sentence, ParseError> {
    if fields.len() < 12 {
        return Err(ParseError::Malformed("GGA with too few fields".into()));
    }

    let time = match fields[0] {
        "" => None,
        raw => Some(parse_time(raw)?),
    };

    Ok(Sentence::Gga(Gga {
        talker,
        time,
        latitude: opt_num::<f64>(fields[1], "lat")?.map(ddmm_to_degrees),
        ns: fields[2].chars().next(),
        longitude: opt_num::<f64>(fields[3], "lon")?.map(ddmm_to_degrees),
        ew: fields[4].chars().next(),
        altitude: opt_num(fields[8], "alt")?,
        altitude_unit: non_empty(fields[9]),
        separation: opt_num(fields[10], "sep")?,
        separation_unit: non_empty(fields[11]),
    }))
}

/// NMEA encodes angles as (d)ddmm.mmmm.
fn ddmm_to_degrees(v: f64) -> f64 {
    let degrees = (v / 100.0).trunc();
    degrees + (v - degrees * 100.0) / 60.0
}

fn parse_time(raw: &str) -> Result<NaiveTime, ParseError> {
    NaiveTime::parse_from_str(raw, "%H%M%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H%M%S"))
        .map_err(|_| ParseError::BadField("time", raw.to_string()))
}

fn non_empty(raw: &str) -> Option<String> {
    if raw.is_empty() {
        None
    } else {
        Some(raw.to_string())
    }
}

fn num<T: std::str::FromStr>(raw: &str, name: &'static str) -> Result<T, ParseError> {
    raw.parse()
        .map_err(|_| ParseError::BadField(name, raw.to_string()))
}

fn opt_num<T: std::str::FromStr>(raw: &str, name: &'static str) -> Result<Option<T>, ParseError> {
    if raw.is_empty() {
        Ok(None)
    } else {
        num(raw, name).map(Some)
    }
}

fn opt_at(fields: &[&str], idx: usize, name: &'static str) -> Result<Option<f64>, ParseError> {
    match fields.get(idx) {
        Some(raw) => opt_num(raw, name),
        None => Ok(None),
    }
}

fn req_num<T: std::str::FromStr>(
    fields: &[&str],
    idx: usize,
    name: &'static str,
) -> Result<T, ParseError> {
    match fields.get(idx) {
        Some(raw) if !raw.is_empty() => num(raw, name),
        _ => Err(ParseError::MissingField(name)),
    }
}

fn sv_field_name(i: usize) -> &'static str {
    const NAMES: [&str; 12] = [
        "svid_01", "svid_02", "svid_03", "svid_04", "svid_05", "svid_06", "svid_07", "svid_08",
        "svid_09", "svid_10", "svid_11", "svid_12",
    ];
    NAMES[i]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_checksum(body: &str) -> String {
        let sum = body.bytes().fold(0u8, |acc, b| acc ^ b);
        format!("${}*{:02X}", body, sum)
    }

    #[test]
    fn test_parse_gga() {
        let s = parse("$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47")
            .unwrap();
        match s {
            Sentence::Gga(gga) => {
                assert_eq!(gga.talker, "GP");
                assert_eq!(gga.time, Some(NaiveTime::from_hms_opt(12, 35, 19).unwrap()));
                assert!((gga.latitude.unwrap() - 48.1173).abs() < 1e-6);
                assert_eq!(gga.ns, Some('N'));
                assert!((gga.longitude.unwrap() - 11.516_666_666).abs() < 1e-6);
                assert_eq!(gga.ew, Some('E'));
                assert_eq!(gga.altitude, Some(545.4));
                assert_eq!(gga.altitude_unit.as_deref(), Some("M"));
                assert_eq!(gga.separation, Some(46.9));
                assert_eq!(gga.separation_unit.as_deref(), Some("M"));
            }
            other => panic!("expected GGA, got {:?}", other),
        }
    }

    #[test]
    fn test_checksum_mismatch() {
        let res = parse("$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*48");
        assert!(matches!(res, Err(ParseError::BadChecksum { .. })));
    }

    #[test]
    fn test_not_a_sentence() {
        assert!(parse("GPGGA,123519*00").is_err());
        assert!(parse("$GPGGA,123519").is_err());
    }

    #[test]
    fn test_parse_gsv() {
        let raw = with_checksum("GLGSV,2,1,06,65,32,123,44,66,,045,,73,12,301,38,74,88,270,");
        match parse(&raw).unwrap() {
            Sentence::Gsv(gsv) => {
                assert_eq!(gsv.talker, "GL");
                assert_eq!(gsv.num_msgs, 2);
                assert_eq!(gsv.msg_num, 1);
                assert_eq!(gsv.num_sv, 6);
                assert_eq!(gsv.sats.len(), 4);
                assert_eq!(
                    gsv.sats[0],
                    GsvSat {
                        svid: 65,
                        elevation: Some(32),
                        azimuth: Some(123),
                        cno: Some(44),
                    }
                );
                assert_eq!(gsv.sats[1].elevation, None);
                assert_eq!(gsv.sats[1].cno, None);
                assert_eq!(gsv.sats[3].cno, None);
            }
            other => panic!("expected GSV, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_gsv_with_signal_id() {
        // NMEA 4.x appends a signal id after the last satellite block
        let raw = with_checksum("GPGSV,1,1,02,10,51,205,30,23,60,087,43,1");
        match parse(&raw).unwrap() {
            Sentence::Gsv(gsv) => {
                assert_eq!(gsv.sats.len(), 2);
                assert_eq!(gsv.sats[1].svid, 23);
            }
            other => panic!("expected GSV, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_gsa() {
        let raw = with_checksum("GNGSA,A,3,04,05,,09,12,,,24,,,,,2.5,1.3,2.1");
        match parse(&raw).unwrap() {
            Sentence::Gsa(gsa) => {
                assert_eq!(gsa.talker, "GN");
                assert_eq!(gsa.op_mode, "A");
                assert_eq!(gsa.nav_mode, 3);
                assert_eq!(gsa.sv_ids, vec![4, 5, 9, 12, 24]);
                assert_eq!(gsa.pdop, Some(2.5));
                assert_eq!(gsa.hdop, Some(1.3));
                assert_eq!(gsa.vdop, Some(2.1));
            }
            other => panic!("expected GSA, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_vtg() {
        let raw = with_checksum("GPVTG,054.7,T,034.4,M,005.5,N,010.2,K");
        match parse(&raw).unwrap() {
            Sentence::Vtg(vtg) => {
                assert_eq!(vtg.true_track, Some(54.7));
                assert_eq!(vtg.magnetic_track, Some(34.4));
                assert_eq!(vtg.speed_knots, Some(5.5));
                assert_eq!(vtg.speed_kph, Some(10.2));
            }
            other => panic!("expected VTG, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_vtg_empty_fields() {
        let raw = with_checksum("GPVTG,,T,,M,0.082,N,0.151,K,A");
        match parse(&raw).unwrap() {
            Sentence::Vtg(vtg) => {
                assert_eq!(vtg.true_track, None);
                assert_eq!(vtg.magnetic_track, None);
                assert_eq!(vtg.speed_knots, Some(0.082));
            }
            other => panic!("expected VTG, got {:?}", other),
        }
    }

    #[test]
    fn test_other_sentences_pass_through() {
        let raw = with_checksum("GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W");
        match parse(&raw).unwrap() {
            Sentence::Other { talker, msg_id } => {
                assert_eq!(talker, "GP");
                assert_eq!(msg_id, "RMC");
            }
            other => panic!("expected Other, got {:?}", other),
        }
    }

    #[test]
    fn test_ddmm_conversion() {
        assert!((ddmm_to_degrees(4807.038) - 48.1173).abs() < 1e-9);
        assert!((ddmm_to_degrees(11131.0) - 111.516_666_666_666).abs() < 1e-9);
        assert_eq!(ddmm_to_degrees(0.0), 0.0);
    }
}
