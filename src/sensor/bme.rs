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

use super::ParseError;
use serde::Deserialize;

/// One barometric sensor snapshot as published by the environmental
/// feed adapter.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct BmeReading {
    /// Relative humidity in percent.
    pub humidity: f64,
    /// Station pressure in hPa.
    pub pressure: f64,
    /// Temperature in degrees Celsius.
    pub temperature: f64,
    /// Altitude in meters referenced to 1013.25 hPa.
    #[serde(rename = "pressureAltitude")]
    pub pressure_altitude: f64,
}

impl BmeReading {
    pub fn parse(payload: &[u8]) -> Result<BmeReading, ParseError> {
        serde_json::from_slice(payload).map_err(|e| ParseError::Malformed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let raw = br#"{"humidity":37.45,"pressure":983.12,"temperature":21.3,"pressureAltitude":253.7}"#;
        let bme = BmeReading::parse(raw).unwrap();
        assert_eq!(bme.humidity, 37.45);
        assert_eq!(bme.pressure, 983.12);
        assert_eq!(bme.temperature, 21.3);
        assert_eq!(bme.pressure_altitude, 253.7);
    }

    #[test]
    fn test_reject_incomplete() {
        assert!(BmeReading::parse(br#"{"humidity":37.45}"#).is_err());
        assert!(BmeReading::parse(b"not json").is_err());
    }
}
