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

//! Parsers for the inbound feeds republished on the broker: NMEA
//! sentences, SBS-1 traffic lines, UBX frames and BME snapshots.

pub mod bme;
pub mod nmea;
pub mod sbs;
pub mod ubx;

use std::error::Error;
use std::fmt;

/// Error raised by any of the feed parsers. The dispatcher logs these
/// together with the offending payload and carries on.
#[derive(Debug, PartialEq)]
pub enum ParseError {
    /// The payload is not a syntactically valid frame of its kind.
    Malformed(String),
    /// A checksum did not match the transported one.
    BadChecksum { expected: String, actual: String },
    /// A field that must be present was empty or missing.
    MissingField(&'static str),
    /// A field was present but could not be interpreted.
    BadField(&'static str, String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ParseError::Malformed(what) => write!(f, "malformed input, {}", what),
            ParseError::BadChecksum { expected, actual } => {
                write!(f, "checksum mismatch, expected {}, got {}", expected, actual)
            }
            ParseError::MissingField(name) => write!(f, "missing field {}", name),
            ParseError::BadField(name, value) => {
                write!(f, "unreadable field {}, \"{}\"", name, value)
            }
        }
    }
}

impl Error for ParseError {}
