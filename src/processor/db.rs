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

//! The static aircraft databases (mictronics layout) used to enrich
//! traffic entries. Loaded once at startup; lookups never fail, they
//! just come back empty.
//!
//! - aircraft db: `{"3ef123": ["D-EZAA", "C172", ...], ...}`
//! - type db: `{"C172": ["Cessna 172", "L1P", "L", ...], ...}`
//! - type extension db: `{"C172": [1, ...], ...}`
//! - version file: `{"version": 42}`

use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug)]
pub enum DbError {
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DbError::Io(e) => write!(f, "database unreadable, {}", e),
            DbError::Json(e) => write!(f, "database unparsable, {}", e),
        }
    }
}

impl Error for DbError {}

impl From<std::io::Error> for DbError {
    fn from(e: std::io::Error) -> Self {
        DbError::Io(e)
    }
}

impl From<serde_json::Error> for DbError {
    fn from(e: serde_json::Error) -> Self {
        DbError::Json(e)
    }
}

fn load_map<P: AsRef<Path>>(path: P) -> Result<HashMap<String, Vec<Value>>, DbError> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

fn nth_string(row: &[Value], idx: usize) -> Option<String> {
    row.get(idx)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Registration and type designator by transponder address.
pub struct AircraftDb {
    entries: HashMap<String, Vec<Value>>,
}

impl AircraftDb {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DbError> {
        Ok(AircraftDb {
            entries: load_map(path)?,
        })
    }

    pub fn from_entries(entries: HashMap<String, Vec<Value>>) -> Self {
        AircraftDb { entries }
    }

    /// Look up `(registration, type designator)` for a transponder
    /// address given as hex.
    pub fn lookup(&self, hex_ident: &str) -> (Option<String>, Option<String>) {
        let row = self
            .entries
            .get(hex_ident)
            .or_else(|| self.entries.get(&hex_ident.to_lowercase()));
        match row {
            Some(row) => (nth_string(row, 0), nth_string(row, 1)),
            None => (None, None),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Name, description and wake turbulence class by type designator.
pub struct TypeDb {
    entries: HashMap<String, Vec<Value>>,
}

impl TypeDb {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DbError> {
        Ok(TypeDb {
            entries: load_map(path)?,
        })
    }

    pub fn from_entries(entries: HashMap<String, Vec<Value>>) -> Self {
        TypeDb { entries }
    }

    /// Look up `(name, description, wake turbulence class)`.
    pub fn lookup(&self, type_designator: &str) -> (Option<String>, Option<String>, Option<String>) {
        match self.entries.get(type_designator) {
            Some(row) => (
                nth_string(row, 0),
                nth_string(row, 1),
                nth_string(row, 2),
            ),
            None => (None, None, None),
        }
    }
}

/// GDL90 emitter category by type designator.
pub struct TypeExtensionDb {
    entries: HashMap<String, Vec<Value>>,
}

impl TypeExtensionDb {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DbError> {
        Ok(TypeExtensionDb {
            entries: load_map(path)?,
        })
    }

    pub fn from_entries(entries: HashMap<String, Vec<Value>>) -> Self {
        TypeExtensionDb { entries }
    }

    /// Raw category number, if the type is known at all.
    pub fn lookup(&self, type_designator: &str) -> Option<u8> {
        self.entries
            .get(type_designator)
            .and_then(|row| row.first())
            .and_then(Value::as_u64)
            .map(|v| v as u8)
    }
}

#[derive(Deserialize)]
struct DbVersionFile {
    version: u32,
}

/// Read the database version file.
pub fn load_version<P: AsRef<Path>>(path: P) -> Result<u32, DbError> {
    let reader = BufReader::new(File::open(path)?);
    let parsed: DbVersionFile = serde_json::from_reader(reader)?;
    Ok(parsed.version)
}
