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

//! Maintains the traffic situation around us.

use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::ser::Serializer;
use serde::Serialize;

use super::db::{AircraftDb, TypeDb, TypeExtensionDb};
use super::{Observer, Report};
use crate::sensor::sbs::SbsMessage;

const CLEANUP_INTERVAL_SECS: u64 = 10;
const MAX_UNSEEN_SECS: i64 = 300;

/// Raised when a traffic entry is updated with a record for a
/// different transponder address.
#[derive(Debug, PartialEq)]
pub struct TrafficError(String);

impl fmt::Display for TrafficError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Error for TrafficError {}

/// GDL90 emitter category of a tracked aircraft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrafficCategory {
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

impl TrafficCategory {
    /// Map a database category number, falling back to `NoInfo` for
    /// unassigned values.
    pub fn from_wire(v: u8) -> TrafficCategory {
        use TrafficCategory::*;
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

impl Serialize for TrafficCategory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

fn serialize_hms<S: Serializer>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&dt.format("%H:%M:%S").to_string())
}

/// One tracked aircraft, merged from partial SBS records and the
/// static databases. The serialized shape is the published wire shape.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficEntry {
    /// 24-bit transponder address.
    pub id: u32,
    pub callsign: Option<String>,
    /// ICAO type designator.
    #[serde(rename = "type")]
    pub type_designator: Option<String>,
    /// Aircraft name, from the type database.
    pub name: Option<String>,
    /// ICAO aircraft description, from the type database.
    pub descr: Option<String>,
    /// Wake turbulence category, from the type database.
    pub wtc: Option<String>,
    pub category: TrafficCategory,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Altitude in ft referenced to 29.92 inHg.
    pub altitude: Option<i32>,
    /// Track in degrees, 0 to 359.
    pub track: Option<i32>,
    /// Ground speed in knots.
    pub ground_speed: Option<i32>,
    /// Vertical speed in ft/min.
    pub vertical_speed: Option<i32>,
    pub squawk: Option<u16>,
    /// Squawk code has changed.
    pub alert: Option<bool>,
    /// Emergency squawk code is set.
    pub emergency: Option<bool>,
    /// Transponder ident is active.
    pub spi: Option<bool>,
    pub is_on_ground: Option<bool>,
    #[serde(serialize_with = "serialize_hms")]
    last_seen: DateTime<Utc>,
    pub msg_count: u64,
}

impl TrafficEntry {
    fn new(
        msg: &SbsMessage,
        callsign: Option<String>,
        type_designator: Option<String>,
        name: Option<String>,
        descr: Option<String>,
        wtc: Option<String>,
        category: TrafficCategory,
    ) -> Self {
        TrafficEntry {
            id: msg.icao,
            callsign,
            type_designator,
            name,
            descr,
            wtc,
            category,
            latitude: msg.latitude,
            longitude: msg.longitude,
            altitude: msg.altitude,
            track: msg.track,
            ground_speed: msg.ground_speed,
            vertical_speed: msg.vertical_rate,
            squawk: msg.squawk,
            alert: msg.alert,
            emergency: msg.emergency,
            spi: msg.spi,
            is_on_ground: msg.is_on_ground,
            last_seen: Utc::now(),
            msg_count: 1,
        }
    }

    /// Merge a record into this entry. Fields absent from the record
    /// keep their current value; last-seen and the message counter
    /// always advance.
    pub fn update(&mut self, msg: &SbsMessage) -> Result<(), TrafficError> {
        if msg.icao != self.id {
            return Err(TrafficError(format!(
                "cannot update traffic entry {:06X} with record for {:06X}",
                self.id, msg.icao
            )));
        }
        if msg.latitude.is_some() {
            self.latitude = msg.latitude;
        }
        if msg.longitude.is_some() {
            self.longitude = msg.longitude;
        }
        if msg.altitude.is_some() {
            self.altitude = msg.altitude;
        }
        if msg.track.is_some() {
            self.track = msg.track;
        }
        if msg.ground_speed.is_some() {
            self.ground_speed = msg.ground_speed;
        }
        if msg.vertical_rate.is_some() {
            self.vertical_speed = msg.vertical_rate;
        }
        if msg.squawk.is_some() {
            self.squawk = msg.squawk;
        }
        if msg.alert.is_some() {
            self.alert = msg.alert;
        }
        if msg.emergency.is_some() {
            self.emergency = msg.emergency;
        }
        if msg.spi.is_some() {
            self.spi = msg.spi;
        }
        if msg.is_on_ground.is_some() {
            self.is_on_ground = msg.is_on_ground;
        }
        self.last_seen = Utc::now();
        self.msg_count += 1;
        Ok(())
    }

    fn seconds_since_seen(&self, now: DateTime<Utc>) -> i64 {
        (now - self.last_seen).num_seconds()
    }

    #[cfg(test)]
    pub(crate) fn stub(id: u32) -> TrafficEntry {
        TrafficEntry {
            id,
            callsign: None,
            type_designator: None,
            name: None,
            descr: None,
            wtc: None,
            category: TrafficCategory::NoInfo,
            latitude: None,
            longitude: None,
            altitude: None,
            track: None,
            ground_speed: None,
            vertical_speed: None,
            squawk: None,
            alert: None,
            emergency: None,
            spi: None,
            is_on_ground: None,
            last_seen: Utc::now(),
            msg_count: 1,
        }
    }
}

struct CleanupTimer {
    stop: mpsc::Sender<()>,
}

/// Keyed registry of the surrounding traffic. Updated from SBS records,
/// enriched from the static databases, aged out by the cleanup timer.
pub struct TrafficMonitor {
    traffic: Mutex<HashMap<u32, TrafficEntry>>,
    observers: Mutex<Vec<Arc<dyn Observer>>>,
    cleanup_timer: Mutex<Option<CleanupTimer>>,
    aircrafts: AircraftDb,
    types: TypeDb,
    types_extension: TypeExtensionDb,
    db_version: u32,
    cleanup_interval: Duration,
    max_unseen_secs: i64,
}

impl TrafficMonitor {
    pub fn new(
        aircrafts: AircraftDb,
        types: TypeDb,
        types_extension: TypeExtensionDb,
        db_version: u32,
    ) -> Self {
        TrafficMonitor {
            traffic: Mutex::new(HashMap::with_capacity(100)),
            observers: Mutex::new(Vec::new()),
            cleanup_timer: Mutex::new(None),
            aircrafts,
            types,
            types_extension,
            db_version,
            cleanup_interval: Duration::from_secs(CLEANUP_INTERVAL_SECS),
            max_unseen_secs: MAX_UNSEEN_SECS,
        }
    }

    /// Version of the enrichment databases.
    pub fn db_version(&self) -> u32 {
        self.db_version
    }

    /// Deep copy of the current registry.
    pub fn traffic(&self) -> HashMap<u32, TrafficEntry> {
        self.traffic.lock().unwrap().clone()
    }

    /// Register an observer for entry updates.
    pub fn register(&self, observer: Arc<dyn Observer>) {
        self.observers.lock().unwrap().push(observer);
    }

    /// Apply one SBS record: merge into the existing entry for its
    /// address, or create a new database-enriched entry. Observers are
    /// notified with a copy of the entry after the registry lock has
    /// been released.
    pub fn update(&self, msg: &SbsMessage) -> Result<(), TrafficError> {
        let entry = {
            let mut traffic = self.traffic.lock().unwrap();
            match traffic.get_mut(&msg.icao) {
                Some(entry) => {
                    entry.update(msg)?;
                    entry.clone()
                }
                None => {
                    let entry = self.enriched_entry(msg);
                    info!(
                        "add new {:06X}, {:?}, {:?}, {:?} (count {})",
                        entry.id,
                        entry.callsign,
                        entry.type_designator,
                        entry.category,
                        traffic.len() + 1
                    );
                    traffic.insert(msg.icao, entry.clone());
                    entry
                }
            }
        };
        self.notify(&Report::Traffic(entry));
        Ok(())
    }

    fn enriched_entry(&self, msg: &SbsMessage) -> TrafficEntry {
        let (db_callsign, type_designator) = self.aircrafts.lookup(&msg.hex_ident);
        let callsign = db_callsign.or_else(|| msg.callsign.clone());
        let (name, descr, wtc) = match type_designator.as_deref() {
            Some(t) => self.types.lookup(t),
            None => (None, None, None),
        };
        let category = type_designator
            .as_deref()
            .and_then(|t| self.types_extension.lookup(t))
            .map(TrafficCategory::from_wire)
            .unwrap_or(TrafficCategory::NoInfo);
        TrafficEntry::new(msg, callsign, type_designator, name, descr, wtc, category)
    }

    /// Start the periodic cleanup timer. Calling while already running
    /// is a no-op.
    pub fn start_auto_cleanup(self: &Arc<Self>) {
        let mut timer = self.cleanup_timer.lock().unwrap();
        if timer.is_some() {
            return;
        }
        let (stop, stopped) = mpsc::channel();
        let monitor = Arc::clone(self);
        thread::spawn(move || loop {
            match stopped.recv_timeout(monitor.cleanup_interval) {
                Err(RecvTimeoutError::Timeout) => monitor.cleanup(),
                _ => break,
            }
        });
        *timer = Some(CleanupTimer { stop });
        info!("started auto cleanup timer");
    }

    /// Stop the periodic cleanup timer, if running.
    pub fn stop_auto_cleanup(&self) {
        if self.cleanup_timer.lock().unwrap().take().is_some() {
            info!("stopped auto cleanup timer");
        }
    }

    pub fn auto_cleanup_running(&self) -> bool {
        self.cleanup_timer.lock().unwrap().is_some()
    }

    /// Remove all entries that have not been seen for longer than the
    /// configured age.
    pub fn cleanup(&self) {
        let now = Utc::now();
        let mut traffic = self.traffic.lock().unwrap();
        let stale: Vec<u32> = traffic
            .values()
            .filter(|e| e.seconds_since_seen(now) > self.max_unseen_secs)
            .map(|e| e.id)
            .collect();
        for id in stale {
            if let Some(entry) = traffic.remove(&id) {
                info!(
                    "remove {:06X}, {:?}, {:?}, {:?} (unseen for >{} seconds)",
                    entry.id,
                    entry.callsign,
                    entry.type_designator,
                    entry.category,
                    self.max_unseen_secs
                );
            }
        }
    }

    fn notify(&self, report: &Report) {
        for observer in self.observers.lock().unwrap().iter() {
            observer.notify(report);
        }
    }

    #[cfg(test)]
    fn backdate(&self, icao: u32, seconds: i64) {
        let mut traffic = self.traffic.lock().unwrap();
        if let Some(entry) = traffic.get_mut(&icao) {
            entry.last_seen = entry.last_seen - chrono::Duration::seconds(seconds);
        }
    }
}

// stop the timer thread when the monitor goes away
impl Drop for CleanupTimer {
    fn drop(&mut self) {
        let _ = self.stop.send(());
    }
}
