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

//! Assembles one coherent position fact out of the GNSS sentence cycle
//! and the barometric feed.
//!
//! GSV sentences are collected per talker until a talker's cycle
//! commits into the satellite registry. A full update cycle needs at
//! least one committed GSV talker plus one GSA, VTG and GGA each; on
//! completion the position is copied out and observers are notified.

use std::collections::{BTreeMap, HashMap};
use std::error::Error;
use std::fmt;
use std::sync::{Arc, Mutex};

use chrono::NaiveTime;
use serde::ser::Serializer;
use serde::Serialize;

use super::{Observer, Report};
use crate::sensor::bme::BmeReading;
use crate::sensor::nmea::{Gga, Gsa, Gsv, Sentence, Vtg};

#[derive(Debug, PartialEq)]
pub enum NavError {
    AltitudeUnit(String),
    SeparationUnit(String),
    NavMode(u8),
    OperationMode(String),
}

impl fmt::Display for NavError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            NavError::AltitudeUnit(unit) => {
                write!(f, "altitude unit must be M, got \"{}\"", unit)
            }
            NavError::SeparationUnit(unit) => {
                write!(f, "separation unit must equal altitude unit, got \"{}\"", unit)
            }
            NavError::NavMode(v) => write!(f, "unknown nav mode {}", v),
            NavError::OperationMode(v) => write!(f, "unknown operation mode \"{}\"", v),
        }
    }
}

impl Error for NavError {}

/// Navigation fix mode from GSA.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavMode {
    NoFix = 1,
    Fix2D = 2,
    Fix3D = 3,
}

impl NavMode {
    fn from_wire(v: u8) -> Result<NavMode, NavError> {
        match v {
            1 => Ok(NavMode::NoFix),
            2 => Ok(NavMode::Fix2D),
            3 => Ok(NavMode::Fix3D),
            other => Err(NavError::NavMode(other)),
        }
    }
}

impl Serialize for NavMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

/// Receiver operation mode from GSA.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationMode {
    Automatic,
    Manual,
}

impl OperationMode {
    fn from_wire(v: &str) -> Result<OperationMode, NavError> {
        match v {
            "A" => Ok(OperationMode::Automatic),
            "M" => Ok(OperationMode::Manual),
            other => Err(NavError::OperationMode(other.to_string())),
        }
    }
}

impl Serialize for OperationMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            OperationMode::Automatic => serializer.serialize_str("A"),
            OperationMode::Manual => serializer.serialize_str("M"),
        }
    }
}

/// One navigation satellite, keyed by its Ubx satellite number.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SatInfo {
    pub svid: u16,
    /// Constellation-prefixed display label, e.g. "R12" or "S133".
    pub prn: String,
    /// Elevation in degrees, 0 to 90.
    pub elevation: Option<i16>,
    /// Azimuth in degrees, 0 to 359.
    pub azimuth: Option<u16>,
    /// Carrier to noise ratio in dBHz, absent when not tracking.
    pub cno: Option<u8>,
    /// Used for navigation.
    pub used: bool,
    #[serde(skip)]
    pub talker: String,
}

/// Ubx satellite numbering maps each constellation to an id range. The
/// talker is the NMEA prefix the constellation reports under, with SBAS
/// and QZSS folding into GPS.
fn talker_for_svid(svid: u16) -> &'static str {
    match svid {
        1..=32 => "GP",
        33..=64 => "GP",
        65..=96 => "GL",
        193..=202 => "GP",
        301..=336 => "GA",
        401..=437 => "GB",
        _ => "GN",
    }
}

fn prn_label(svid: u16) -> String {
    match svid {
        1..=32 => format!("G{}", svid),
        33..=64 => format!("S{}", svid + 87),
        65..=96 => format!("R{}", svid - 64),
        173..=182 => format!("I{}", svid - 172),
        193..=202 => format!("Q{}", svid - 192),
        301..=336 => format!("E{}", svid - 300),
        401..=437 => format!("B{}", svid - 400),
        _ => svid.to_string(),
    }
}

fn serialize_opt_hms<S: Serializer>(
    t: &Option<NaiveTime>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match t {
        Some(t) => serializer.serialize_str(&t.format("%H:%M:%S").to_string()),
        None => serializer.serialize_none(),
    }
}

/// The fused position fact. A deep copy goes to observers once per
/// complete update cycle; the serialized shape is the published wire
/// shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PosInfo {
    pub nav_mode: Option<NavMode>,
    pub op_mode: Option<OperationMode>,
    pub pdop: Option<f64>,
    pub hdop: Option<f64>,
    pub vdop: Option<f64>,
    // the published key predates this rewrite and the UI reads it as is
    #[serde(rename = "trueTack")]
    pub true_track: Option<f64>,
    pub magnetic_track: Option<f64>,
    pub ground_speed_knots: Option<f64>,
    pub ground_speed_kph: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Altitude above mean sea level in meters.
    pub altitude_meter: Option<f64>,
    /// Geoid separation in meters.
    pub separation_meter: Option<f64>,
    #[serde(serialize_with = "serialize_opt_hms")]
    pub utc_time: Option<NaiveTime>,
    /// Temperature in degrees Celsius.
    pub temperature: Option<f64>,
    /// Relative humidity in percent.
    pub humidity: Option<f64>,
    /// Station pressure in hPa.
    pub pressure: Option<f64>,
    /// Pressure altitude in meters referenced to 1013.25 hPa.
    pub pressure_altitude: Option<f64>,
}

struct GsvCycle {
    expected_msg_num: u8,
    remaining: u16,
    scratch: BTreeMap<u16, SatInfo>,
}

impl GsvCycle {
    fn new() -> Self {
        GsvCycle {
            expected_msg_num: 1,
            remaining: 0,
            scratch: BTreeMap::new(),
        }
    }

    fn reset(&mut self) {
        self.expected_msg_num = 1;
        self.remaining = 0;
        self.scratch.clear();
    }
}

struct NavState {
    satellites: BTreeMap<u16, SatInfo>,
    pos: PosInfo,
    cycles: HashMap<String, GsvCycle>,
    gsv_done: bool,
    gsa_done: bool,
    vtg_done: bool,
    gga_done: bool,
    gsa_talkers: Vec<String>,
    gsa_rotation: usize,
}

impl NavState {
    fn new() -> Self {
        NavState {
            satellites: BTreeMap::new(),
            pos: PosInfo::default(),
            cycles: HashMap::new(),
            gsv_done: false,
            gsa_done: false,
            vtg_done: false,
            gga_done: false,
            gsa_talkers: Vec::new(),
            gsa_rotation: 0,
        }
    }

    fn update_gsv(&mut self, gsv: &Gsv) {
        let NavState {
            ref mut satellites,
            ref mut cycles,
            ref mut gsv_done,
            ..
        } = *self;
        let cycle = cycles
            .entry(gsv.talker.clone())
            .or_insert_with(GsvCycle::new);

        if gsv.msg_num != cycle.expected_msg_num {
            warn!(
                "abort satellites update for talker {}, message number out of sync",
                gsv.talker
            );
            cycle.reset();
            return;
        }

        if gsv.msg_num == 1 {
            cycle.scratch.clear();
            cycle.remaining = gsv.num_sv;
        }

        let take = cycle.remaining.min(4) as usize;
        for sat in gsv.sats.iter().take(take) {
            cycle.scratch.insert(
                sat.svid,
                SatInfo {
                    svid: sat.svid,
                    prn: prn_label(sat.svid),
                    elevation: sat.elevation,
                    azimuth: sat.azimuth,
                    cno: sat.cno,
                    used: false,
                    talker: gsv.talker.clone(),
                },
            );
        }
        cycle.remaining = cycle.remaining.saturating_sub(take as u16);
        cycle.expected_msg_num += 1;

        if gsv.msg_num == gsv.num_msgs {
            for fresh in cycle.scratch.values() {
                match satellites.get_mut(&fresh.svid) {
                    Some(existing) => {
                        existing.elevation = fresh.elevation;
                        existing.azimuth = fresh.azimuth;
                        existing.cno = fresh.cno;
                    }
                    None => {
                        satellites.insert(fresh.svid, fresh.clone());
                    }
                }
            }
            let scratch = &cycle.scratch;
            satellites.retain(|svid, sat| sat.talker != gsv.talker || scratch.contains_key(svid));
            if scratch.len() != gsv.num_sv as usize {
                warn!(
                    "talker {} committed {} satellites but announced {}",
                    gsv.talker,
                    scratch.len(),
                    gsv.num_sv
                );
            }
            cycle.reset();
            *gsv_done = true;
        }
    }

    fn update_gsa(&mut self, gsa: &Gsa) -> Result<(), NavError> {
        let nav_mode = NavMode::from_wire(gsa.nav_mode)?;
        let op_mode = OperationMode::from_wire(&gsa.op_mode)?;
        if self.pos.nav_mode != Some(nav_mode) {
            info!("nav mode changed to {:?}", nav_mode);
        }
        self.pos.nav_mode = Some(nav_mode);
        self.pos.op_mode = Some(op_mode);
        self.pos.pdop = gsa.pdop;
        self.pos.hdop = gsa.hdop;
        self.pos.vdop = gsa.vdop;

        // GSA always reports under the combined talker; attribute the
        // used flags to the constellation of the first used satellite,
        // or guess by rotating through the talkers seen so far.
        let talker = match gsa.sv_ids.first() {
            Some(first) => {
                let talker = talker_for_svid(*first).to_string();
                if !self.gsa_talkers.contains(&talker) {
                    self.gsa_talkers.push(talker.clone());
                }
                Some(talker)
            }
            None if !self.gsa_talkers.is_empty() => {
                let talker = self.gsa_talkers[self.gsa_rotation % self.gsa_talkers.len()].clone();
                self.gsa_rotation += 1;
                Some(talker)
            }
            None => None,
        };
        if let Some(talker) = talker {
            for sat in self
                .satellites
                .values_mut()
                .filter(|s| s.talker == talker)
            {
                sat.used = gsa.sv_ids.contains(&sat.svid);
            }
        }

        self.gsa_done = true;
        Ok(())
    }

    fn update_vtg(&mut self, vtg: &Vtg) {
        self.pos.true_track = vtg.true_track;
        self.pos.magnetic_track = vtg.magnetic_track;
        self.pos.ground_speed_knots = vtg.speed_knots;
        self.pos.ground_speed_kph = vtg.speed_kph;
        self.vtg_done = true;
    }

    fn update_gga(&mut self, gga: &Gga) -> Result<(), NavError> {
        self.pos.latitude = gga.latitude.map(|lat| match gga.ns {
            Some('S') => -lat,
            _ => lat,
        });
        self.pos.longitude = gga.longitude.map(|lon| match gga.ew {
            Some('W') => -lon,
            _ => lon,
        });

        match (&gga.altitude_unit, &gga.separation_unit) {
            (Some(alt_unit), Some(sep_unit)) => {
                if alt_unit != "M" {
                    return Err(NavError::AltitudeUnit(alt_unit.clone()));
                }
                if sep_unit != alt_unit {
                    return Err(NavError::SeparationUnit(sep_unit.clone()));
                }
                self.pos.altitude_meter = gga.altitude;
                self.pos.separation_meter = gga.separation;
            }
            _ => {
                self.pos.altitude_meter = None;
                self.pos.separation_meter = None;
            }
        }

        self.pos.utc_time = gga.time;
        self.gga_done = true;
        Ok(())
    }

    fn cycle_done(&self) -> bool {
        self.gsv_done && self.gsa_done && self.vtg_done && self.gga_done
    }

    fn reset_cycle(&mut self) {
        self.gsv_done = false;
        self.gsa_done = false;
        self.vtg_done = false;
        self.gga_done = false;
    }
}

/// Monitor for satellite navigation, fed with NMEA sentences and
/// barometric snapshots.
pub struct NavMonitor {
    state: Mutex<NavState>,
    observers: Mutex<Vec<Arc<dyn Observer>>>,
}

impl NavMonitor {
    pub fn new() -> Self {
        NavMonitor {
            state: Mutex::new(NavState::new()),
            observers: Mutex::new(Vec::new()),
        }
    }

    /// Register an observer for completed update cycles.
    pub fn register(&self, observer: Arc<dyn Observer>) {
        self.observers.lock().unwrap().push(observer);
    }

    /// Deep copy of the satellite registry, in svid order.
    pub fn satellites(&self) -> Vec<SatInfo> {
        self.state.lock().unwrap().satellites.values().cloned().collect()
    }

    /// Deep copy of the current position fact.
    pub fn pos_info(&self) -> PosInfo {
        self.state.lock().unwrap().pos.clone()
    }

    /// Apply one NMEA sentence. When the sentence completes an update
    /// cycle, observers are notified with a copy of the position after
    /// the monitor lock has been released.
    pub fn update(&self, sentence: &Sentence) -> Result<(), NavError> {
        let completed = {
            let mut state = self.state.lock().unwrap();
            match sentence {
                Sentence::Gsv(gsv) => state.update_gsv(gsv),
                Sentence::Gsa(gsa) => state.update_gsa(gsa)?,
                Sentence::Vtg(vtg) => state.update_vtg(vtg),
                Sentence::Gga(gga) => state.update_gga(gga)?,
                Sentence::Other { .. } => {}
            }
            if state.cycle_done() {
                debug!("nav monitor update cycle done");
                state.reset_cycle();
                Some(state.pos.clone())
            } else {
                None
            }
        };
        if let Some(pos) = completed {
            self.notify(&Report::Position(pos));
        }
        Ok(())
    }

    /// Merge one barometric snapshot into the position fact.
    pub fn update_bme(&self, reading: &BmeReading) {
        let mut state = self.state.lock().unwrap();
        state.pos.temperature = Some(reading.temperature);
        state.pos.humidity = Some(reading.humidity);
        state.pos.pressure = Some(reading.pressure);
        state.pos.pressure_altitude = Some(reading.pressure_altitude);
    }

    fn notify(&self, report: &Report) {
        for observer in self.observers.lock().unwrap().iter() {
            observer.notify(report);
        }
    }
}

impl Default for NavMonitor {
    fn default() -> Self {
        NavMonitor::new()
    }
}
