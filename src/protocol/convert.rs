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

//! Turns monitor reports into GDL90 wire messages and drives the
//! periodic heartbeat.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::{NaiveTime, Timelike};

use super::gdl90::{
    AirborneIndicator, EmitterCategory, HeartbeatMessage, OwnshipGeoAltitudeMessage,
    TrackIndicator, TrafficMessage,
};
use super::Gdl90Message;
use crate::processor::nav::{NavMode, NavMonitor, PosInfo};
use crate::processor::traffic::TrafficEntry;
use crate::processor::{Observer, Report};
use crate::transport::gdl90_port::Gdl90Port;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(1);

/// Merit reported for our own geometric altitude, in meters.
const OWNSHIP_MERIT: u16 = 50;

/// Observer on both monitors; converts their reports into GDL90
/// messages and queues them on the egress port. Also owns the 1 Hz
/// heartbeat built from the current position fact.
pub struct Gdl90Sender {
    port: Arc<Gdl90Port>,
    nav: Arc<NavMonitor>,
}

impl Gdl90Sender {
    pub fn new(port: Arc<Gdl90Port>, nav: Arc<NavMonitor>) -> Arc<Self> {
        Arc::new(Gdl90Sender { port, nav })
    }

    pub fn start_heartbeat(self: &Arc<Self>) {
        let sender = Arc::clone(self);
        thread::spawn(move || loop {
            let heartbeat = heartbeat_message(&sender.nav.pos_info());
            sender.port.put_message(Gdl90Message::Heartbeat(heartbeat));
            thread::sleep(HEARTBEAT_INTERVAL);
        });
    }
}

impl Observer for Gdl90Sender {
    fn notify(&self, report: &Report) {
        match report {
            Report::Traffic(entry) => {
                self.port
                    .put_message(Gdl90Message::Traffic(traffic_message(entry)));
            }
            Report::Position(pos) => {
                self.port
                    .put_message(Gdl90Message::Ownship(ownship_message(pos)));
                self.port.put_message(Gdl90Message::OwnshipGeoAltitude(
                    ownship_geo_altitude_message(pos),
                ));
            }
        }
    }
}

pub fn heartbeat_message(pos: &PosInfo) -> HeartbeatMessage {
    let seconds = pos.utc_time.map(seconds_since_midnight);
    HeartbeatMessage {
        pos_valid: matches!(pos.nav_mode, Some(mode) if mode != NavMode::NoFix),
        is_initialized: seconds.is_some(),
        is_low_battery: false,
        time: seconds.unwrap_or(0),
        uplink_msg_count: 0,
        basic_and_long_msg_count: 0,
    }
}

pub fn ownship_message(pos: &PosInfo) -> TrafficMessage {
    let score = ownship_nav_score(pos.nav_mode);
    TrafficMessage {
        address: 0,
        latitude: pos.latitude.unwrap_or(0.0),
        longitude: pos.longitude.unwrap_or(0.0),
        altitude: altitude_ft(pos),
        track_indicator: TrackIndicator::TrueTrackAngle,
        airborne_indicator: AirborneIndicator::Airborne,
        nav_integrity_cat: score,
        nav_accuracy_cat: score,
        h_velocity: pos.ground_speed_knots.map(|v| v as i32).unwrap_or(0),
        v_velocity: Some(0),
        track: pos.true_track.unwrap_or(0.0),
        emitter: EmitterCategory::Light,
        ..Default::default()
    }
}

pub fn ownship_geo_altitude_message(pos: &PosInfo) -> OwnshipGeoAltitudeMessage {
    OwnshipGeoAltitudeMessage {
        altitude: altitude_ft(pos),
        merit: Some(OWNSHIP_MERIT),
        is_warning: false,
    }
}

pub fn traffic_message(entry: &TrafficEntry) -> TrafficMessage {
    let score = traffic_nav_score(entry);
    TrafficMessage {
        address: entry.id,
        latitude: entry.latitude.unwrap_or(0.0),
        longitude: entry.longitude.unwrap_or(0.0),
        altitude: entry.altitude.unwrap_or(0),
        track_indicator: TrackIndicator::TrueTrackAngle,
        airborne_indicator: airborne_indicator(entry.is_on_ground),
        nav_integrity_cat: score,
        nav_accuracy_cat: score,
        h_velocity: entry.ground_speed.unwrap_or(0),
        v_velocity: Some(entry.vertical_speed.unwrap_or(0)),
        track: entry.track.unwrap_or(0) as f64,
        emitter: EmitterCategory::from_wire(entry.category as u8),
        callsign: entry.callsign.clone().unwrap_or_default(),
        ..Default::default()
    }
}

fn altitude_ft(pos: &PosInfo) -> i32 {
    pos.altitude_meter
        .map(|m| m_to_ft!(m).round() as i32)
        .unwrap_or(0)
}

fn seconds_since_midnight(t: NaiveTime) -> u32 {
    t.hour() * 3600 + t.minute() * 60 + t.second()
}

fn ownship_nav_score(nav_mode: Option<NavMode>) -> u8 {
    match nav_mode {
        Some(NavMode::Fix3D) => 9,
        Some(NavMode::Fix2D) => 5,
        _ => 0,
    }
}

fn traffic_nav_score(entry: &TrafficEntry) -> u8 {
    let complete = entry.latitude.is_some()
        && entry.longitude.is_some()
        && entry.ground_speed.is_some()
        && entry.vertical_speed.is_some()
        && entry.track.is_some();
    if complete {
        10
    } else {
        0
    }
}

/// Unknown on-ground state is reported as airborne.
fn airborne_indicator(on_ground: Option<bool>) -> AirborneIndicator {
    match on_ground {
        Some(true) => AirborneIndicator::OnGround,
        _ => AirborneIndicator::Airborne,
    }
}
