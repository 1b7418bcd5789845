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

pub mod convert;
pub mod gdl90;

use gdl90::{HeartbeatMessage, OwnshipGeoAltitudeMessage, TrafficMessage};

/// One message queued for the egress port. The sender task picks the
/// encoder by variant.
#[derive(Debug, Clone, PartialEq)]
pub enum Gdl90Message {
    Heartbeat(HeartbeatMessage),
    Traffic(TrafficMessage),
    Ownship(TrafficMessage),
    OwnshipGeoAltitude(OwnshipGeoAltitudeMessage),
}
