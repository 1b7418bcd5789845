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

pub mod db;
pub mod nav;
pub mod traffic;

use nav::PosInfo;
use traffic::TrafficEntry;

/// A state change published by one of the monitors.
///
/// Traffic reports carry the updated entry; position reports carry the
/// complete fused position after a full update cycle. Values are deep
/// copies taken before the monitor lock is released, so observers never
/// see concurrent mutation.
#[derive(Debug, Clone)]
pub enum Report {
    Traffic(TrafficEntry),
    Position(PosInfo),
}

/// Receives monitor state changes on the updating thread's context.
///
/// Notification happens after the monitor lock has been released;
/// observers may call back into monitor snapshots.
pub trait Observer: Send + Sync {
    fn notify(&self, report: &Report);
}
