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

//! Periodic JSON snapshots of the monitored state for the local UI.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serde_json::json;

use crate::processor::nav::NavMonitor;
use crate::processor::traffic::TrafficMonitor;
use crate::transport::gdl90_port::Gdl90Port;
use crate::transport::Messenger;

pub const TOPIC_SATELLITES: &str = "/easyadsb/monitor/satellites";
pub const TOPIC_TRAFFIC: &str = "/easyadsb/monitor/traffic";
pub const TOPIC_POSITION: &str = "/easyadsb/monitor/position";
pub const TOPIC_SYSTEM: &str = "/easyadsb/monitor/system";

pub struct JsonNotifier {
    nav: Arc<NavMonitor>,
    traffic: Arc<TrafficMonitor>,
    port: Arc<Gdl90Port>,
    messenger: Arc<dyn Messenger>,
    interval: Duration,
}

impl JsonNotifier {
    pub fn new(
        nav: Arc<NavMonitor>,
        traffic: Arc<TrafficMonitor>,
        port: Arc<Gdl90Port>,
        messenger: Arc<dyn Messenger>,
    ) -> Arc<Self> {
        Arc::new(JsonNotifier {
            nav,
            traffic,
            port,
            messenger,
            interval: Duration::from_secs(1),
        })
    }

    pub fn start(self: &Arc<Self>) {
        let notifier = Arc::clone(self);
        thread::spawn(move || loop {
            thread::sleep(notifier.interval);
            notifier.publish_snapshots();
        });
    }

    fn publish_snapshots(&self) {
        self.publish_serialized(TOPIC_SATELLITES, &self.nav.satellites());

        let mut entries: Vec<_> = self.traffic.traffic().into_iter().map(|(_, e)| e).collect();
        entries.sort_by_key(|e| e.id);
        self.publish_serialized(TOPIC_TRAFFIC, &entries);

        self.publish_serialized(TOPIC_POSITION, &self.nav.pos_info());

        let system = json!({
            "gdl90": {
                "isActive": self.port.is_active(),
                "ip": self.port.ip().map(|ip| ip.to_string()),
                "netMask": self.port.net_mask().map(|mask| mask.to_string()),
                "broadcastIp": self.port.broadcast_ip().map(|ip| ip.to_string()),
                "nic": self.port.nic(),
                "port": self.port.port(),
            }
        });
        self.publish_serialized(TOPIC_SYSTEM, &system);
    }

    fn publish_serialized<T: serde::Serialize>(&self, topic: &str, value: &T) {
        match serde_json::to_string(value) {
            Ok(json) => self.messenger.publish(topic, &json),
            Err(e) => error!("error sending json messages, {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::db::{AircraftDb, TypeDb, TypeExtensionDb};
    use crate::sensor::sbs::SbsMessage;
    use serde_json::Value;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct RecordingMessenger(Mutex<Vec<(String, String)>>);

    impl Messenger for RecordingMessenger {
        fn publish(&self, topic: &str, payload: &str) {
            self.0
                .lock()
                .unwrap()
                .push((topic.to_string(), payload.to_string()));
        }
    }

    #[test]
    fn test_publishes_all_four_snapshots() {
        let nav = Arc::new(NavMonitor::new());
        let traffic = Arc::new(TrafficMonitor::new(
            AircraftDb::from_entries(HashMap::new()),
            TypeDb::from_entries(HashMap::new()),
            TypeExtensionDb::from_entries(HashMap::new()),
            0,
        ));
        traffic
            .update(&SbsMessage::parse(
                "MSG,3,111,11111,A04424,111111,2016/03/11,13:07:05.343,2016/03/11,\
                 13:07:05.288,,11025,,,37.17274,-122.03935,,,,,,0",
            ).unwrap())
            .unwrap();
        let port = Gdl90Port::new("eth0", 4000);
        let messenger = Arc::new(RecordingMessenger(Mutex::new(Vec::new())));
        let notifier = JsonNotifier::new(nav, traffic, port, messenger.clone());

        notifier.publish_snapshots();

        let published = messenger.0.lock().unwrap();
        let topics: Vec<&str> = published.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(
            topics,
            vec![TOPIC_SATELLITES, TOPIC_TRAFFIC, TOPIC_POSITION, TOPIC_SYSTEM]
        );

        let satellites: Value = serde_json::from_str(&published[0].1).unwrap();
        assert_eq!(satellites, Value::Array(Vec::new()));

        let traffic_list: Value = serde_json::from_str(&published[1].1).unwrap();
        assert_eq!(traffic_list.as_array().unwrap().len(), 1);
        assert_eq!(traffic_list[0]["id"], Value::from(0xA04424));

        let position: Value = serde_json::from_str(&published[2].1).unwrap();
        assert!(position.get("trueTack").is_some());

        let system: Value = serde_json::from_str(&published[3].1).unwrap();
        assert_eq!(system["gdl90"]["isActive"], Value::Bool(false));
        assert_eq!(system["gdl90"]["ip"], Value::Null);
        assert_eq!(system["gdl90"]["nic"], Value::String("eth0".to_string()));
        assert_eq!(system["gdl90"]["port"], Value::from(4000));
    }
}
