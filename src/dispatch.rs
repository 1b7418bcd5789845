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

//! Routes inbound broker messages to the monitors and serves the
//! traffic control request topic. Malformed payloads are logged and
//! dropped; the affected monitor keeps its state.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::processor::nav::NavMonitor;
use crate::processor::traffic::TrafficMonitor;
use crate::sensor::bme::BmeReading;
use crate::sensor::sbs::SbsMessage;
use crate::sensor::{nmea, ubx};
use crate::transport::Messenger;

pub const TRAFFIC_CTRL_TOPIC: &str = "/easyadsb/monitor/traffic/ctrl";

#[derive(Deserialize)]
struct CtrlRequest {
    command: String,
    #[serde(default)]
    data: Value,
    #[serde(rename = "requestId")]
    request_id: String,
}

#[derive(Serialize)]
struct CtrlResponse {
    success: bool,
    data: Value,
    #[serde(rename = "requestId")]
    request_id: String,
}

pub struct MessageDispatcher {
    nav: Arc<NavMonitor>,
    traffic: Arc<TrafficMonitor>,
    messenger: Arc<dyn Messenger>,
}

impl MessageDispatcher {
    pub fn new(
        nav: Arc<NavMonitor>,
        traffic: Arc<TrafficMonitor>,
        messenger: Arc<dyn Messenger>,
    ) -> Arc<Self> {
        Arc::new(MessageDispatcher {
            nav,
            traffic,
            messenger,
        })
    }

    /// Route one broker message by topic substring.
    pub fn on_message(&self, topic: &str, payload: &[u8]) {
        if topic == TRAFFIC_CTRL_TOPIC {
            self.on_traffic_request(topic, payload);
        } else if topic.contains("nmea") {
            self.on_nmea(payload);
        } else if topic.contains("ubx") {
            self.on_ubx(payload);
        } else if topic.contains("sbs") {
            self.on_sbs(payload);
        } else if topic.contains("bme") {
            self.on_bme(payload);
        } else {
            warn!("message from unexpected topic \"{}\"", topic);
        }
    }

    fn on_nmea(&self, payload: &[u8]) {
        let text = match std::str::from_utf8(payload) {
            Ok(text) => text,
            Err(e) => {
                error!("on nmea message decode error, {}, {:02X?}", e, payload);
                return;
            }
        };
        let sentence = match nmea::parse(text) {
            Ok(sentence) => sentence,
            Err(e) => {
                error!("on nmea message error, {}, \"{}\"", e, text.trim());
                return;
            }
        };
        debug!("{:?}", sentence);
        if let Err(e) = self.nav.update(&sentence) {
            error!("on nmea message error, {}, \"{}\"", e, text.trim());
        }
    }

    fn on_ubx(&self, payload: &[u8]) {
        match ubx::parse(payload) {
            Ok(frame) => debug!("{}", frame),
            Err(e) => error!("on ubx message error, {}, {:02X?}", e, payload),
        }
    }

    fn on_sbs(&self, payload: &[u8]) {
        let text = match std::str::from_utf8(payload) {
            Ok(text) => text,
            Err(e) => {
                error!("on sbs message decode error, {}, {:02X?}", e, payload);
                return;
            }
        };
        let msg = match SbsMessage::parse(text) {
            Ok(msg) => msg,
            Err(e) => {
                error!("on sbs message error, {}, \"{}\"", e, text.trim());
                return;
            }
        };
        debug!("{:?}", msg);
        if let Err(e) = self.traffic.update(&msg) {
            error!("on sbs message error, {}, \"{}\"", e, text.trim());
        }
    }

    fn on_bme(&self, payload: &[u8]) {
        match BmeReading::parse(payload) {
            Ok(reading) => {
                debug!("{:?}", reading);
                self.nav.update_bme(&reading);
            }
            Err(e) => error!("on bme message error, {}, {:02X?}", e, payload),
        }
    }

    fn on_traffic_request(&self, topic: &str, payload: &[u8]) {
        let request: CtrlRequest = match serde_json::from_slice(payload) {
            Ok(request) => request,
            Err(e) => {
                error!("unreadable traffic request, {}, {:02X?}", e, payload);
                return;
            }
        };
        let response = CtrlResponse {
            success: self.execute_command(&request),
            data: Value::Null,
            request_id: request.request_id,
        };
        match serde_json::to_string(&response) {
            Ok(json) => self
                .messenger
                .publish(&format!("{}/response", topic), &json),
            Err(e) => error!("could not serialize traffic response, {}", e),
        }
    }

    fn execute_command(&self, request: &CtrlRequest) -> bool {
        match request.command.as_str() {
            "clearHistory" => {
                info!("cleanup unseen traffic");
                self.traffic.cleanup();
                true
            }
            "setAutoCleanup" => match request.data.get("enabled").and_then(Value::as_bool) {
                Some(true) => {
                    self.traffic.start_auto_cleanup();
                    true
                }
                Some(false) => {
                    self.traffic.stop_auto_cleanup();
                    true
                }
                None => {
                    warn!("setAutoCleanup request without enabled flag");
                    false
                }
            },
            other => {
                warn!("unknown traffic command \"{}\"", other);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::db::{AircraftDb, TypeDb, TypeExtensionDb};
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

    fn dispatcher() -> (
        Arc<MessageDispatcher>,
        Arc<NavMonitor>,
        Arc<TrafficMonitor>,
        Arc<RecordingMessenger>,
    ) {
        let nav = Arc::new(NavMonitor::new());
        let traffic = Arc::new(TrafficMonitor::new(
            AircraftDb::from_entries(HashMap::new()),
            TypeDb::from_entries(HashMap::new()),
            TypeExtensionDb::from_entries(HashMap::new()),
            0,
        ));
        let messenger = Arc::new(RecordingMessenger(Mutex::new(Vec::new())));
        let dispatcher = MessageDispatcher::new(nav.clone(), traffic.clone(), messenger.clone());
        (dispatcher, nav, traffic, messenger)
    }

    #[test]
    fn test_routes_nmea_to_nav_monitor() {
        let (dispatcher, nav, _, _) = dispatcher();
        dispatcher.on_message(
            "/easyadsb/nmea",
            b"$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47",
        );
        assert!((nav.pos_info().latitude.unwrap() - 48.1173).abs() < 1e-6);
    }

    #[test]
    fn test_routes_sbs_to_traffic_monitor() {
        let (dispatcher, _, traffic, _) = dispatcher();
        dispatcher.on_message(
            "/easyadsb/sbs",
            b"MSG,3,111,11111,A04424,111111,2016/03/11,13:07:05.343,2016/03/11,\
              13:07:05.288,,11025,,,37.17274,-122.03935,,,,,,0",
        );
        assert!(traffic.traffic().contains_key(&0xA04424));
    }

    #[test]
    fn test_routes_bme_to_nav_monitor() {
        let (dispatcher, nav, _, _) = dispatcher();
        dispatcher.on_message(
            "/easyadsb/bme",
            br#"{"humidity":40.0,"pressure":990.0,"temperature":18.5,"pressureAltitude":195.0}"#,
        );
        assert_eq!(nav.pos_info().pressure, Some(990.0));
    }

    #[test]
    fn test_malformed_payloads_do_not_update_state() {
        let (dispatcher, nav, traffic, _) = dispatcher();
        dispatcher.on_message("/easyadsb/nmea", b"$GPGGA,garbage*00");
        dispatcher.on_message("/easyadsb/sbs", b"NOT,A,RECORD");
        dispatcher.on_message("/easyadsb/bme", b"{broken");
        dispatcher.on_message("/easyadsb/ubx", &[0xB5, 0x62, 0x01]);

        assert_eq!(nav.pos_info().latitude, None);
        assert!(traffic.traffic().is_empty());
    }

    #[test]
    fn test_clear_history_request() {
        let (dispatcher, _, _, messenger) = dispatcher();
        dispatcher.on_message(
            TRAFFIC_CTRL_TOPIC,
            br#"{"command":"clearHistory","data":null,"requestId":"42-abc"}"#,
        );

        let published = messenger.0.lock().unwrap();
        assert_eq!(published.len(), 1);
        let (topic, payload) = &published[0];
        assert_eq!(topic, "/easyadsb/monitor/traffic/ctrl/response");
        let response: Value = serde_json::from_str(payload).unwrap();
        assert_eq!(response["success"], Value::Bool(true));
        assert_eq!(response["requestId"], Value::String("42-abc".to_string()));
    }

    #[test]
    fn test_set_auto_cleanup_request() {
        let (dispatcher, _, traffic, _) = dispatcher();
        dispatcher.on_message(
            TRAFFIC_CTRL_TOPIC,
            br#"{"command":"setAutoCleanup","data":{"enabled":true},"requestId":"1"}"#,
        );
        assert!(traffic.auto_cleanup_running());

        dispatcher.on_message(
            TRAFFIC_CTRL_TOPIC,
            br#"{"command":"setAutoCleanup","data":{"enabled":false},"requestId":"2"}"#,
        );
        assert!(!traffic.auto_cleanup_running());
    }

    #[test]
    fn test_unknown_command_fails_request() {
        let (dispatcher, _, _, messenger) = dispatcher();
        dispatcher.on_message(
            TRAFFIC_CTRL_TOPIC,
            br#"{"command":"selfDestruct","data":null,"requestId":"3"}"#,
        );

        let published = messenger.0.lock().unwrap();
        let response: Value = serde_json::from_str(&published[0].1).unwrap();
        assert_eq!(response["success"], Value::Bool(false));
    }

    #[test]
    fn test_unexpected_topic_is_ignored() {
        let (dispatcher, nav, traffic, messenger) = dispatcher();
        dispatcher.on_message("/easyadsb/unknown", b"payload");
        assert_eq!(nav.pos_info(), Default::default());
        assert!(traffic.traffic().is_empty());
        assert!(messenger.0.lock().unwrap().is_empty());
    }
}
