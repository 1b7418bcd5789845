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

#[macro_use]
extern crate log;

#[macro_use]
mod utils;
mod dispatch;
mod notifier;
mod processor;
mod protocol;
mod sensor;
mod transport;

use std::env;
use std::process;
use std::sync::Arc;

use dispatch::{MessageDispatcher, TRAFFIC_CTRL_TOPIC};
use notifier::JsonNotifier;
use processor::db::{self, AircraftDb, TypeDb, TypeExtensionDb};
use processor::nav::NavMonitor;
use processor::traffic::TrafficMonitor;
use protocol::convert::Gdl90Sender;
use transport::gdl90_port::Gdl90Port;
use transport::mqtt::MqttMessenger;

struct Config {
    mqtt_host: String,
    mqtt_port: u16,
    mqtt_client_name: String,
    nmea_topic: String,
    ubx_topic: String,
    sbs_topic: String,
    bme_topic: String,
    gdl90_nic: String,
    gdl90_port: u16,
    aircraft_db: String,
    types_db: String,
    types_extension_db: String,
    db_version_file: String,
}

impl Config {
    fn from_env() -> Config {
        Config {
            mqtt_host: require("VN_MQTT_HOST"),
            mqtt_port: require_u16("VN_MQTT_PORT"),
            mqtt_client_name: env::var("VN_MQTT_CLIENT_NAME").unwrap_or_default(),
            nmea_topic: require("VN_MQTT_NMEA_TOPIC"),
            ubx_topic: require("VN_MQTT_UBX_TOPIC"),
            sbs_topic: require("VN_MQTT_SBS_TOPIC"),
            bme_topic: require("VN_MQTT_BME_TOPIC"),
            gdl90_nic: require("VN_GDL90_NETWORK_INTERFACE"),
            gdl90_port: require_u16("VN_GDL90_PORT"),
            aircraft_db: require("VN_AIRCRAFT_DB"),
            types_db: require("VN_TYPES_DB"),
            types_extension_db: require("VN_TYPES_EXTENSION_DB"),
            db_version_file: require("VN_DB_VERSION"),
        }
    }
}

fn require(name: &str) -> String {
    env::var(name).unwrap_or_else(|_| fatal(&format!("missing environment variable {}", name)))
}

fn require_u16(name: &str) -> u16 {
    require(name).parse().unwrap_or_else(|_| {
        fatal(&format!(
            "environment variable {} is not a port number",
            name
        ))
    })
}

fn fatal(msg: &str) -> ! {
    error!("{}", msg);
    process::exit(1);
}

fn main() {
    env_logger::init();
    let config = Config::from_env();

    let aircrafts = AircraftDb::load(&config.aircraft_db)
        .unwrap_or_else(|e| fatal(&format!("aircraft db {}: {}", config.aircraft_db, e)));
    let types = TypeDb::load(&config.types_db)
        .unwrap_or_else(|e| fatal(&format!("type db {}: {}", config.types_db, e)));
    let types_extension = TypeExtensionDb::load(&config.types_extension_db).unwrap_or_else(|e| {
        fatal(&format!(
            "type extension db {}: {}",
            config.types_extension_db, e
        ))
    });
    let db_version = db::load_version(&config.db_version_file)
        .unwrap_or_else(|e| fatal(&format!("db version {}: {}", config.db_version_file, e)));
    info!(
        "loaded {} aircraft, database version {}",
        aircrafts.len(),
        db_version
    );

    let client_name = if config.mqtt_client_name.is_empty() {
        let name = format!("venturi-{}", process::id());
        info!("mqtt client name is empty, using {}", name);
        name
    } else {
        config.mqtt_client_name.clone()
    };

    let traffic = Arc::new(TrafficMonitor::new(
        aircrafts,
        types,
        types_extension,
        db_version,
    ));
    traffic.start_auto_cleanup();
    let nav = Arc::new(NavMonitor::new());
    let port = Gdl90Port::new(&config.gdl90_nic, config.gdl90_port);

    let (messenger, rx) = MqttMessenger::launch(&client_name, &config.mqtt_host, config.mqtt_port)
        .unwrap_or_else(|e| fatal(&format!("could not connect to mqtt broker, {}", e)));

    let dispatcher = MessageDispatcher::new(nav.clone(), traffic.clone(), messenger.clone());
    let topics = vec![
        config.nmea_topic.clone(),
        config.ubx_topic.clone(),
        config.sbs_topic.clone(),
        config.bme_topic.clone(),
        TRAFFIC_CTRL_TOPIC.to_string(),
    ];
    messenger
        .subscribe_and_dispatch(rx, &topics, dispatcher)
        .unwrap_or_else(|e| fatal(&format!("could not subscribe to broker topics, {}", e)));

    let sender = Gdl90Sender::new(port.clone(), nav.clone());
    sender.start_heartbeat();
    traffic.register(sender.clone());
    nav.register(sender.clone());

    let notifier = JsonNotifier::new(nav, traffic, port.clone(), messenger);
    notifier.start();

    port.exec();
}
