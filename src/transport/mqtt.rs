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

//! Broker wiring. The rest of the system only sees the [`Messenger`]
//! trait and the dispatcher callback; paho stays behind this module.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use paho_mqtt as mqtt;

use super::Messenger;
use crate::dispatch::MessageDispatcher;

pub struct MqttMessenger {
    client: mqtt::Client,
}

impl MqttMessenger {
    /// Connect to the broker. Consuming starts before the connection so
    /// no message between connect and subscribe is lost.
    pub fn launch(
        client_id: &str,
        host: &str,
        port: u16,
    ) -> Result<(Arc<Self>, mqtt::Receiver<Option<mqtt::Message>>), mqtt::Error> {
        let uri = format!("tcp://{}:{}", host, port);
        let create_opts = mqtt::CreateOptionsBuilder::new()
            .server_uri(&uri)
            .client_id(client_id)
            .finalize();
        let mut client = mqtt::Client::new(create_opts)?;
        let rx = client.start_consuming();

        let conn_opts = mqtt::ConnectOptionsBuilder::new()
            .keep_alive_interval(Duration::from_secs(60))
            .clean_session(false)
            .automatic_reconnect(Duration::from_secs(1), Duration::from_secs(30))
            .finalize();
        client.connect(conn_opts)?;
        info!("mqtt connected to {}", uri);

        Ok((Arc::new(MqttMessenger { client }), rx))
    }

    /// Subscribe the inbound topics and feed received messages to the
    /// dispatcher on a dedicated thread.
    pub fn subscribe_and_dispatch(
        self: &Arc<Self>,
        rx: mqtt::Receiver<Option<mqtt::Message>>,
        topics: &[String],
        dispatcher: Arc<MessageDispatcher>,
    ) -> Result<(), mqtt::Error> {
        let qos = vec![0; topics.len()];
        self.client.subscribe_many(topics, &qos)?;
        for topic in topics {
            info!("subscribed to topic {}", topic);
        }

        let messenger = Arc::clone(self);
        thread::spawn(move || {
            for msg in rx.iter() {
                match msg {
                    Some(msg) => dispatcher.on_message(msg.topic(), msg.payload()),
                    None => {
                        // None marks a connection interruption; the
                        // client reconnects on its own
                        if !messenger.client.is_connected() {
                            warn!("mqtt connection lost, waiting for reconnect");
                        }
                    }
                }
            }
        });
        Ok(())
    }
}

impl Messenger for MqttMessenger {
    fn publish(&self, topic: &str, payload: &str) {
        let msg = mqtt::Message::new(topic, payload, 0);
        if let Err(e) = self.client.publish(msg) {
            error!("could not publish to {}, {}", topic, e);
        }
    }
}
