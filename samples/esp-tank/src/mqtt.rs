use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use esp_idf_svc::mqtt::client::{
    EspMqttClient, EspMqttConnection, EventPayload, MqttClientConfiguration, QoS,
};
use log::{debug, warn};

use tankwatch_embedded::network::{InboundMessage, MqttSession};

use crate::error::{Result, TankError};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const EVENT_TASK_STACK: usize = 6 * 1024;

enum SessionEvent {
    Connected,
    Disconnected,
    Message(InboundMessage),
}

/// ESP-IDF MQTT client. A fresh client is created for every connect; its
/// event task forwards into a channel drained by `poll`.
pub struct EspSession {
    url: String,
    client: Option<EspMqttClient<'static>>,
    events: Option<Receiver<SessionEvent>>,
    connected: bool,
}

impl EspSession {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            url: format!("mqtt://{host}:{port}"),
            client: None,
            events: None,
            connected: false,
        }
    }

    fn spawn_event_task(mut connection: EspMqttConnection, tx: Sender<SessionEvent>) -> Result<()> {
        thread::Builder::new()
            .stack_size(EVENT_TASK_STACK)
            .spawn(move || {
                while let Ok(event) = connection.next() {
                    let forwarded = match event.payload() {
                        EventPayload::Connected(_) => SessionEvent::Connected,
                        EventPayload::Disconnected => SessionEvent::Disconnected,
                        EventPayload::Received {
                            topic: Some(topic),
                            data,
                            ..
                        } => SessionEvent::Message(InboundMessage {
                            topic: topic.to_string(),
                            payload: data.to_vec(),
                        }),
                        EventPayload::Error(e) => {
                            warn!("MQTT error: {:?}", e);
                            continue;
                        }
                        _ => continue,
                    };

                    if tx.send(forwarded).is_err() {
                        break;
                    }
                }
                debug!("MQTT event task finished");
            })?;
        Ok(())
    }

    fn drain_state(&mut self) -> Option<InboundMessage> {
        let events = self.events.as_ref()?;
        while let Ok(event) = events.try_recv() {
            match event {
                SessionEvent::Connected => self.connected = true,
                SessionEvent::Disconnected => self.connected = false,
                SessionEvent::Message(message) => return Some(message),
            }
        }
        None
    }
}

impl MqttSession for EspSession {
    type Error = TankError;

    fn connect(&mut self, client_id: &str) -> Result<()> {
        self.client = None;
        self.events = None;
        self.connected = false;

        let conf = MqttClientConfiguration {
            client_id: Some(client_id),
            keep_alive_interval: Some(Duration::from_secs(15)),
            network_timeout: Duration::from_secs(5),
            ..Default::default()
        };

        let (client, connection) = EspMqttClient::new(&self.url, &conf)?;
        let (tx, rx) = mpsc::channel();
        Self::spawn_event_task(connection, tx)?;

        loop {
            match rx.recv_timeout(CONNECT_TIMEOUT) {
                Ok(SessionEvent::Connected) => break,
                Ok(SessionEvent::Disconnected) => return Err(TankError::Rejected),
                Ok(SessionEvent::Message(_)) => continue,
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    return Err(TankError::ConnectTimeout);
                }
            }
        }

        self.client = Some(client);
        self.events = Some(rx);
        self.connected = true;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn subscribe(&mut self, topic: &str) -> Result<()> {
        let client = self.client.as_mut().ok_or(TankError::NotConnected)?;
        client.subscribe(topic, QoS::AtMostOnce)?;
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<()> {
        let client = self.client.as_mut().ok_or(TankError::NotConnected)?;
        client.publish(topic, QoS::AtMostOnce, false, payload)?;
        Ok(())
    }

    fn poll(&mut self) -> Option<InboundMessage> {
        self.drain_state()
    }
}
