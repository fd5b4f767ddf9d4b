use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use rumqttc::{
    Client, ClientError, ConnectReturnCode, Connection, ConnectionError, Event, MqttOptions,
    Packet, QoS, RecvTimeoutError,
};
use thiserror::Error;

use tankwatch_embedded::network::{InboundMessage, MqttSession};

use crate::simulate::Carrier;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
const POLL_WINDOW: Duration = Duration::from_millis(5);
const KEEP_ALIVE: Duration = Duration::from_secs(15);
const REQUEST_CAPACITY: usize = 16;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("network link is down")]
    NoCarrier,
    #[error("connection refused by simulation")]
    Refused,
    #[error("broker rejected connection: {0:?}")]
    Rejected(ConnectReturnCode),
    #[error("no CONNACK within {0:?}")]
    Timeout(Duration),
    #[error("not connected")]
    NotConnected,
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Blocking rumqttc client driven from the device loop.
pub struct RumqttSession {
    host: String,
    port: u16,
    carrier: Arc<Carrier>,
    /// Outage count when the current session was opened
    opened_at_outage: u64,
    refusals: u32,
    client: Option<(Client, Connection)>,
    inbound: VecDeque<InboundMessage>,
}

impl RumqttSession {
    /// `carrier` is the link's association state; any outage after
    /// `connect` ends the session.
    pub fn new(host: &str, port: u16, carrier: Arc<Carrier>) -> Self {
        Self {
            host: host.to_string(),
            port,
            carrier,
            opened_at_outage: 0,
            refusals: 0,
            client: None,
            inbound: VecDeque::new(),
        }
    }

    /// Refuse the next `count` connects as an unreachable broker would.
    pub fn with_refusals(mut self, count: u32) -> Self {
        self.refusals = count;
        self
    }

    fn has_carrier(&self) -> bool {
        self.carrier.is_up()
    }

    /// Carrier is up and has not dropped since the session was opened.
    fn carrier_intact(&self) -> bool {
        self.has_carrier() && self.carrier.outages() == self.opened_at_outage
    }

    fn drop_session(&mut self, reason: &str) {
        if let Some((client, _)) = self.client.take() {
            tracing::warn!("MQTT session lost: {reason}");
            client.disconnect().ok();
        }
    }

    fn await_connack(connection: &mut Connection) -> Result<(), SessionError> {
        loop {
            match connection.recv_timeout(CONNECT_TIMEOUT) {
                Ok(Ok(Event::Incoming(Packet::ConnAck(ack)))) => {
                    return match ack.code {
                        ConnectReturnCode::Success => Ok(()),
                        code => Err(SessionError::Rejected(code)),
                    };
                }
                Ok(Ok(_)) => continue,
                Ok(Err(e)) => return Err(e.into()),
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    return Err(SessionError::Timeout(CONNECT_TIMEOUT));
                }
            }
        }
    }

    /// Moves whatever the event loop has ready into the inbound queue.
    fn pump(&mut self) {
        if !self.carrier_intact() {
            self.drop_session("link lost");
            return;
        }

        let Some((_, connection)) = self.client.as_mut() else {
            return;
        };

        let mut failure = None;
        loop {
            match connection.recv_timeout(POLL_WINDOW) {
                Ok(Ok(Event::Incoming(Packet::Publish(publish)))) => {
                    self.inbound.push_back(InboundMessage {
                        topic: publish.topic,
                        payload: publish.payload.to_vec(),
                    });
                }
                Ok(Ok(event)) => tracing::trace!("MQTT event: {event:?}"),
                Ok(Err(e)) => {
                    failure = Some(e.to_string());
                    break;
                }
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => {
                    failure = Some("event loop closed".to_string());
                    break;
                }
            }
        }

        if let Some(reason) = failure {
            self.drop_session(&reason);
        }
    }
}

impl MqttSession for RumqttSession {
    type Error = SessionError;

    fn connect(&mut self, client_id: &str) -> Result<(), Self::Error> {
        self.client = None;

        if !self.has_carrier() {
            return Err(SessionError::NoCarrier);
        }
        if self.refusals > 0 {
            self.refusals -= 1;
            return Err(SessionError::Refused);
        }

        let outages = self.carrier.outages();
        let mut options = MqttOptions::new(client_id, &self.host, self.port);
        options.set_keep_alive(KEEP_ALIVE);
        options.set_clean_session(true);

        let (client, mut connection) = Client::new(options, REQUEST_CAPACITY);
        Self::await_connack(&mut connection)?;

        self.client = Some((client, connection));
        self.opened_at_outage = outages;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.client.is_some() && self.carrier_intact()
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), Self::Error> {
        let (client, _) = self.client.as_mut().ok_or(SessionError::NotConnected)?;
        client.subscribe(topic, QoS::AtMostOnce)?;
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), Self::Error> {
        let (client, _) = self.client.as_mut().ok_or(SessionError::NotConnected)?;
        client.publish(topic, QoS::AtMostOnce, false, payload.to_vec())?;
        Ok(())
    }

    fn poll(&mut self) -> Option<InboundMessage> {
        if self.inbound.is_empty() {
            self.pump();
        }
        self.inbound.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn up_carrier() -> Arc<Carrier> {
        let carrier = Arc::new(Carrier::default());
        carrier.set(true);
        carrier
    }

    #[test]
    fn test_link_outage_ends_session() {
        let carrier = up_carrier();
        let mut session = RumqttSession::new("127.0.0.1", 1883, Arc::clone(&carrier));
        let options = MqttOptions::new("ESP32Client-1", "127.0.0.1", 1883);
        session.client = Some(Client::new(options, REQUEST_CAPACITY));
        session.opened_at_outage = carrier.outages();
        assert!(session.is_connected());

        carrier.set(false);
        carrier.set(true);

        assert!(!session.is_connected(), "Session opened before the outage is stale");
        assert!(session.poll().is_none());
        assert!(session.client.is_none());
    }

    #[test]
    fn test_connect_requires_carrier() {
        let carrier = Arc::new(Carrier::default());
        let mut session = RumqttSession::new("127.0.0.1", 1883, carrier);

        assert!(matches!(
            session.connect("ESP32Client-1"),
            Err(SessionError::NoCarrier)
        ));
        assert!(!session.is_connected());
    }

    #[test]
    fn test_scripted_refusals() {
        let carrier = up_carrier();
        let mut session = RumqttSession::new("127.0.0.1", 1883, carrier).with_refusals(2);

        assert!(matches!(session.connect("a"), Err(SessionError::Refused)));
        assert!(matches!(session.connect("b"), Err(SessionError::Refused)));
        assert_eq!(session.refusals, 0);
    }

    #[test]
    fn test_requests_need_session() {
        let carrier = up_carrier();
        let mut session = RumqttSession::new("127.0.0.1", 1883, carrier);

        assert!(matches!(
            session.publish("t", b"x"),
            Err(SessionError::NotConnected)
        ));
        assert!(matches!(session.subscribe("t"), Err(SessionError::NotConnected)));
        assert!(session.poll().is_none());
    }
}
