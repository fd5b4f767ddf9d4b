use std::collections::HashMap;
use std::net::IpAddr;
use std::thread::{self, JoinHandle};

use rumqttd::local::{LinkRx, LinkTx};
use rumqttd::{Broker, Config, ConnectionSettings, RouterConfig, ServerSettings};

use crate::error::MockError;
use crate::settings;

/// In-process MQTT broker standing in for the public one the device uses.
pub struct MockBroker {
    broker: Broker,
}

impl MockBroker {
    pub fn new(settings: &settings::Broker) -> Result<Self, MockError> {
        let broker = Broker::new(Config {
            id: 0,
            router: RouterConfig {
                max_connections: 64,
                max_outgoing_packet_count: 200,
                max_segment_size: 104857600,
                max_segment_count: 10,
                custom_segment: None,
                initialized_filters: None,
                shared_subscriptions_strategy: Default::default(),
            },
            v4: Some(HashMap::from([(
                1.to_string(),
                ServerSettings {
                    name: "v4-1".to_string(),
                    listen: (settings.address.parse::<IpAddr>()?, settings.port).into(),
                    tls: None,
                    next_connection_delay_ms: 10,
                    connections: ConnectionSettings {
                        connection_timeout_ms: 60000,
                        max_payload_size: 20480,
                        max_inflight_count: 100,
                        auth: None,
                        external_auth: None,
                        dynamic_filters: true,
                    },
                },
            )])),
            v5: None,
            ws: None,
            cluster: None,
            console: None,
            bridge: None,
            prometheus: None,
            metrics: None,
        });

        Ok(Self { broker })
    }

    /// Local link into the router, usable before and after `start`.
    pub fn link(&self, client_id: &str, filter: &str) -> Result<(LinkTx, LinkRx), MockError> {
        let (mut link_tx, link_rx) = self.broker.link(client_id)?;
        link_tx.subscribe(filter)?;

        tracing::debug!("Local link {} subscribed to {}", client_id, filter);
        Ok((link_tx, link_rx))
    }

    /// Runs the network listeners on a dedicated thread.
    pub fn start(mut self) -> JoinHandle<()> {
        thread::spawn(move || {
            if let Err(e) = self.broker.start() {
                tracing::error!("Broker stopped: {e}");
            }
        })
    }
}
