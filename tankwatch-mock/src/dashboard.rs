use std::collections::VecDeque;
use std::time::Duration;

use rumqttd::Notification;
use rumqttd::local::{LinkRx, LinkTx};
use tokio::time::{Instant, sleep_until};

use tankwatch_embedded::Telemetry;

use crate::broker::MockBroker;
use crate::error::MockError;
use crate::settings::{ScriptedCommand, Settings};

/// Stand-in for the web dashboard: prints telemetry and sends the scripted
/// operator commands.
pub struct Dashboard {
    namespace: String,
    link_tx: LinkTx,
    link_rx: LinkRx,
    pending: VecDeque<ScriptedCommand>,
    received: u64,
}

impl Dashboard {
    pub fn new(broker: &MockBroker, settings: &Settings) -> Result<Self, MockError> {
        let namespace = settings.device.namespace.clone();
        let (link_tx, link_rx) = broker.link("dashboard", &format!("{namespace}/data"))?;

        let mut commands = settings.dashboard.commands.clone();
        commands.sort_by_key(|command| command.after_s);

        Ok(Self {
            namespace,
            link_tx,
            link_rx,
            pending: commands.into(),
            received: 0,
        })
    }

    pub async fn run(mut self) -> Result<(), MockError> {
        let started = Instant::now();

        loop {
            let deadline = self
                .pending
                .front()
                .map(|command| started + Duration::from_secs(command.after_s));

            tokio::select! {
                notification = self.link_rx.next() => {
                    match notification? {
                        Some(Notification::Forward(forward)) => self.on_telemetry(&forward.publish.payload),
                        Some(other) => tracing::trace!("{other:?}"),
                        None => {}
                    }
                }
                _ = sleep_until(deadline.unwrap_or(started)), if deadline.is_some() => {
                    if let Some(command) = self.pending.pop_front() {
                        self.send(command)?;
                    }
                }
            }
        }
    }

    fn on_telemetry(&mut self, payload: &[u8]) {
        match serde_json::from_slice::<Telemetry>(payload) {
            Ok(telemetry) => {
                self.received += 1;
                tracing::info!(
                    "Dashboard #{}: level {}%, distance {:.1} cm, motor {}, {}",
                    self.received,
                    telemetry.level,
                    telemetry.distance_cm,
                    telemetry.motor,
                    telemetry.status
                );
            }
            Err(e) => tracing::error!("Malformed telemetry: {e}"),
        }
    }

    fn send(&mut self, command: ScriptedCommand) -> Result<(), MockError> {
        let topic = format!("{}/{}", self.namespace, command.topic);
        tracing::info!("Dashboard sends {} to {}", command.payload, topic);

        self.link_tx.publish(topic, command.payload)?;
        Ok(())
    }
}
