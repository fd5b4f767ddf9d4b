use alloc::format;
use alloc::string::String;

use embedded_hal::delay::DelayNs;
use rand_core::RngCore;

use crate::config::{LINK_POLL_INTERVAL_MS, NetworkConfig, Topics};
use crate::error::{Error, Result};
use crate::time::{Clock, is_due};
use crate::types::DeviceState;

use super::{
    ConnectionState, InboundMessage, LinkPolicy, MqttSession, RetryPolicy, RetryTimer,
    WifiController,
};

/// Anonymous client identifier `<prefix>-<hex>`, fresh for every attempt.
pub fn client_id<R: RngCore>(prefix: &str, rng: &mut R) -> String {
    format!("{}-{:x}", prefix, rng.next_u32() & 0xffff)
}

/// Owns the link and the broker session and heals both for the lifetime of
/// the device.
pub struct ConnectivitySupervisor<W: WifiController, S: MqttSession> {
    link: W,
    session: S,
    config: NetworkConfig,
    topics: Topics,
    state: ConnectionState,
    session_retry: RetryTimer,
}

impl<W: WifiController, S: MqttSession> ConnectivitySupervisor<W, S> {
    pub fn new(link: W, session: S, config: NetworkConfig) -> Self {
        let topics = config.topics();
        let session_retry = RetryTimer::new(config.session_retry_delay_ms);

        Self {
            link,
            session,
            config,
            topics,
            state: ConnectionState::LinkDown,
            session_retry,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn session_failures(&self) -> u32 {
        self.session_retry.failures()
    }

    /// Blocks until the link is up, following the configured link policy.
    pub fn acquire_link<D: DelayNs>(&mut self, delay: &mut D) {
        log::info!("Connecting to WiFi");
        self.begin_link();

        let mut polls: u32 = 0;
        while !self.link.is_connected() {
            delay.delay_ms(LINK_POLL_INTERVAL_MS);
            polls += 1;

            if let LinkPolicy::Capped { polls: limit } = self.config.link_policy {
                if polls >= limit {
                    log::warn!("WiFi still down after {} polls, restarting connect", polls);
                    if let Err(e) = self.link.disconnect() {
                        log::debug!("WiFi disconnect failed: {:?}", e);
                    }
                    self.begin_link();
                    polls = 0;
                }
            }
        }

        match self.link.ip_address() {
            Some(ip) => log::info!("WiFi connected, IP address: {}", ip),
            None => log::info!("WiFi connected"),
        }
        self.refresh_state();
    }

    /// Per-iteration session health check. Reconnects and re-subscribes when
    /// the link is up but the session is not.
    pub fn ensure_session<C, D, R>(
        &mut self,
        clock: &C,
        delay: &mut D,
        rng: &mut R,
    ) -> ConnectionState
    where
        C: Clock,
        D: DelayNs,
        R: RngCore,
    {
        if self.refresh_state() != ConnectionState::SessionDown {
            return self.state;
        }

        let now_ms = clock.now_ms();
        match self.config.retry_policy {
            RetryPolicy::Blocking => {
                if !self.try_session(now_ms, rng) {
                    let wait_ms = self.session_retry.remaining_ms(now_ms);
                    delay.delay_ms(u32::try_from(wait_ms).unwrap_or(u32::MAX));
                }
            }
            RetryPolicy::Deferred => {
                if self.session_retry.is_ready(now_ms) {
                    self.try_session(now_ms, rng);
                }
            }
        }

        self.refresh_state()
    }

    /// Link health check, run on the link-check cadence. Issues a
    /// fire-and-forget reconnect once the link has been down for the retry
    /// interval, at most once per interval.
    pub fn check_link(&mut self, device: &mut DeviceState, now_ms: u64) {
        let interval = self.config.link_retry_interval_ms;

        if self.link.is_connected() {
            device.last_link_ok = now_ms;
        } else if is_due(now_ms, device.last_link_ok, interval)
            && is_due(now_ms, device.last_link_retry, interval)
        {
            log::warn!(
                "WiFi down for {} ms, reconnecting",
                now_ms.saturating_sub(device.last_link_ok)
            );
            if let Err(e) = self.link.reconnect() {
                log::warn!("WiFi reconnect request failed: {:?}", e);
            }
            device.last_link_retry = now_ms;
        }

        self.refresh_state();
    }

    pub fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<()> {
        if self.refresh_state() != ConnectionState::Online {
            return Err(Error::NotConnected);
        }

        self.session.publish(topic, payload).map_err(|e| {
            log::debug!("Session rejected publish: {:?}", e);
            Error::PublishFailed
        })
    }

    /// Services the session receive path.
    pub fn poll(&mut self) -> Option<InboundMessage> {
        if !self.link.is_connected() {
            return None;
        }
        self.session.poll()
    }

    fn begin_link(&mut self) {
        if let Err(e) = self.link.begin() {
            log::warn!("WiFi connect request failed: {:?}", e);
        }
    }

    fn try_session<R: RngCore>(&mut self, now_ms: u64, rng: &mut R) -> bool {
        let client_id = client_id(&self.config.client_id_prefix, rng);
        log::info!(
            "Attempting MQTT connection to {} as {}",
            self.config.broker_url(),
            client_id
        );

        match self.session.connect(&client_id) {
            Ok(()) => {
                log::info!("MQTT connected");
                self.session_retry.record_success();
                self.resubscribe();
                true
            }
            Err(e) => {
                self.session_retry.record_failure(now_ms);
                log::warn!(
                    "MQTT connect failed ({:?}), attempt {}, retrying in {} ms",
                    e,
                    self.session_retry.failures(),
                    self.session_retry.delay_ms()
                );
                false
            }
        }
    }

    fn resubscribe(&mut self) {
        for topic in self.topics.subscriptions() {
            match self.session.subscribe(topic) {
                Ok(()) => log::debug!("Subscribed to {}", topic),
                Err(e) => log::warn!("Subscribe to {} failed: {:?}", topic, e),
            }
        }
    }

    fn refresh_state(&mut self) -> ConnectionState {
        let next = if !self.link.is_connected() {
            ConnectionState::LinkDown
        } else if !self.session.is_connected() {
            ConnectionState::SessionDown
        } else {
            ConnectionState::Online
        };

        if next != self.state {
            log::debug!("Connection state: {:?} -> {:?}", self.state, next);
            self.state = next;
        }
        next
    }
}
