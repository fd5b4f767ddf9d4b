mod retry;
mod supervisor;

pub use retry::RetryTimer;
pub use supervisor::*;

use core::fmt::Debug;
use core::net::Ipv4Addr;

use alloc::string::String;
use alloc::vec::Vec;

/// Station-mode network link driver.
pub trait WifiController {
    type Error: Debug;

    /// Start joining the configured network without waiting for association
    fn begin(&mut self) -> Result<(), Self::Error>;

    /// Re-issue the join request for a dropped link; returns immediately
    fn reconnect(&mut self) -> Result<(), Self::Error>;

    /// Leave the current network
    fn disconnect(&mut self) -> Result<(), Self::Error>;

    /// Check if currently associated with an address assigned
    fn is_connected(&self) -> bool;

    fn ip_address(&self) -> Option<Ipv4Addr>;
}

/// Broker session of a publish/subscribe client. QoS is at-most-once.
pub trait MqttSession {
    type Error: Debug;

    /// Open a session under `client_id`, blocking until the broker answers
    fn connect(&mut self, client_id: &str) -> Result<(), Self::Error>;

    fn is_connected(&self) -> bool;

    fn subscribe(&mut self, topic: &str) -> Result<(), Self::Error>;

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), Self::Error>;

    /// Service the receive loop, returning the next pending inbound message
    fn poll(&mut self) -> Option<InboundMessage>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    LinkDown,
    SessionDown,
    Online,
}

/// How startup waits for the network link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkPolicy {
    /// Poll forever without touching the pending connect
    Unbounded,
    /// Restart the connect after `polls` unsuccessful polls, then keep waiting
    Capped { polls: u32 },
}

/// How a failed broker connect waits before the next attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Sleep through the backoff, stalling the whole loop
    Blocking,
    /// Record the next attempt time and keep servicing the loop
    Deferred,
}
