//! Test doubles shared by the unit tests of every module.

use core::cell::{Cell, RefCell};
use core::convert::Infallible;
use core::net::Ipv4Addr;

use alloc::collections::VecDeque;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin};

use crate::network::{InboundMessage, MqttSession, WifiController};
use crate::sensor::EchoTimer;
use crate::time::Clock;

#[derive(Debug, Default, Clone)]
pub struct MockPin {
    pub states: Rc<RefCell<Vec<bool>>>,
}

impl MockPin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_states(&self) -> Vec<bool> {
        self.states.borrow().clone()
    }

    pub fn last(&self) -> Option<bool> {
        self.states.borrow().last().copied()
    }
}

impl ErrorType for MockPin {
    type Error = Infallible;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.states.borrow_mut().push(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.states.borrow_mut().push(true);
        Ok(())
    }
}

/// Input returning scripted levels, then holding the last one.
#[derive(Debug, Default, Clone)]
pub struct MockInput {
    pub levels: Rc<RefCell<VecDeque<bool>>>,
    pub held: Rc<Cell<bool>>,
}

impl MockInput {
    pub fn stuck(high: bool) -> Self {
        let input = Self::default();
        input.held.set(high);
        input
    }

    pub fn script(levels: &[bool]) -> Self {
        let input = Self::default();
        input.levels.borrow_mut().extend(levels.iter().copied());
        input
    }
}

impl ErrorType for MockInput {
    type Error = Infallible;
}

impl InputPin for MockInput {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        if let Some(level) = self.levels.borrow_mut().pop_front() {
            self.held.set(level);
        }
        Ok(self.held.get())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}

/// Clock and delay share one nanosecond counter, so blocking waits advance
/// the clock exactly as they would on hardware.
pub fn mock_time() -> (MockClock, MockDelay) {
    let nanos = Rc::new(Cell::new(0));
    (
        MockClock {
            nanos: nanos.clone(),
        },
        MockDelay { nanos },
    )
}

#[derive(Debug, Clone)]
pub struct MockClock {
    nanos: Rc<Cell<u64>>,
}

impl MockClock {
    pub fn advance_ms(&self, ms: u64) {
        self.nanos.set(self.nanos.get() + ms * 1_000_000);
    }

}

impl Clock for MockClock {
    fn now_ms(&self) -> u64 {
        self.nanos.get() / 1_000_000
    }
}

#[derive(Debug, Clone)]
pub struct MockDelay {
    nanos: Rc<Cell<u64>>,
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.nanos.set(self.nanos.get() + u64::from(ns));
    }
}

/// Echo source returning scripted pulse widths, then repeating the fallback.
#[derive(Debug, Clone)]
pub struct MockEcho {
    pub script: Rc<RefCell<VecDeque<Option<u32>>>>,
    pub fallback: Option<u32>,
}

impl MockEcho {
    pub fn constant(pulse_us: Option<u32>) -> Self {
        Self {
            script: Rc::new(RefCell::new(VecDeque::new())),
            fallback: pulse_us,
        }
    }

    pub fn push(&self, pulse_us: Option<u32>) {
        self.script.borrow_mut().push_back(pulse_us);
    }
}

impl EchoTimer for MockEcho {
    fn pulse_width_us(&mut self, _timeout_us: u32) -> Option<u32> {
        self.script.borrow_mut().pop_front().unwrap_or(self.fallback)
    }
}

#[derive(Debug, Default)]
pub struct LinkLog {
    pub connected: bool,
    /// Polls of `is_connected` left before a pending connect completes
    pub polls_until_up: Option<u32>,
    pub begins: u32,
    pub reconnects: u32,
    pub disconnects: u32,
}

#[derive(Debug, Default, Clone)]
pub struct MockLink {
    pub log: Rc<RefCell<LinkLog>>,
}

impl MockLink {
    pub fn up() -> Self {
        let link = Self::default();
        link.log.borrow_mut().connected = true;
        link
    }

    pub fn set_connected(&self, connected: bool) {
        self.log.borrow_mut().connected = connected;
    }
}

impl WifiController for MockLink {
    type Error = Infallible;

    fn begin(&mut self) -> Result<(), Self::Error> {
        self.log.borrow_mut().begins += 1;
        Ok(())
    }

    fn reconnect(&mut self) -> Result<(), Self::Error> {
        self.log.borrow_mut().reconnects += 1;
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), Self::Error> {
        let mut log = self.log.borrow_mut();
        log.disconnects += 1;
        log.connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        let mut log = self.log.borrow_mut();
        if !log.connected {
            if let Some(polls) = log.polls_until_up {
                if polls == 0 {
                    log.connected = true;
                    log.polls_until_up = None;
                } else {
                    log.polls_until_up = Some(polls - 1);
                }
            }
        }
        log.connected
    }

    fn ip_address(&self) -> Option<Ipv4Addr> {
        self.log
            .borrow()
            .connected
            .then_some(Ipv4Addr::new(192, 168, 1, 50))
    }
}

#[derive(Debug, Default)]
pub struct SessionLog {
    pub connected: bool,
    /// Results of upcoming connect attempts; an empty script succeeds
    pub connect_script: VecDeque<bool>,
    pub client_ids: Vec<String>,
    pub subscriptions: Vec<String>,
    pub published: Vec<(String, Vec<u8>)>,
    pub inbound: VecDeque<InboundMessage>,
    pub fail_publish: bool,
}

#[derive(Debug, Default, Clone)]
pub struct MockSession {
    pub log: Rc<RefCell<SessionLog>>,
}

impl MockSession {
    pub fn connected() -> Self {
        let session = Self::default();
        session.log.borrow_mut().connected = true;
        session
    }

    pub fn script_connects(&self, results: &[bool]) {
        self.log.borrow_mut().connect_script.extend(results.iter().copied());
    }

    pub fn deliver(&self, topic: &str, payload: &str) {
        self.log.borrow_mut().inbound.push_back(InboundMessage {
            topic: topic.to_string(),
            payload: payload.as_bytes().to_vec(),
        });
    }

    pub fn drop_session(&self) {
        self.log.borrow_mut().connected = false;
    }

    pub fn published(&self) -> Vec<(String, Vec<u8>)> {
        self.log.borrow().published.clone()
    }
}

impl MqttSession for MockSession {
    type Error = &'static str;

    fn connect(&mut self, client_id: &str) -> Result<(), Self::Error> {
        let mut log = self.log.borrow_mut();
        log.client_ids.push(client_id.to_string());
        if log.connect_script.pop_front().unwrap_or(true) {
            log.connected = true;
            Ok(())
        } else {
            Err("connection refused")
        }
    }

    fn is_connected(&self) -> bool {
        self.log.borrow().connected
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), Self::Error> {
        self.log.borrow_mut().subscriptions.push(topic.to_string());
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), Self::Error> {
        let mut log = self.log.borrow_mut();
        if log.fail_publish {
            return Err("publish rejected");
        }
        log.published.push((topic.to_string(), payload.to_vec()));
        Ok(())
    }

    fn poll(&mut self) -> Option<InboundMessage> {
        let mut log = self.log.borrow_mut();
        if !log.connected {
            return None;
        }
        log.inbound.pop_front()
    }
}
