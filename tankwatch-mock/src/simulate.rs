use std::cell::Cell;
use std::convert::Infallible;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, OutputPin};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

use tankwatch_embedded::network::WifiController;
use tankwatch_embedded::sensor::{EchoTimer, US_PER_CM};
use tankwatch_embedded::time::Clock;

use crate::settings::Simulation;

const JOIN_DELAY_MS: u64 = 1_500;

/// Water column model: drains continuously, refills while the pump runs.
#[derive(Debug, Clone)]
pub struct SimulatedTank {
    height_cm: f32,
    water_cm: f32,
    drain_cm_per_ms: f32,
    fill_cm_per_ms: f32,
    pump_on: bool,
    last_update_ms: Option<u64>,
}

impl SimulatedTank {
    pub fn new(height_cm: f32, simulation: &Simulation) -> Self {
        Self {
            height_cm,
            water_cm: height_cm * simulation.initial_level.clamp(0.0, 100.0) / 100.0,
            drain_cm_per_ms: simulation.drain_cm_per_min / 60_000.0,
            fill_cm_per_ms: simulation.fill_cm_per_min / 60_000.0,
            pump_on: false,
            last_update_ms: None,
        }
    }

    /// Integrates the water column up to `now_ms` with the previous pump
    /// state, then latches the new one.
    pub fn update(&mut self, now_ms: u64, pump_on: bool) {
        if let Some(last) = self.last_update_ms {
            let dt = now_ms.saturating_sub(last) as f32;
            let mut rate = -self.drain_cm_per_ms;
            if self.pump_on {
                rate += self.fill_cm_per_ms;
            }
            self.water_cm = (self.water_cm + rate * dt).clamp(0.0, self.height_cm);
        }

        if pump_on != self.pump_on {
            tracing::info!("Pump {}", if pump_on { "started" } else { "stopped" });
        }
        self.pump_on = pump_on;
        self.last_update_ms = Some(now_ms);
    }

    /// Sensor to surface distance, the sensor sitting at the tank rim.
    pub fn distance_cm(&self) -> f32 {
        self.height_cm - self.water_cm
    }

    pub fn level_percent(&self) -> f32 {
        self.water_cm * 100.0 / self.height_cm
    }
}

/// Echo timer answering from the tank model with gaussian jitter and
/// occasional lost pings.
pub struct SimEcho {
    tank: Arc<Mutex<SimulatedTank>>,
    noise: Option<Normal<f32>>,
    loss_rate: f64,
    rng: StdRng,
}

impl SimEcho {
    pub fn new(tank: Arc<Mutex<SimulatedTank>>, simulation: &Simulation) -> Self {
        Self {
            tank,
            noise: Normal::new(0.0, simulation.noise_cm).ok(),
            loss_rate: simulation.echo_loss_rate.clamp(0.0, 1.0),
            rng: StdRng::from_entropy(),
        }
    }
}

impl EchoTimer for SimEcho {
    fn pulse_width_us(&mut self, timeout_us: u32) -> Option<u32> {
        if self.rng.gen_bool(self.loss_rate) {
            return None;
        }

        let jitter = self
            .noise
            .as_ref()
            .map_or(0.0, |noise| noise.sample(&mut self.rng));
        let distance = self.tank.lock().ok()?.distance_cm() + jitter;
        let pulse_us = (distance.max(0.0) * US_PER_CM) as u32;

        (pulse_us <= timeout_us).then_some(pulse_us)
    }
}

/// Named GPIO stand-in that traces level changes.
#[derive(Debug)]
pub struct SimPin {
    name: &'static str,
    high: bool,
}

impl SimPin {
    pub fn new(name: &'static str) -> Self {
        Self { name, high: false }
    }

    fn set(&mut self, high: bool) {
        if high != self.high {
            tracing::trace!("{} -> {}", self.name, if high { "HIGH" } else { "LOW" });
        }
        self.high = high;
    }
}

impl ErrorType for SimPin {
    type Error = Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.set(true);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        thread::sleep(Duration::from_nanos(u64::from(ns)));
    }
}

/// Association flag shared between the link and the broker session. Every
/// drop bumps the outage count, so a session opened before a drop can tell
/// it is stale even after the link is back.
#[derive(Debug, Default)]
pub struct Carrier {
    up: AtomicBool,
    outages: AtomicU64,
}

impl Carrier {
    pub fn is_up(&self) -> bool {
        self.up.load(Ordering::Acquire)
    }

    pub fn outages(&self) -> u64 {
        self.outages.load(Ordering::Acquire)
    }

    pub(crate) fn set(&self, up: bool) {
        if self.up.swap(up, Ordering::AcqRel) && !up {
            self.outages.fetch_add(1, Ordering::AcqRel);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Joining { ready_at: u64 },
    Up,
    Lost,
}

/// WiFi station with periodic scripted outages. After an outage the link
/// stays down until a reconnect is requested.
pub struct SimLink<C: Clock> {
    clock: C,
    carrier: Arc<Carrier>,
    phase: Cell<Phase>,
    drop_every_ms: Option<u64>,
    drop_for_ms: u64,
    next_drop_at: Cell<u64>,
    outage_until: Cell<u64>,
}

impl<C: Clock> SimLink<C> {
    pub fn new(clock: C, simulation: &Simulation) -> Self {
        Self {
            clock,
            carrier: Arc::new(Carrier::default()),
            phase: Cell::new(Phase::Idle),
            drop_every_ms: simulation.link_drop_every_s.map(|s| s * 1_000),
            drop_for_ms: simulation.link_drop_for_s * 1_000,
            next_drop_at: Cell::new(u64::MAX),
            outage_until: Cell::new(0),
        }
    }

    pub fn carrier(&self) -> Arc<Carrier> {
        Arc::clone(&self.carrier)
    }

    fn join(&mut self) {
        if self.phase.get() == Phase::Up {
            return;
        }
        let now = self.clock.now_ms();
        let ready_at = now.max(self.outage_until.get()) + JOIN_DELAY_MS;
        self.phase.set(Phase::Joining { ready_at });
        self.refresh();
    }

    fn refresh(&self) -> Phase {
        let now = self.clock.now_ms();

        let next = match self.phase.get() {
            Phase::Joining { ready_at } if now >= ready_at => {
                self.next_drop_at
                    .set(self.drop_every_ms.map_or(u64::MAX, |every| now + every));
                Phase::Up
            }
            Phase::Up if now >= self.next_drop_at.get() => {
                tracing::warn!("Simulated WiFi outage for {} ms", self.drop_for_ms);
                self.outage_until.set(now + self.drop_for_ms);
                Phase::Lost
            }
            phase => phase,
        };

        self.phase.set(next);
        self.carrier.set(next == Phase::Up);
        next
    }
}

impl<C: Clock> WifiController for SimLink<C> {
    type Error = Infallible;

    fn begin(&mut self) -> Result<(), Self::Error> {
        self.join();
        Ok(())
    }

    fn reconnect(&mut self) -> Result<(), Self::Error> {
        self.join();
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), Self::Error> {
        self.phase.set(Phase::Idle);
        self.carrier.set(false);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.refresh() == Phase::Up
    }

    fn ip_address(&self) -> Option<Ipv4Addr> {
        self.is_connected().then_some(Ipv4Addr::new(192, 168, 4, 2))
    }
}
