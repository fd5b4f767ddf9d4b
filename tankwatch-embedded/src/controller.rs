use alloc::string::String;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use rand_core::RngCore;

use crate::command::{Command, CommandHandler};
use crate::config::{NetworkConfig, STATUS_BLINK_INTERVAL_MS, TankConfig};
use crate::error::{Error, Result};
use crate::indicator::StatusIndicator;
use crate::network::{ConnectionState, ConnectivitySupervisor, MqttSession, WifiController};
use crate::report::ReportingScheduler;
use crate::sensor::{DistanceSampler, EchoTimer};
use crate::time::{Clock, is_due};
use crate::types::DeviceState;

/// Inbound messages handled per loop iteration before the timers run.
pub const MAX_MESSAGES_PER_TICK: usize = 8;
const LOOP_IDLE_MS: u32 = 10;

/// Board I/O handed to the controller. All outputs share one pin type.
pub struct TankIo<O, E> {
    pub trigger: O,
    pub echo: E,
    pub leds: [O; 2],
    pub status: O,
}

/// Single-threaded control loop tying the sampler, command handler,
/// connectivity supervisor and status LED to one device state.
pub struct TankController<O, E, W, S, C, D, R>
where
    O: OutputPin,
    E: EchoTimer,
    W: WifiController,
    S: MqttSession,
    C: Clock,
    D: DelayNs,
    R: RngCore,
{
    sampler: DistanceSampler<O, E>,
    handler: CommandHandler<O>,
    indicator: StatusIndicator<O>,
    scheduler: ReportingScheduler,
    supervisor: ConnectivitySupervisor<W, S>,
    data_topic: String,
    state: DeviceState,
    clock: C,
    delay: D,
    rng: R,
}

impl<O, E, W, S, C, D, R> TankController<O, E, W, S, C, D, R>
where
    O: OutputPin,
    E: EchoTimer,
    W: WifiController,
    S: MqttSession,
    C: Clock,
    D: DelayNs,
    R: RngCore,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: TankConfig,
        network: NetworkConfig,
        io: TankIo<O, E>,
        link: W,
        session: S,
        clock: C,
        delay: D,
        rng: R,
    ) -> Result<Self> {
        config.validate()?;

        let supervisor = ConnectivitySupervisor::new(link, session, network);
        let data_topic = supervisor.topics().data.clone();

        Ok(Self {
            sampler: DistanceSampler::new(io.trigger, io.echo, config.echo_timeout_us),
            handler: CommandHandler::new(io.leds, config.blink_enabled),
            indicator: StatusIndicator::new(io.status),
            scheduler: ReportingScheduler::new(
                config.report_interval_ms,
                config.tank_height_cm,
                config.max_distance_cm,
            ),
            supervisor,
            data_topic,
            state: DeviceState::default(),
            clock,
            delay,
            rng,
        })
    }

    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.supervisor.state()
    }

    /// Puts every output in its idle state and blocks until the link is up.
    pub fn start(&mut self) {
        self.handler.reset(&mut self.state);
        self.indicator.update(ConnectionState::LinkDown);

        self.supervisor.acquire_link(&mut self.delay);

        let now = self.clock.now_ms();
        self.state.last_link_ok = now;
        self.state.last_link_check = now;
        self.state.last_blink = now;
        log::info!("Tank monitor started, publishing to {}", self.data_topic);
    }

    /// One pass of the control loop.
    pub fn tick(&mut self) -> ConnectionState {
        self.supervisor
            .ensure_session(&self.clock, &mut self.delay, &mut self.rng);

        for _ in 0..MAX_MESSAGES_PER_TICK {
            let Some(message) = self.supervisor.poll() else {
                break;
            };
            self.handler.handle(
                &mut self.state,
                self.supervisor.topics(),
                &message.topic,
                &message.payload,
                &mut self.delay,
            );
        }

        let now = self.clock.now_ms();

        if is_due(
            now,
            self.state.last_link_check,
            self.supervisor.config().link_check_interval_ms,
        ) {
            self.state.last_link_check = now;
            self.supervisor.check_link(&mut self.state, now);
        }

        if is_due(now, self.state.last_blink, STATUS_BLINK_INTERVAL_MS) {
            self.state.last_blink = now;
            self.indicator.update(self.supervisor.state());
        }

        if self.scheduler.is_due(&self.state, now) {
            self.state.last_report = now;
            self.report();
        }

        self.supervisor.state()
    }

    pub fn run(&mut self) -> ! {
        self.start();
        loop {
            self.tick();
            self.delay.delay_ms(LOOP_IDLE_MS);
        }
    }

    /// Handles a message outside the loop, e.g. from a local console.
    pub fn apply(&mut self, topic: &str, payload: &[u8]) -> Option<Command> {
        self.handler.handle(
            &mut self.state,
            self.supervisor.topics(),
            topic,
            payload,
            &mut self.delay,
        )
    }

    fn report(&mut self) {
        let reading = self.sampler.sample(&mut self.delay);

        let telemetry = match self.scheduler.prepare(&mut self.state, reading) {
            Ok(telemetry) => telemetry,
            Err(e) => {
                log::warn!("Skipping report: {}", e);
                return;
            }
        };

        let payload = match telemetry.to_json() {
            Ok(payload) => payload,
            Err(e) => {
                log::error!("Telemetry encoding failed: {}", e);
                return;
            }
        };

        match self.supervisor.publish(&self.data_topic, &payload) {
            Ok(()) => log::info!(
                "Published level {}%, distance {:.1} cm, motor {}",
                telemetry.level,
                telemetry.distance_cm,
                telemetry.motor
            ),
            Err(Error::NotConnected) => log::debug!("Offline, telemetry not published"),
            Err(e) => log::warn!("Telemetry publish to {} failed: {}", self.data_topic, e),
        }
    }
}
