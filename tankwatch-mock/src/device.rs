use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;

use tankwatch_embedded::time::{Clock, EmbeddedTimeProvider};
use tankwatch_embedded::{TankController, TankIo};

use crate::error::MockError;
use crate::session::RumqttSession;
use crate::settings::Settings;
use crate::simulate::{SimEcho, SimLink, SimPin, SimulatedTank, StdDelay};

const LOOP_IDLE: Duration = Duration::from_millis(10);

/// Runs the firmware control loop against the simulated board.
pub fn run(settings: &Settings) -> Result<(), MockError> {
    let clock = EmbeddedTimeProvider::new();
    let simulation = &settings.simulation;

    let tank = Arc::new(Mutex::new(SimulatedTank::new(
        settings.device.tank_height_cm,
        simulation,
    )));

    let link = SimLink::new(clock.clone(), simulation);
    let session = RumqttSession::new(&settings.broker.address, settings.broker.port, link.carrier())
        .with_refusals(simulation.session_refusals);

    let io = TankIo {
        trigger: SimPin::new("trigger"),
        echo: SimEcho::new(Arc::clone(&tank), simulation),
        leds: [SimPin::new("led1"), SimPin::new("led2")],
        status: SimPin::new("status"),
    };

    let mut controller = TankController::new(
        settings.tank_config(),
        settings.network_config(),
        io,
        link,
        session,
        clock.clone(),
        StdDelay,
        StdRng::from_entropy(),
    )
    .map_err(MockError::Device)?;

    controller.start();

    loop {
        controller.tick();

        if let Ok(mut tank) = tank.lock() {
            tank.update(clock.now_ms(), controller.state().motor_on);
        }

        thread::sleep(LOOP_IDLE);
    }
}
