use std::sync::Arc;
use std::thread;

use crate::broker::MockBroker;
use crate::dashboard::Dashboard;
use crate::error::MockError;
use crate::settings::Settings;

mod broker;
mod dashboard;
mod device;
pub mod error;
mod session;
pub mod settings;
mod simulate;

pub async fn run(settings: &Arc<Settings>) -> Result<(), MockError> {
    let broker = MockBroker::new(&settings.broker)?;
    let dashboard = Dashboard::new(&broker, settings)?;
    let _broker = broker.start();

    let device_settings = Settings::clone(settings);
    thread::Builder::new()
        .name("device".to_string())
        .spawn(move || {
            if let Err(e) = device::run(&device_settings) {
                tracing::error!("Device stopped: {e}");
            }
        })?;

    dashboard.run().await
}
