mod error;
mod mqtt;
mod wifi;

use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::Delay;
use esp_idf_svc::hal::gpio::{AnyIOPin, PinDriver};
use esp_idf_svc::hal::prelude::Peripherals;
use esp_idf_svc::log::EspLogger;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::EspWifi;
use log::info;
use rand_core::{RngCore, impls};

use tankwatch_embedded::sensor::GpioEcho;
use tankwatch_embedded::time::EmbeddedTimeProvider;
use tankwatch_embedded::{NetworkConfig, TankConfig, TankController, TankIo};

use crate::mqtt::EspSession;
use crate::wifi::EspWifiLink;

const SSID: &str = match option_env!("WIFI_SSID") {
    Some(ssid) => ssid,
    None => "Wokwi-GUEST",
};
const PASSWORD: &str = match option_env!("WIFI_PASS") {
    Some(password) => password,
    None => "",
};
const MQTT_HOST: Option<&str> = option_env!("MQTT_HOST");
const MQTT_PORT: Option<&str> = option_env!("MQTT_PORT");
const NAMESPACE: Option<&str> = option_env!("TANK_NAMESPACE");

/// Hardware random source for client identifiers.
struct EspRng;

impl RngCore for EspRng {
    fn next_u32(&mut self) -> u32 {
        unsafe { esp_idf_svc::sys::esp_random() }
    }

    fn next_u64(&mut self) -> u64 {
        impls::next_u64_via_u32(self)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        impls::fill_bytes_via_next(self, dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

fn network_config() -> anyhow::Result<NetworkConfig> {
    let mut config = NetworkConfig::default();

    if let Some(namespace) = NAMESPACE {
        config = config.with_namespace(namespace);
    }
    if let Some(host) = MQTT_HOST {
        let port = match MQTT_PORT {
            Some(port) => port.parse()?,
            None => config.broker_port,
        };
        config = config.with_broker(host, port);
    }

    Ok(config)
}

fn main() -> anyhow::Result<()> {
    esp_idf_svc::sys::link_patches();
    EspLogger::initialize_default();

    let peripherals = Peripherals::take()?;
    let sys_loop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    let tank = TankConfig::default();
    let network = network_config()?;
    let pins = tank.pins;

    info!("Tank monitor booting, broker {}", network.broker_url());

    let io = TankIo {
        trigger: PinDriver::output(unsafe { AnyIOPin::new(i32::from(pins.trigger)) })?,
        echo: GpioEcho::new(PinDriver::input(unsafe {
            AnyIOPin::new(i32::from(pins.echo))
        })?),
        leds: [
            PinDriver::output(unsafe { AnyIOPin::new(i32::from(pins.leds[0])) })?,
            PinDriver::output(unsafe { AnyIOPin::new(i32::from(pins.leds[1])) })?,
        ],
        status: PinDriver::output(unsafe { AnyIOPin::new(i32::from(pins.status)) })?,
    };

    let wifi = EspWifiLink::new(
        EspWifi::new(peripherals.modem, sys_loop, Some(nvs))?,
        SSID,
        PASSWORD,
    )?;
    let session = EspSession::new(&network.broker_host, network.broker_port);

    let mut controller = TankController::new(
        tank,
        network,
        io,
        wifi,
        session,
        EmbeddedTimeProvider::new(),
        Delay::new_default(),
        EspRng,
    )
    .map_err(|e| anyhow::anyhow!("{e}"))?;

    controller.run()
}
