use core::net::Ipv4Addr;

use esp_idf_svc::sys::EspError;
use esp_idf_svc::wifi::{AuthMethod, ClientConfiguration, Configuration, EspWifi};
use log::info;

use tankwatch_embedded::network::WifiController;

use crate::error::{Result, TankError};

/// Station-mode driver. Connect requests return immediately; association
/// is observed through `is_connected`.
pub struct EspWifiLink {
    wifi: EspWifi<'static>,
}

impl EspWifiLink {
    pub fn new(mut wifi: EspWifi<'static>, ssid: &str, password: &str) -> Result<Self> {
        let configuration = Configuration::Client(ClientConfiguration {
            ssid: ssid
                .try_into()
                .map_err(|_| TankError::Config("Invalid SSID".to_string()))?,
            bssid: None,
            auth_method: if password.is_empty() {
                AuthMethod::None
            } else {
                AuthMethod::WPA2Personal
            },
            password: password
                .try_into()
                .map_err(|_| TankError::Config("Invalid password".to_string()))?,
            channel: None,
            ..Default::default()
        });

        wifi.set_configuration(&configuration)?;
        info!("WiFi configured for {}", ssid);

        Ok(Self { wifi })
    }
}

impl WifiController for EspWifiLink {
    type Error = EspError;

    fn begin(&mut self) -> core::result::Result<(), Self::Error> {
        if !self.wifi.is_started()? {
            self.wifi.start()?;
        }
        self.wifi.connect()
    }

    fn reconnect(&mut self) -> core::result::Result<(), Self::Error> {
        self.wifi.connect()
    }

    fn disconnect(&mut self) -> core::result::Result<(), Self::Error> {
        self.wifi.disconnect()
    }

    fn is_connected(&self) -> bool {
        self.wifi.is_up().unwrap_or(false)
    }

    fn ip_address(&self) -> Option<Ipv4Addr> {
        self.wifi.sta_netif().get_ip_info().ok().map(|info| info.ip)
    }
}
