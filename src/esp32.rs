//! Wi-Fi station and MQTT client backends using esp-idf-svc

use esp_idf_hal::modem::Modem;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::mqtt::client::{EspMqttClient, EventPayload, MqttClientConfiguration, QoS};
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::sys::EspError;
use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};
use log::{info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::broker::Broker;
use crate::network::Network;

#[derive(Debug, thiserror::Error)]
pub enum WifiError {
    #[error("SSID or password too long for the Wi-Fi driver")]
    InvalidCredentials,
    #[error(transparent)]
    Esp(#[from] EspError),
}

/// Wi-Fi station on the ESP32 radio
pub struct WifiNetwork {
    wifi: BlockingWifi<EspWifi<'static>>,
}

impl WifiNetwork {
    pub fn new(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: Option<EspDefaultNvsPartition>,
        ssid: &str,
        password: &str,
    ) -> Result<Self, WifiError> {
        let esp_wifi = EspWifi::new(modem, sysloop.clone(), nvs)?;
        let mut wifi = BlockingWifi::wrap(esp_wifi, sysloop)?;

        let configuration = Configuration::Client(ClientConfiguration {
            ssid: ssid.try_into().map_err(|_| WifiError::InvalidCredentials)?,
            password: password.try_into().map_err(|_| WifiError::InvalidCredentials)?,
            auth_method: AuthMethod::WPA2Personal,
            ..Default::default()
        });
        wifi.set_configuration(&configuration)?;

        info!("Connecting to {}", ssid);
        wifi.start()?;

        Ok(Self { wifi })
    }
}

impl Network for WifiNetwork {
    type Error = WifiError;

    fn associate(&mut self) -> Result<(), Self::Error> {
        self.wifi.connect()?;
        self.wifi.wait_netif_up()?;

        let ip_info = self.wifi.wifi().sta_netif().get_ip_info()?;
        info!("WiFi connected, IP address: {}", ip_info.ip);
        Ok(())
    }

    fn is_associated(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false)
    }

    fn is_fatal(error: &Self::Error) -> bool {
        matches!(error, WifiError::InvalidCredentials)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EspMqttError {
    #[error("not connected to broker")]
    NotConnected,
    #[error(transparent)]
    Esp(#[from] EspError),
}

/// ESP-IDF MQTT client.
///
/// The client runs its own task and reconnects by itself; connection state
/// is tracked from its events.
pub struct EspBroker {
    url: String,
    client: Option<EspMqttClient<'static>>,
    connected: Arc<AtomicBool>,
    connect_timeout: Duration,
}

impl EspBroker {
    pub fn new(url: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            url: url.into(),
            client: None,
            connected: Arc::new(AtomicBool::new(false)),
            connect_timeout,
        }
    }

    fn start_client(&mut self, client_id: &str) -> Result<(), EspMqttError> {
        let conf = MqttClientConfiguration {
            client_id: Some(client_id),
            ..Default::default()
        };

        let connected = self.connected.clone();
        let client = EspMqttClient::new_cb(&self.url, &conf, move |event| match event.payload() {
            EventPayload::Connected(_) => connected.store(true, Ordering::SeqCst),
            EventPayload::Disconnected => connected.store(false, Ordering::SeqCst),
            EventPayload::Error(e) => warn!("MQTT error: {:?}", e),
            _ => {}
        })?;

        self.client = Some(client);
        Ok(())
    }
}

impl Broker for EspBroker {
    type Error = EspMqttError;

    fn connect(&mut self, client_id: &str) -> Result<(), Self::Error> {
        if self.client.is_none() {
            self.start_client(client_id)?;
        }

        let start = Instant::now();
        while !self.is_connected() {
            if start.elapsed() > self.connect_timeout {
                return Err(EspMqttError::NotConnected);
            }
            std::thread::sleep(Duration::from_millis(50));
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.client.is_some() && self.connected.load(Ordering::SeqCst)
    }

    fn poll(&mut self) -> Result<(), Self::Error> {
        // keepalive runs in the ESP-IDF MQTT task
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), Self::Error> {
        let client = self.client.as_mut().ok_or(EspMqttError::NotConnected)?;
        client.enqueue(topic, QoS::AtMostOnce, false, payload)?;
        Ok(())
    }
}
