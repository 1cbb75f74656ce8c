//! NFC UID relay firmware for ESP32 + PN532 (I2C)
//!
//! Wiring:
//! - GPIO21 -> SDA
//! - GPIO22 -> SCL
//! - GPIO4  -> PN532 IRQ (active low)
//! - GPIO5  -> PN532 RSTPDN

use anyhow::{Context, anyhow};
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::{PinDriver, Pull};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use log::{error, info};
use std::time::Duration;

use nfc_uid_relay::config::{Config, PN532_I2C_ADDRESS};
use nfc_uid_relay::{
    App, EspBroker, I2cTransport, Pn532, PublishClient, TagScanner, WifiNetwork,
    connect_network, hard_reset,
};

fn main() {
    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    info!("Begin NFC532 Scanning Software.");

    if let Err(e) = run() {
        error!("{:#}", e);
    }

    // nothing left to do without a reader or broker; wait for a reset
    loop {
        FreeRtos::delay_ms(1000);
    }
}

fn run() -> anyhow::Result<()> {
    let config = Config::default();

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    let mut wifi = WifiNetwork::new(
        peripherals.modem,
        sysloop,
        Some(nvs),
        &config.wifi_ssid,
        &config.wifi_password,
    )?;
    connect_network(&mut wifi, &config.wifi).map_err(|e| anyhow!("WiFi: {}", e))?;

    let mut irq = PinDriver::input(peripherals.pins.gpio4)?;
    irq.set_pull(Pull::Up)?;
    let mut reset = PinDriver::output(peripherals.pins.gpio5)?;
    hard_reset(&mut reset)?;

    let transport = I2cTransport::new(
        peripherals.i2c0,
        peripherals.pins.gpio21,
        peripherals.pins.gpio22,
        PN532_I2C_ADDRESS,
    )?;
    let mut scanner = TagScanner::new(Pn532::new(transport), irq, config.cooldown);
    scanner.begin().context("Didn't find PN532 board")?;

    let broker = EspBroker::new(config.broker_url(), Duration::from_secs(5));
    let client = PublishClient::new(broker, config.client_id.clone(), config.reconnect.clone());
    let mut app = App::new(wifi, config.wifi.clone(), scanner, client, config.topic.clone());

    let e = app.run(Duration::from_millis(1));
    Err(anyhow!("Main loop stopped: {}", e))
}
