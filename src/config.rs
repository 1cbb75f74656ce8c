//! Compile-time configuration.
//!
//! Every value can be overridden when building by setting the matching
//! `NFC_RELAY_*` environment variable.

use std::time::Duration;

use crate::retry::RetryPolicy;

const WIFI_SSID: &str = match option_env!("NFC_RELAY_WIFI_SSID") {
    Some(v) => v,
    None => "IB3",
};
const WIFI_PASSWORD: &str = match option_env!("NFC_RELAY_WIFI_PASSWORD") {
    Some(v) => v,
    None => "ingenieursbeleving3",
};
const BROKER_HOST: &str = match option_env!("NFC_RELAY_BROKER_HOST") {
    Some(v) => v,
    None => "dramco.local",
};
const BROKER_PORT: u16 = match option_env!("NFC_RELAY_BROKER_PORT") {
    Some(v) => parse_port(v),
    None => DEFAULT_BROKER_PORT,
};

pub const DEFAULT_BROKER_PORT: u16 = 1883;
pub const DEFAULT_CLIENT_ID: &str = "ESP32NFCClient";
pub const DEFAULT_TOPIC: &str = "tag";

/// Minimum time between two tag read attempts
pub const DEFAULT_COOLDOWN: Duration = Duration::from_millis(500);
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);
pub const DEFAULT_WIFI_POLL: Duration = Duration::from_millis(500);

/// 7-bit I2C address of the PN532
pub const PN532_I2C_ADDRESS: u8 = 0x24;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub wifi_ssid: String,
    pub wifi_password: String,
    pub broker_host: String,
    pub broker_port: u16,
    pub client_id: String,
    pub topic: String,
    pub cooldown: Duration,
    pub reconnect: RetryPolicy,
    pub wifi: RetryPolicy,
}

/// Parse a decimal TCP port. Evaluated at compile time for
/// `NFC_RELAY_BROKER_PORT`, so a bad value fails the build.
pub(crate) const fn parse_port(s: &str) -> u16 {
    let bytes = s.as_bytes();
    assert!(!bytes.is_empty(), "broker port is empty");

    let mut value: u32 = 0;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        assert!(b.is_ascii_digit(), "broker port must be a decimal number");
        value = value * 10 + (b - b'0') as u32;
        assert!(value <= u16::MAX as u32, "broker port out of range");
        i += 1;
    }
    assert!(value != 0, "broker port must not be 0");
    value as u16
}

impl Config {
    /// `mqtt://host:port`, as ESP-IDF's MQTT client expects
    pub fn broker_url(&self) -> String {
        format!("mqtt://{}:{}", self.broker_host, self.broker_port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            wifi_ssid: WIFI_SSID.into(),
            wifi_password: WIFI_PASSWORD.into(),
            broker_host: BROKER_HOST.into(),
            broker_port: BROKER_PORT,
            client_id: DEFAULT_CLIENT_ID.into(),
            topic: DEFAULT_TOPIC.into(),
            cooldown: DEFAULT_COOLDOWN,
            reconnect: RetryPolicy::fixed(DEFAULT_RECONNECT_DELAY),
            wifi: RetryPolicy::fixed(DEFAULT_WIFI_POLL),
        }
    }
}
