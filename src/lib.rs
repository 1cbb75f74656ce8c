//! PN532 NFC tag scanner that publishes tag UIDs to an MQTT topic.
//!
//! The reader's IRQ line is sampled every loop iteration; a falling edge
//! means a tag answered the pending detection command. The UID is read,
//! formatted as uppercase hex pairs (`"04 A3 FF 12"`) and published.
//!
//! # Features
//!
//! - `i2c-esp32` - I2C transport, Wi-Fi and MQTT for ESP32 using esp-idf-svc
//! - `serial` - HSU serial transport and rumqttc MQTT for desktop
//!
//! # Example
//!
//! ```ignore
//! use nfc_uid_relay::{
//!     App, HostNetwork, Pn532, PublishClient, RetryPolicy, RumqttBroker, SerialTransport, TagScanner,
//! };
//! use std::time::Duration;
//!
//! let transport = SerialTransport::new("/dev/ttyUSB0", 115200)?;
//! let irq = transport.ready_pin()?;
//! let mut scanner = TagScanner::new(Pn532::new(transport), irq, Duration::from_millis(500));
//! scanner.begin()?;
//!
//! let broker = RumqttBroker::new("localhost", 1883);
//! let client = PublishClient::new(broker, "nfc-relay", RetryPolicy::fixed(Duration::from_secs(5)));
//! let mut app = App::new(HostNetwork, RetryPolicy::fixed(Duration::ZERO), scanner, client, "tag");
//! let err = app.run(Duration::from_millis(5));
//! ```

mod app;
mod broker;
pub mod config;
mod network;
mod reader;
mod retry;
mod scanner;
mod transport;
mod types;

#[cfg(feature = "i2c-esp32")]
mod esp32;
#[cfg(feature = "i2c-esp32")]
mod i2c;

#[cfg(feature = "serial")]
mod rumqtt;
#[cfg(feature = "serial")]
mod serial;

// Re-exports
pub use app::{App, LinkError};
pub use broker::{Broker, LinkState, PublishClient};
pub use network::{HostNetwork, Network, connect_network};
pub use reader::{Pn532, hard_reset};
pub use retry::{Attempt, RetryError, RetryPolicy, retry};
pub use scanner::{EdgeDetector, ScannerState, TagScanner};
pub use transport::Pn532Transport;
pub use types::{FirmwareVersion, MAX_UID_LEN, NfcError, TagUid, bytes_to_hex};

#[cfg(feature = "i2c-esp32")]
pub use esp32::{EspBroker, EspMqttError, WifiError, WifiNetwork};
#[cfg(feature = "i2c-esp32")]
pub use i2c::I2cTransport;

#[cfg(feature = "serial")]
pub use rumqtt::{RumqttBroker, RumqttError};
#[cfg(feature = "serial")]
pub use serial::{SerialReadyPin, SerialTransport};
