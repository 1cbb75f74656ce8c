//! NFC UID relay for a USB-serial PN532 on a desktop host

use anyhow::{Context, anyhow};
use clap::Parser;
use log::info;
use std::time::Duration;

use nfc_uid_relay::config::Config;
use nfc_uid_relay::{
    App, HostNetwork, Pn532, PublishClient, RetryPolicy, RumqttBroker, SerialTransport,
    TagScanner, connect_network,
};

#[derive(Parser, Debug)]
#[command(name = "nfc-uid-relay-desktop", about = "Publish PN532 tag UIDs to MQTT")]
struct Args {
    /// Serial port the PN532 is attached to (HSU mode)
    #[arg(long, env = "NFC_RELAY_PORT", default_value = "/dev/ttyUSB0")]
    port: String,

    #[arg(long, env = "NFC_RELAY_BAUD", default_value_t = 115_200)]
    baud: u32,

    #[arg(long, env = "NFC_RELAY_BROKER_HOST")]
    broker_host: Option<String>,

    #[arg(long, env = "NFC_RELAY_BROKER_PORT")]
    broker_port: Option<u16>,

    #[arg(long, env = "NFC_RELAY_TOPIC")]
    topic: Option<String>,

    #[arg(long, env = "NFC_RELAY_CLIENT_ID")]
    client_id: Option<String>,

    /// Give up after this many failed broker connection attempts (default: never)
    #[arg(long)]
    max_reconnects: Option<u32>,

    /// Cooldown between tag reads in milliseconds
    #[arg(long)]
    cooldown_ms: Option<u64>,

    /// MQTT keep-alive interval in seconds
    #[arg(long, default_value_t = 15)]
    keep_alive_secs: u64,
}

impl Args {
    fn into_config(self) -> Config {
        let mut config = Config::default();
        if let Some(host) = self.broker_host {
            config.broker_host = host;
        }
        if let Some(port) = self.broker_port {
            config.broker_port = port;
        }
        if let Some(topic) = self.topic {
            config.topic = topic;
        }
        if let Some(client_id) = self.client_id {
            config.client_id = client_id;
        }
        if let Some(max) = self.max_reconnects {
            config.reconnect = config.reconnect.with_max_attempts(max);
        }
        if let Some(ms) = self.cooldown_ms {
            config.cooldown = Duration::from_millis(ms);
        }
        config
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let port = args.port.clone();
    let baud = args.baud;
    let keep_alive = Duration::from_secs(args.keep_alive_secs);
    let config = args.into_config();

    info!("Begin NFC532 Scanning Software.");
    let network_policy = RetryPolicy::fixed(Duration::ZERO);
    connect_network(&mut HostNetwork, &network_policy).map_err(|e| anyhow!("network: {}", e))?;

    let transport = SerialTransport::new(&port, baud)
        .with_context(|| format!("Failed to open {} at {} baud", port, baud))?;
    let irq = transport.ready_pin()?;
    let mut scanner = TagScanner::new(Pn532::new(transport), irq, config.cooldown);
    scanner.begin().context("Didn't find PN532 board")?;

    info!("Broker {}:{}, topic {}", config.broker_host, config.broker_port, config.topic);
    let broker = RumqttBroker::new(config.broker_host.clone(), config.broker_port)
        .with_keep_alive(keep_alive);
    let client = PublishClient::new(broker, config.client_id.clone(), config.reconnect.clone());
    let mut app = App::new(HostNetwork, network_policy, scanner, client, config.topic.clone());

    let e = app.run(Duration::from_millis(5));
    Err(anyhow!("Main loop stopped: {}", e))
}
